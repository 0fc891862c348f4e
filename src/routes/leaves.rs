use actix_web::web;

use crate::handlers::leaves;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leaves")
            .route("", web::post().to(leaves::create_leave_request))
            .route("", web::get().to(leaves::get_leave_requests))
            .route("/{id}", web::get().to(leaves::get_leave_request))
            .route("/{id}", web::put().to(leaves::update_leave_request))
            .route("/{id}", web::delete().to(leaves::delete_leave_request))
            .route("/{id}/approve", web::post().to(leaves::approve_leave_request))
            .route("/{id}/reject", web::post().to(leaves::reject_leave_request)),
    );
}
