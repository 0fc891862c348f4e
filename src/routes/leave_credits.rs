use actix_web::web;

use crate::handlers::leave_credits;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave-credits")
            .route("", web::post().to(leave_credits::create_leave_credit))
            .route("", web::get().to(leave_credits::get_leave_credits))
            .route("/{id}", web::get().to(leave_credits::get_leave_credit))
            .route("/{id}", web::put().to(leave_credits::update_leave_credit))
            .route(
                "/{id}/adjust",
                web::post().to(leave_credits::adjust_leave_credit),
            ),
    );
}
