use actix_web::web;

use crate::handlers::time_logs;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/time-logs")
            .route("", web::post().to(time_logs::create_time_log))
            .route("", web::get().to(time_logs::get_time_logs))
            .route("/manual", web::post().to(time_logs::create_manual_time_log))
            .route("/summary", web::get().to(time_logs::get_time_log_summary))
            .route("/{id}", web::get().to(time_logs::get_time_log))
            .route("/{id}", web::put().to(time_logs::update_time_log))
            .route("/{id}", web::delete().to(time_logs::delete_time_log)),
    );
}
