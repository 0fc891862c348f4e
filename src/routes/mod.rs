use actix_web::web;

pub mod leave_credits;
pub mod leaves;
pub mod time_logs;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(time_logs::configure)
            .configure(leaves::configure)
            .configure(leave_credits::configure),
    );
}
