use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{ManualTimeEntryInput, NewTimeLog, TimeLogFilter, TimeLogPatch};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Principal, TimeLogService};

/// Record a time log (stopped timer or direct submission)
pub async fn create_time_log(
    principal: Principal,
    service: web::Data<TimeLogService>,
    input: web::Json<NewTimeLog>,
) -> Result<HttpResponse, AppError> {
    let entry = service.record(&principal, input.into_inner()).await?;
    Ok(ApiResponse::created(entry))
}

/// Record a manually entered duration ending now
pub async fn create_manual_time_log(
    principal: Principal,
    service: web::Data<TimeLogService>,
    input: web::Json<ManualTimeEntryInput>,
) -> Result<HttpResponse, AppError> {
    let entry = service.submit_manual(&principal, input.into_inner()).await?;
    Ok(ApiResponse::created(entry))
}

pub async fn get_time_logs(
    principal: Principal,
    service: web::Data<TimeLogService>,
    query: web::Query<TimeLogFilter>,
) -> Result<HttpResponse, AppError> {
    let entries = service.list(&principal, &query).await?;
    Ok(ApiResponse::ok(entries))
}

pub async fn get_time_log_summary(
    principal: Principal,
    service: web::Data<TimeLogService>,
    query: web::Query<TimeLogFilter>,
) -> Result<HttpResponse, AppError> {
    let summary = service.summarize(&principal, &query).await?;
    Ok(ApiResponse::ok(summary))
}

pub async fn get_time_log(
    principal: Principal,
    service: web::Data<TimeLogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let entry = service.get(&principal, path.into_inner()).await?;
    Ok(ApiResponse::ok(entry))
}

pub async fn update_time_log(
    principal: Principal,
    service: web::Data<TimeLogService>,
    path: web::Path<Uuid>,
    input: web::Json<TimeLogPatch>,
) -> Result<HttpResponse, AppError> {
    let entry = service
        .update(&principal, path.into_inner(), input.into_inner())
        .await?;
    Ok(ApiResponse::ok(entry))
}

pub async fn delete_time_log(
    principal: Principal,
    service: web::Data<TimeLogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    service.delete(&principal, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Time log deleted",
    )))
}
