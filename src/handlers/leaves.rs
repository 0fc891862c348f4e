use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{
    LeaveFilter, LeaveRequestInput, LeaveRequestPatch, LeaveStatus, ResolutionInput,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{LeaveService, Principal};

/// Submit a leave request for the caller
pub async fn create_leave_request(
    principal: Principal,
    service: web::Data<LeaveService>,
    input: web::Json<LeaveRequestInput>,
) -> Result<HttpResponse, AppError> {
    let request = service.submit(&principal, input.into_inner()).await?;
    Ok(ApiResponse::created(request))
}

/// List leave requests; employees only ever see their own
pub async fn get_leave_requests(
    principal: Principal,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let requests = service.list(&principal, &query).await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn get_leave_request(
    principal: Principal,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let request = service.get(&principal, path.into_inner()).await?;
    Ok(ApiResponse::ok(request))
}

pub async fn update_leave_request(
    principal: Principal,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    input: web::Json<LeaveRequestPatch>,
) -> Result<HttpResponse, AppError> {
    let request = service
        .update(&principal, path.into_inner(), input.into_inner())
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn delete_leave_request(
    principal: Principal,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    service.delete(&principal, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Leave request deleted",
    )))
}

/// The approve/reject body may be omitted, but a body that is sent must
/// parse as a resolution
fn resolution_body(body: &[u8]) -> Result<ResolutionInput, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ResolutionInput::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::validation(format!("Invalid request body: {}", err)))
}

async fn resolve(
    principal: Principal,
    service: web::Data<LeaveService>,
    id: Uuid,
    decision: LeaveStatus,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let input = resolution_body(&body)?;
    let request = service.resolve(&principal, id, decision, input).await?;
    Ok(ApiResponse::ok(request))
}

/// Approve a pending leave request
pub async fn approve_leave_request(
    principal: Principal,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    resolve(principal, service, path.into_inner(), LeaveStatus::Approved, body).await
}

/// Reject a pending leave request
pub async fn reject_leave_request(
    principal: Principal,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    resolve(principal, service, path.into_inner(), LeaveStatus::Rejected, body).await
}
