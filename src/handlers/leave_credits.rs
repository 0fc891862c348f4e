use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{
    LeaveCreditAdjustment, LeaveCreditFilter, LeaveCreditInput, LeaveCreditTotalUpdate,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{LeaveCreditService, Principal};

pub async fn create_leave_credit(
    principal: Principal,
    service: web::Data<LeaveCreditService>,
    input: web::Json<LeaveCreditInput>,
) -> Result<HttpResponse, AppError> {
    let balance = service.create(&principal, input.into_inner()).await?;
    Ok(ApiResponse::created(balance))
}

pub async fn get_leave_credits(
    principal: Principal,
    service: web::Data<LeaveCreditService>,
    query: web::Query<LeaveCreditFilter>,
) -> Result<HttpResponse, AppError> {
    let balances = service.list(&principal, &query).await?;
    Ok(ApiResponse::ok(balances))
}

pub async fn get_leave_credit(
    principal: Principal,
    service: web::Data<LeaveCreditService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let balance = service.get(&principal, path.into_inner()).await?;
    Ok(ApiResponse::ok(balance))
}

/// Replace the granted quota
pub async fn update_leave_credit(
    principal: Principal,
    service: web::Data<LeaveCreditService>,
    path: web::Path<Uuid>,
    input: web::Json<LeaveCreditTotalUpdate>,
) -> Result<HttpResponse, AppError> {
    let balance = service
        .set_total(&principal, path.into_inner(), input.total_credits)
        .await?;
    Ok(ApiResponse::ok(balance))
}

/// Consume or restore credits
pub async fn adjust_leave_credit(
    principal: Principal,
    service: web::Data<LeaveCreditService>,
    path: web::Path<Uuid>,
    input: web::Json<LeaveCreditAdjustment>,
) -> Result<HttpResponse, AppError> {
    let balance = service
        .adjust(&principal, path.into_inner(), input.delta)
        .await?;
    Ok(ApiResponse::ok(balance))
}
