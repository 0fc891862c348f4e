use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::macros::string_enum;
use crate::error::AppError;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Role {
        Employee => "employee",
        Manager => "manager",
        Admin => "admin",
        Owner => "owner",
    }
}

/// Token claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub role: String,
    pub exp: usize, // expiration time
}

/// The authenticated actor of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Managers, admins and owners may approve leave and manage credits
    pub fn is_elevated(&self) -> bool {
        matches!(self.role, Role::Manager | Role::Admin | Role::Owner)
    }

    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.id == owner_id || self.is_elevated()
    }

    pub fn requires_elevated(&self, action: &str) -> Result<(), AppError> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Insufficient permissions to {}",
                action
            )))
        }
    }

    pub fn requires_access(&self, owner_id: Uuid, resource: &str) -> Result<(), AppError> {
        if self.can_access(owner_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Cannot access other users' {}",
                resource
            )))
        }
    }

    /// Employees are pinned to their own records; elevated roles may pick any user
    pub fn scope_user(&self, requested: Option<Uuid>) -> Option<Uuid> {
        if self.is_elevated() {
            requested
        } else {
            Some(self.id)
        }
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<Principal, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|err| {
        log::debug!("Rejected bearer token: {}", err);
        AppError::Unauthorized
    })?;

    let role = token_data
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized)?;

    Ok(Principal::new(token_data.claims.sub, role))
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(config) = req.app_data::<Data<Config>>() else {
            log::error!("Config missing from app data; cannot verify tokens");
            return ready(Err(AppError::internal_server_error()));
        };

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        match token {
            Some(token) => ready(decode_token(token, &config.jwt_secret)),
            None => ready(Err(AppError::Unauthorized)),
        }
    }
}
