#![allow(dead_code)]

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use uuid::Uuid;

use workledger::handlers::shared::ApiResponse;
use workledger::services::auth::{Claims, Role};
use workledger::{AppServices, Config};

/// Build a test service over the given `AppServices`, authenticating with
/// the secret from `Config::test_config()`.
macro_rules! init_app {
    ($services:expr) => {{
        let services = $services.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(workledger::Config::test_config()))
                .wrap(workledger::middleware::RequestIdMiddleware)
                .configure(move |cfg| services.configure(cfg)),
        )
        .await
    }};
}
pub(crate) use init_app;

pub fn services() -> AppServices {
    AppServices::in_memory(&Config::test_config())
}

pub fn services_with(config: &Config) -> AppServices {
    AppServices::in_memory(config)
}

/// A caller with a signed bearer token
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub token: String,
}

impl Actor {
    pub fn new(role: Role) -> Self {
        let id = Uuid::new_v4();
        let claims = Claims {
            sub: id,
            role: role.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(Config::test_config().jwt_secret.as_ref()),
        )
        .expect("token encodes");

        Actor { id, role, token }
    }

    pub fn employee() -> Self {
        Self::new(Role::Employee)
    }

    pub fn manager() -> Self {
        Self::new(Role::Manager)
    }

    pub fn auth(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }
}

/// Parse the standard envelope from a response body
pub async fn envelope<B>(res: actix_web::dev::ServiceResponse<B>) -> ApiResponse<Value>
where
    B: actix_web::body::MessageBody,
{
    actix_web::test::read_body_json(res).await
}
