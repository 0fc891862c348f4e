pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use std::sync::Arc;

use actix_web::{HttpRequest, error::JsonPayloadError, error::QueryPayloadError, web};
use sqlx::PgPool;

pub use config::Config;
pub use error::AppError;

use database::memory::MemoryStore;
use database::repositories::{
    LeaveCreditRepository, LeaveCreditStore, LeaveRequestRepository, LeaveRequestStore,
    TimeLogRepository, TimeLogStore,
};
use services::{LeaveCreditService, LeaveService, TimeLogService, WorkdayPolicy};

/// Domain services shared by every worker
#[derive(Clone)]
pub struct AppServices {
    pub time_logs: web::Data<TimeLogService>,
    pub leaves: web::Data<LeaveService>,
    pub leave_credits: web::Data<LeaveCreditService>,
}

impl AppServices {
    pub fn new(
        time_log_store: Arc<dyn TimeLogStore>,
        leave_store: Arc<dyn LeaveRequestStore>,
        credit_store: Arc<dyn LeaveCreditStore>,
        config: &Config,
    ) -> Self {
        let offset = config.business_offset();

        Self {
            time_logs: web::Data::new(TimeLogService::new(
                time_log_store,
                WorkdayPolicy::new(offset),
            )),
            leaves: web::Data::new(LeaveService::new(
                leave_store,
                credit_store.clone(),
                offset,
                config.leave_auto_debit,
            )),
            leave_credits: web::Data::new(LeaveCreditService::new(credit_store)),
        }
    }

    pub fn postgres(pool: PgPool, config: &Config) -> Self {
        Self::new(
            Arc::new(TimeLogRepository::new(pool.clone())),
            Arc::new(LeaveRequestRepository::new(pool.clone())),
            Arc::new(LeaveCreditRepository::new(pool)),
            config,
        )
    }

    pub fn in_memory(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store.clone(), store, config)
    }

    /// Register services, extractor configuration and routes on an app
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.time_logs.clone())
            .app_data(self.leaves.clone())
            .app_data(self.leave_credits.clone())
            .app_data(json_config())
            .app_data(query_config())
            .configure(routes::configure);
    }
}

/// Malformed or unknown-field bodies are reported as validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        AppError::validation(format!("Invalid request body: {}", err)).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        AppError::validation(format!("Invalid query: {}", err)).into()
    })
}
