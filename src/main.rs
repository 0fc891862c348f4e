use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::Result;

use workledger::database::init_database;
use workledger::middleware::RequestIdMiddleware;
use workledger::{AppServices, Config};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Workledger API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env first)
    let config = Config::from_env()?;

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!(
        "Starting Workledger API server (environment: {})",
        config.environment
    );

    if config.is_production() && config.uses_memory_store() {
        anyhow::bail!("DATABASE_URL=memory cannot be used in production");
    }

    let services = if config.uses_memory_store() {
        log::warn!("DATABASE_URL=memory: records are kept in process only");
        AppServices::in_memory(&config)
    } else {
        let pool = init_database(&config.database_url).await?;
        log::info!("Database initialized");
        AppServices::postgres(pool, &config)
    };

    if config.leave_auto_debit {
        log::info!("Approved leave is debited from leave credits automatically");
    }

    let config_data = web::Data::new(config.clone());
    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .configure(|cfg| services.configure(cfg))
            .wrap(
                Cors::default()
                    .allowed_origin(&config.client_base_url)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Request-ID",
                    ])
                    .expose_headers(vec!["X-Request-ID"])
                    .max_age(3600),
            )
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T request_id=%{x-request-id}o"#,
            ))
            .service(hello)
            .service(health)
    })
    .bind(&server_address)?
    .run()
    .await?;

    Ok(())
}
