use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod ai;
mod auth;
mod config;
mod controllers;
mod db;
mod models;
mod supervisor;

use ai::AiService;
use config::Config;
use db::Database;
use supervisor::{BotEventWriter, BotRegistry, BotRunner};

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub ai: Arc<AiService>,
    pub registry: Arc<BotRegistry>,
    pub runner: Arc<BotRunner>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Orty backend v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Initializing database at {}", config.sqlite_path);
    let db = Database::new(&config.sqlite_path).expect("Failed to initialize database");
    let db = Arc::new(db);

    let event_writer = Arc::new(BotEventWriter::new(db.clone()));
    let registry = Arc::new(BotRegistry::new(db.clone(), event_writer.clone()));
    let runner = Arc::new(BotRunner::new(
        registry.clone(),
        db.clone(),
        event_writer,
        config.bot_runner_max_bots,
        config.bot_heartbeat_default_seconds,
    ));
    let ai = Arc::new(AiService::new(&config));

    log::info!(
        "LLM provider: {} | bot runner capacity: {}",
        config.llm_provider,
        config.bot_runner_max_bots
    );

    // Clone needed for shutdown handler (before HttpServer moves runner)
    let shutdown_runner = runner.clone();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                config: config.clone(),
                ai: Arc::clone(&ai),
                registry: Arc::clone(&registry),
                runner: Arc::clone(&runner),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config_routes)
            .configure(controllers::chat::config_routes)
            .configure(controllers::clients::config_routes)
            .configure(controllers::bots::config_routes)
    })
    .bind(("0.0.0.0", port))?
    .run();

    log::info!("Listening on 0.0.0.0:{}", port);

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    // Spawn Ctrl+C handler
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        log::info!("Received Ctrl+C, shutting down...");

        // Cancel live bot tasks with a bounded wait
        shutdown_runner
            .shutdown(std::time::Duration::from_secs(5))
            .await;

        // Stop the HTTP server with timeout
        log::info!("Stopping HTTP server...");
        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop)
            .await
            .is_err()
        {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}
