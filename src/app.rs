use std::sync::Arc;
use std::time::Instant;

use actix_cors::Cors;
use actix_web::{
    middleware::{Condition, DefaultHeaders, Logger},
    web, App, HttpServer,
};
use env_logger::Env;
use log::{debug, info};

use crate::{
    auth::JwtKeys,
    config::{Config, Environment, GatekeeperConfig},
    db::Database,
    errors::AppError,
    middleware::{Gatekeeper, HttpTokenVerifier, LocalTokenVerifier, RequestLogger, SharedVerifier, TokenCache},
    routes::{self, RouteLimiters},
    services,
    types::AppState,
};

// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;

// Setup logging with custom format and configuration
fn setup_logging(config: &Config) -> Result<(), AppError> {
    // Configure log level based on environment and config
    let log_level = match config.app.environment {
        Environment::Development => config.app.log_level.clone(),
        Environment::Testing => "debug,actix_web=info".to_string(),
        Environment::Production => "info,actix_web=warn".to_string(),
    };

    let env = Env::default()
        .filter_or("RUST_LOG", log_level)
        .write_style_or("RUST_LOG_STYLE", "always");

    env_logger::try_init_from_env(env)
        .map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))
}

/// Remote verification when an endpoint is configured, in-process otherwise
fn token_verifier(config: &GatekeeperConfig, keys: &JwtKeys) -> AppResult<SharedVerifier> {
    match &config.verify_url {
        Some(url) => {
            info!("Gatekeeper verifies tokens against {}", url);
            let verifier = HttpTokenVerifier::new(url.clone())
                .map_err(|e| AppError::Config(e.to_string()))?;
            Ok(Arc::new(verifier))
        }
        None => Ok(Arc::new(LocalTokenVerifier::new(keys.clone()))),
    }
}

pub async fn server() -> AppResult<()> {
    // Load application configuration
    let config = Config::load()?;

    // Setup enhanced logging based on configuration
    setup_logging(&config)?;

    // Capture start time for uptime calculation
    let start_time = Instant::now();

    // Log startup information
    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {:?}", config.app.environment);
    info!(
        "Binding to {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );

    if config.app.environment == Environment::Development {
        debug!("Debug logging enabled");
        debug!("Full configuration: {:?}", config);
    }

    let db = Database::connect(&config.db)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // State shared by every worker: signing keys, limiter counters and the token cache
    let keys = JwtKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
    let limiters = RouteLimiters::new(&config.rate_limit);
    let token_cache = Arc::new(TokenCache::new(
        config.gatekeeper.cache_ttl,
        config.gatekeeper.cache_capacity,
    ));
    let verifier = token_verifier(&config.gatekeeper, &keys)?;

    // Determine if we should enable more verbose logging
    let enable_debug_logging = config.app.environment != Environment::Production;

    // Create a cloned config for the closure
    let app_config = config.clone();
    let app_db = db.clone();

    // Determine log format based on environment
    let log_format = if enable_debug_logging {
        // Detailed format for development/testing
        "%a \"%r\" %s %b %T \"%{Referer}i\" \"%{User-Agent}i\" %{X-Request-ID}i"
    } else {
        // Simple format for production
        "%a \"%r\" %s %b %T"
    };

    // Start the HTTP server
    HttpServer::new(move || {
        let gatekeeper = Gatekeeper::new(&app_config.gatekeeper, token_cache.clone(), verifier.clone());

        App::new()
            .app_data(web::Data::new(AppState {
                start_time,
                db: app_db.clone(),
                version: app_config.app.version.clone(),
            }))
            .app_data(web::Data::new(app_config.auth.clone()))
            .configure(|cfg| services::register(app_db.clone(), keys.clone(), &app_config.uploads, cfg))
            .configure(|cfg| routes::configure_routes(cfg, &limiters))
            .wrap(Condition::new(app_config.gatekeeper.enabled, gatekeeper))
            .wrap(RequestLogger::new(enable_debug_logging))
            .wrap(Cors::permissive().supports_credentials())
            .wrap(Logger::new(log_format))
            // Add request tracking ID
            .wrap(DefaultHeaders::new().add(("X-Request-ID", uuid::Uuid::new_v4().to_string())))
    })
    .workers(config.server.workers)
    .bind((config.server.host.to_string(), config.server.port))?
    .run()
    .await?;

    db.shutdown().await;
    Ok(())
}
