use std::sync::Arc;

use actix_web::{middleware::Condition, web, HttpResponse, Responder};

use crate::{
    config::RateLimitConfig,
    db::DBHealthStatus,
    errors::AppError,
    middleware::{FixedWindowLimiter, RateLimiter},
    types::{AppState, HealthStatus, ResponsePayload},
};

mod activities;
mod auth;
mod classes;
mod uploads;
mod users;

/// One limiter per route group, shared by every worker
#[derive(Clone)]
pub struct RouteLimiters {
    enabled: bool,
    login: Arc<FixedWindowLimiter>,
    register: Arc<FixedWindowLimiter>,
    users: Arc<FixedWindowLimiter>,
    classes: Arc<FixedWindowLimiter>,
    activities: Arc<FixedWindowLimiter>,
    attendance: Arc<FixedWindowLimiter>,
    upload: Arc<FixedWindowLimiter>,
    upload_assignment: Arc<FixedWindowLimiter>,
    upload_exercise: Arc<FixedWindowLimiter>,
}

impl RouteLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        let auth = || Arc::new(FixedWindowLimiter::new(config.auth));
        let api = || Arc::new(FixedWindowLimiter::new(config.api));

        Self {
            enabled: config.enabled,
            login: auth(),
            register: auth(),
            users: api(),
            classes: api(),
            activities: api(),
            attendance: api(),
            upload: api(),
            upload_assignment: api(),
            upload_exercise: api(),
        }
    }

    fn wrap(&self, name: &'static str, limiter: &Arc<FixedWindowLimiter>) -> Condition<RateLimiter> {
        Condition::new(self.enabled, RateLimiter::new(name, limiter.clone()))
    }
}

// Handler function for the root route "/"
async fn index() -> impl Responder {
    let welcome_message = ResponsePayload {
        status: 200,
        message: String::from("Welcome to the classroom API!"),
    };

    // Return the struct as JSON
    HttpResponse::Ok().json(welcome_message)
}

// Handler function for the health check endpoint
async fn health_check(data: web::Data<AppState>) -> impl Responder {
    // Calculate uptime in seconds
    let uptime = data.start_time.elapsed().as_secs();
    let db_health = data.db.health_check().await;

    let status = match db_health.status {
        DBHealthStatus::Healthy => "OK",
        DBHealthStatus::Unhealthy => "DEGRADED",
    };

    let status = HealthStatus {
        status: String::from(status),
        version: data.version.clone(),
        db_health: Some(db_health),
        uptime_seconds: uptime,
    };

    // Return the status as JSON
    HttpResponse::Ok().json(status)
}

/// Malformed bodies, paths and queries answer with the usual error payload
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    );
}

// Configure all routes function
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RouteLimiters) {
    extractor_configs(cfg);

    cfg.route("/", web::get().to(index));
    cfg.route("/health", web::get().to(health_check));

    // Register routes from individual modules
    auth::configure_routes(cfg, limiters);
    users::configure_routes(cfg, limiters);
    classes::configure_routes(cfg, limiters);
    activities::configure_routes(cfg, limiters);
    uploads::configure_routes(cfg, limiters);
}
