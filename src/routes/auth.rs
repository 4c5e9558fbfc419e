use actix_web::web;

use super::RouteLimiters;
use crate::handlers::auth::{login_handler, profile_handler, register_handler, verify_token_handler};

pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        web::resource("/api/register")
            .wrap(limiters.wrap("register", &limiters.register))
            .route(web::post().to(register_handler)),
    )
    .service(
        web::resource("/api/login")
            .wrap(limiters.wrap("login", &limiters.login))
            .route(web::post().to(login_handler)),
    )
    .route("/api/verify-token", web::get().to(verify_token_handler))
    .route("/api/user", web::get().to(profile_handler));
}
