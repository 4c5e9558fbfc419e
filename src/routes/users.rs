use actix_web::web;

use super::RouteLimiters;
use crate::handlers::users::{create_handler, delete_handler, get_all_handler, update_handler};

pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        web::scope("/api/users")
            .wrap(limiters.wrap("users", &limiters.users))
            .route("", web::get().to(get_all_handler))
            .route("", web::post().to(create_handler))
            .route("/{id}", web::put().to(update_handler))
            .route("/{id}", web::delete().to(delete_handler)),
    );
}
