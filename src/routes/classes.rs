use actix_web::web;

use super::RouteLimiters;
use crate::handlers::classes::{
    create_handler, delete_handler, get_all_handler, get_by_id_handler, update_handler,
};

pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        web::scope("/api/classes")
            .wrap(limiters.wrap("classes", &limiters.classes))
            .route("", web::get().to(get_all_handler))
            .route("", web::post().to(create_handler))
            .route("/{id}", web::get().to(get_by_id_handler))
            .route("/{id}", web::put().to(update_handler))
            .route("/{id}", web::delete().to(delete_handler)),
    );
}
