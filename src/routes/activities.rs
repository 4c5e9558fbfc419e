use actix_web::web;

use super::RouteLimiters;
use crate::handlers::activities::{
    create_handler, finish_handler, get_all_handler, get_by_id_handler, mark_present_handler,
    patch_handler, replace_handler, student_exercises_handler,
};

pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        web::scope("/api/class-activities")
            .wrap(limiters.wrap("activities", &limiters.activities))
            .route("", web::get().to(get_all_handler))
            .route("", web::post().to(create_handler))
            .route("/{id}", web::get().to(get_by_id_handler))
            .route("/{id}", web::put().to(replace_handler))
            .route("/{id}", web::patch().to(patch_handler))
            .route("/{id}/finish", web::post().to(finish_handler))
            .route(
                "/{id}/students/{student_id}/exercises",
                web::put().to(student_exercises_handler),
            ),
    )
    .service(
        web::resource("/api/markPresent")
            .wrap(limiters.wrap("attendance", &limiters.attendance))
            .route(web::post().to(mark_present_handler)),
    );
}
