use actix_web::web;

use super::RouteLimiters;
use crate::handlers::uploads::{upload_assignment_handler, upload_exercise_handler, upload_handler};

pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        web::resource("/api/upload")
            .wrap(limiters.wrap("upload", &limiters.upload))
            .route(web::post().to(upload_handler)),
    )
    .service(
        web::resource("/api/uploadAssignment")
            .wrap(limiters.wrap("upload-assignment", &limiters.upload_assignment))
            .route(web::post().to(upload_assignment_handler)),
    )
    .service(
        web::resource("/api/uploadExercise")
            .wrap(limiters.wrap("upload-exercise", &limiters.upload_exercise))
            .route(web::post().to(upload_exercise_handler)),
    );
}
