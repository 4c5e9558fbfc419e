use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    models::{ActivityDto, ActivityPatch, ActivityQueryParams, MarkPresentDto, StudentExercisesDto},
    services::ActivityServiceTrait,
    types::Result,
};

use super::ActivityServiceType;

/// List activities route handler, filtered by class and date
pub async fn get_all_handler(
    user: AuthUser,
    query: web::Query<ActivityQueryParams>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let activities = service.list(&query.into_inner(), &user.claims).await?;
    Ok(HttpResponse::Ok().json(activities))
}

/// Get activity by ID route handler
pub async fn get_by_id_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let activity = service.get(&id.into_inner(), &user.claims).await?;
    Ok(HttpResponse::Ok().json(activity))
}

/// Create activity route handler
pub async fn create_handler(
    user: AuthUser,
    dto: web::Json<ActivityDto>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let activity = service.create(dto.into_inner(), &user.claims).await?;
    Ok(HttpResponse::Created().json(json!({
        "insertedId": activity.id,
        "message": "Activity created successfully",
    })))
}

/// Replace activity route handler
pub async fn replace_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    dto: web::Json<ActivityDto>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let id = id.into_inner();
    service.replace(&id, dto.into_inner(), &user.claims).await?;
    Ok(HttpResponse::Ok().json(json!({
        "updated_id": id,
        "message": "Activity updated successfully",
    })))
}

/// Partial activity update route handler
pub async fn patch_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    patch: web::Json<ActivityPatch>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let id = id.into_inner();
    service.patch(&id, patch.into_inner(), &user.claims).await?;
    Ok(HttpResponse::Ok().json(json!({
        "updated_id": id,
        "message": "Activity updated successfully",
    })))
}

/// Close attendance route handler
pub async fn finish_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let id = id.into_inner();
    service.finish(&id, &user.claims).await?;
    Ok(HttpResponse::Ok().json(json!({
        "updated_id": id,
        "message": "Activity finished",
    })))
}

/// Replace a student's exercise answers route handler
pub async fn student_exercises_handler(
    user: AuthUser,
    path: web::Path<(Uuid, String)>,
    dto: web::Json<StudentExercisesDto>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let (id, student_id) = path.into_inner();
    service
        .replace_student_exercises(&id, &student_id, dto.into_inner().exercises, &user.claims)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "updated_id": id,
        "message": "Exercises updated successfully",
    })))
}

/// Mark present route handler
pub async fn mark_present_handler(
    user: AuthUser,
    dto: web::Json<MarkPresentDto>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    user.require_self_or_staff(&dto.student_id)?;

    let marked = service.mark_present(dto.into_inner(), &user.claims).await?;
    let message = if marked {
        "Marked as present"
    } else {
        "Already marked as present"
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}
