use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    models::{ClassDto, Role},
    services::ClassServiceTrait,
    types::Result,
};

use super::ClassServiceType;

/// Get all classes route handler
pub async fn get_all_handler(
    user: AuthUser,
    service: web::Data<ClassServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let classes = service.list().await?;
    Ok(HttpResponse::Ok().json(classes))
}

/// Get class by ID route handler, open to any signed-in user
pub async fn get_by_id_handler(
    _user: AuthUser,
    id: web::Path<Uuid>,
    service: web::Data<ClassServiceType>,
) -> Result<impl Responder> {
    let class = service.get(&id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(class))
}

/// Create class route handler
pub async fn create_handler(
    user: AuthUser,
    dto: web::Json<ClassDto>,
    service: web::Data<ClassServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let created = service.create(dto.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "insertedId": created.id,
        "activityCount": created.activity_count,
        "message": "Class created successfully",
    })))
}

/// Update class route handler
pub async fn update_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    dto: web::Json<ClassDto>,
    service: web::Data<ClassServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let id = id.into_inner();
    service.update(&id, dto.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "updated_id": id,
        "message": "Class updated successfully",
    })))
}

/// Delete class route handler
pub async fn delete_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    service: web::Data<ClassServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let id = id.into_inner();
    service.delete(&id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "deleted_id": id,
        "message": format!("Successfully deleted class with ID '{}'", id),
    })))
}
