use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    models::{CreateUserDto, Role, UpdateUserDto},
    services::UserServiceTrait,
    types::Result,
};

use super::UserServiceType;

/// Get all users route handler
pub async fn get_all_handler(
    user: AuthUser,
    service: web::Data<UserServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let users = service.list().await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Create user route handler
pub async fn create_handler(
    user: AuthUser,
    dto: web::Json<CreateUserDto>,
    service: web::Data<UserServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let id = service.create(dto.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "insertedId": id,
        "message": "Successfully created user",
    })))
}

/// Update user route handler
pub async fn update_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    dto: web::Json<UpdateUserDto>,
    service: web::Data<UserServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let id = id.into_inner();
    service.update(&id, dto.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "updated_id": id,
        "message": "User updated successfully",
    })))
}

/// Delete user route handler
pub async fn delete_handler(
    user: AuthUser,
    id: web::Path<Uuid>,
    service: web::Data<UserServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin])?;

    let id = id.into_inner();
    service.delete(&id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "deleted_id": id,
        "message": format!("Successfully deleted user with ID '{}'", id),
    })))
}
