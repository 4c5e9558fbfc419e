use std::sync::Arc;

use actix_web::web;

mod activity;
mod auth;
mod class;
mod upload;
mod user;

pub use activity::{ActivityService, ActivityServiceTrait};
pub use auth::{AuthService, AuthServiceTrait, LoginOutcome};
pub use class::{ClassService, ClassServiceTrait, CreatedClass};
pub use upload::{FileStore, StoredFile};
pub use user::{UserService, UserServiceTrait};

use crate::{
    auth::JwtKeys,
    config::UploadConfig,
    db::Database,
    repositories::{ActivityRepository, ClassRepository, UserRepository},
};

/// Service Register
pub fn register(db: Database, keys: JwtKeys, uploads: &UploadConfig, cfg: &mut web::ServiceConfig) {
    // create repositories
    let user_repository = Arc::new(UserRepository::new(db.clone()));
    let class_repository = Arc::new(ClassRepository::new(db.clone()));
    let activity_repository = Arc::new(ActivityRepository::new(db));

    let auth_service = AuthService::new(user_repository.clone(), keys.clone());
    let user_service = UserService::new(user_repository);
    let class_service = ClassService::new(class_repository.clone());
    let activity_service = ActivityService::new(activity_repository, class_repository);

    cfg.app_data(web::Data::new(keys))
        .app_data(web::Data::new(auth_service))
        .app_data(web::Data::new(user_service))
        .app_data(web::Data::new(class_service))
        .app_data(web::Data::new(activity_service))
        .app_data(web::Data::new(FileStore::new(uploads)));
}
