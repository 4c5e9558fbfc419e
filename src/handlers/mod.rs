pub mod activities;
pub mod auth;
pub mod classes;
pub mod uploads;
pub mod users;

use crate::{
    repositories::{ActivityRepository, ClassRepository, UserRepository},
    services::{ActivityService, AuthService, ClassService, UserService},
};

pub type AuthServiceType = AuthService<UserRepository>;
pub type UserServiceType = UserService<UserRepository>;
pub type ClassServiceType = ClassService<ClassRepository>;
pub type ActivityServiceType = ActivityService<ActivityRepository, ClassRepository>;
