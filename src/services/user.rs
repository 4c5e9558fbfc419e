use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::hash_password;
use crate::errors::ServiceError;
use crate::models::{CreateUserDto, NewUser, UpdateUserDto, User};
use crate::repositories::UserRepositoryTrait;

type Result<T> = std::result::Result<T, ServiceError>;

#[async_trait]
pub trait UserServiceTrait {
    async fn list(&self) -> Result<Vec<User>>;
    async fn create(&self, dto: CreateUserDto) -> Result<Uuid>;
    async fn update(&self, id: &Uuid, dto: UpdateUserDto) -> Result<()>;
    async fn delete(&self, id: &Uuid) -> Result<()>;
}

pub struct UserService<T: UserRepositoryTrait> {
    repository: Arc<T>,
}

impl<T: UserRepositoryTrait> UserService<T> {
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }
}

impl<T: UserRepositoryTrait + Send + Sync> UserService<T> {
    async fn ensure_unique(
        &self,
        email: &str,
        phone_number: Option<String>,
        student_number: &str,
        exclude: Option<Uuid>,
    ) -> Result<()> {
        let phone_number = phone_number.filter(|p| !p.trim().is_empty());
        match self
            .repository
            .find_conflicting(email, phone_number, student_number, exclude)
            .await?
        {
            Some(_) => Err(ServiceError::Conflict(
                "Email, phone number or student number is already in use".to_string(),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T: UserRepositoryTrait + Send + Sync> UserServiceTrait for UserService<T> {
    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.repository.find_all().await?)
    }

    async fn create(&self, dto: CreateUserDto) -> Result<Uuid> {
        dto.validate()?;
        self.ensure_unique(&dto.email, dto.phone_number.clone(), &dto.student_number, None)
            .await?;

        let user = NewUser {
            name: dto.name,
            family_name: dto.family_name,
            email: dto.email,
            phone_number: dto.phone_number.filter(|p| !p.trim().is_empty()),
            student_number: dto.student_number,
            password_hash: hash_password(dto.password).await?,
            role: dto.role,
            usertype: dto.usertype,
            profile: dto.profile,
        };

        let record = self.repository.save(&user).await?;
        info!("Created {} account {}", record.role, record.id);
        Ok(record.id)
    }

    async fn update(&self, id: &Uuid, dto: UpdateUserDto) -> Result<()> {
        dto.validate()?;
        self.ensure_unique(&dto.email, dto.phone_number.clone(), &dto.student_number, Some(*id))
            .await?;

        match self.repository.update(id, &dto).await? {
            0 => Err(ServiceError::NotFound(format!("User with ID '{}' not found", id))),
            _ => Ok(()),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        if self.repository.delete(id).await? {
            info!("Deleted user {}", id);
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("User with ID '{}' not found", id)))
        }
    }
}
