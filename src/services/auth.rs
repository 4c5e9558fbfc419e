use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, Claims, JwtKeys};
use crate::errors::ServiceError;
use crate::models::{
    LoginDto, NewUser, RegisterUserDto, Role, User, UserProfileDto, DEFAULT_PROFILE_IMAGE,
    DEFAULT_USERTYPE,
};
use crate::repositories::UserRepositoryTrait;

type Result<T> = std::result::Result<T, ServiceError>;

/// Signed token plus the account it was issued for
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthServiceTrait {
    /// Self-service sign up; new accounts are always active students
    async fn register(&self, dto: RegisterUserDto) -> Result<Uuid>;

    /// Checks credentials and issues a session token
    ///
    /// ### Errors
    /// * `ServiceError::NotFound` - No account for the email or phone number
    /// * `ServiceError::Unauthorized` - Wrong password
    /// * `ServiceError::Forbidden` - Account is deactivated
    async fn login(&self, dto: LoginDto) -> Result<LoginOutcome>;

    fn verify(&self, token: &str) -> Result<Claims>;

    async fn profile(&self, id: &Uuid) -> Result<UserProfileDto>;
}

pub struct AuthService<T: UserRepositoryTrait> {
    repository: Arc<T>,
    keys: JwtKeys,
}

impl<T: UserRepositoryTrait> AuthService<T> {
    pub fn new(repository: Arc<T>, keys: JwtKeys) -> Self {
        Self { repository, keys }
    }
}

#[async_trait]
impl<T: UserRepositoryTrait + Send + Sync> AuthServiceTrait for AuthService<T> {
    async fn register(&self, dto: RegisterUserDto) -> Result<Uuid> {
        dto.validate()?;

        let taken = self
            .repository
            .find_conflicting(&dto.email, Some(dto.phone_number.clone()), &dto.student_number, None)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let user = NewUser {
            name: dto.name,
            family_name: dto.family_name,
            email: dto.email,
            phone_number: Some(dto.phone_number),
            student_number: dto.student_number,
            password_hash: hash_password(dto.password).await?,
            role: Role::Student,
            usertype: DEFAULT_USERTYPE.to_string(),
            profile: DEFAULT_PROFILE_IMAGE.to_string(),
        };

        let record = self.repository.save(&user).await?;
        info!("Registered user {}", record.id);
        Ok(record.id)
    }

    async fn login(&self, dto: LoginDto) -> Result<LoginOutcome> {
        dto.validate()?;

        let user = self
            .repository
            .find_by_login(dto.email_or_phone.trim())
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !verify_password(dto.password, user.password_hash.clone()).await? {
            debug!("Wrong password for user {}", user.id);
            return Err(ServiceError::Unauthorized("Invalid password".to_string()));
        }

        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is deactivated".to_string()));
        }

        let token = self
            .keys
            .issue(&user)
            .map_err(|e| ServiceError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(LoginOutcome { token, user })
    }

    fn verify(&self, token: &str) -> Result<Claims> {
        self.keys
            .decode(token)
            .ok_or_else(|| ServiceError::Unauthorized("Invalid token".to_string()))
    }

    async fn profile(&self, id: &Uuid) -> Result<UserProfileDto> {
        self.repository
            .find_by_id(id)
            .await?
            .map(UserProfileDto::from)
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}
