use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::validations::validate_not_blank;

pub const DEFAULT_PROFILE_IMAGE: &str = "/images/user/user-03.png";
pub const DEFAULT_USERTYPE: &str = "Normal";

/// Role claim carried in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Professor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(Role::Student),
            "Professor" => Ok(Role::Professor),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A registered account
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub family_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub student_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub usertype: String,
    pub profile: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row to insert, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub family_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub student_number: String,
    pub password_hash: String,
    pub role: Role,
    pub usertype: String,
    pub profile: String,
}

// Self-service registration form
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserDto {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[serde(alias = "familyName")]
    #[validate(custom(function = "validate_not_blank"))]
    pub family_name: String,

    #[validate(email(message = "Email address is invalid"))]
    pub email: String,

    #[serde(alias = "phoneNumber")]
    #[validate(custom(function = "validate_not_blank"))]
    pub phone_number: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,

    #[serde(alias = "studentNumber")]
    #[validate(custom(function = "validate_not_blank"))]
    pub student_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginDto {
    #[serde(rename = "emailOrPhone", alias = "email_or_phone")]
    #[validate(custom(function = "validate_not_blank"))]
    pub email_or_phone: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
}

// Admin-created account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserDto {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[serde(alias = "familyName")]
    #[validate(custom(function = "validate_not_blank"))]
    pub family_name: String,

    #[validate(email(message = "Email address is invalid"))]
    pub email: String,

    #[serde(default, alias = "phoneNumber")]
    pub phone_number: Option<String>,

    #[serde(alias = "studentNumber")]
    #[validate(custom(function = "validate_not_blank"))]
    pub student_number: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub usertype: String,

    pub role: Role,

    #[validate(custom(function = "validate_not_blank"))]
    pub profile: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserDto {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[serde(alias = "familyName")]
    #[validate(custom(function = "validate_not_blank"))]
    pub family_name: String,

    #[validate(email(message = "Email address is invalid"))]
    pub email: String,

    #[serde(default, alias = "phoneNumber")]
    pub phone_number: Option<String>,

    #[serde(alias = "studentNumber")]
    #[validate(custom(function = "validate_not_blank"))]
    pub student_number: String,

    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,

    #[validate(custom(function = "validate_not_blank"))]
    pub usertype: String,

    pub role: Role,

    #[validate(custom(function = "validate_not_blank"))]
    pub profile: String,
}

fn default_active() -> bool {
    true
}

/// Public profile of the signed-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfileDto {
    pub name: String,
    pub family_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub student_number: String,
}

impl From<User> for UserProfileDto {
    fn from(user: User) -> Self {
        UserProfileDto {
            name: user.name,
            family_name: user.family_name,
            email: user.email,
            phone_number: user.phone_number,
            student_number: user.student_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::try_from("Professor".to_string()).unwrap(), Role::Professor);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_register_dto_accepts_form_field_names() {
        let dto: RegisterUserDto = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "familyName": "Lovelace",
            "email": "ada@example.com",
            "phoneNumber": "0912",
            "password": "secret",
            "student_number": "S-1"
        }))
        .unwrap();
        assert_eq!(dto.family_name, "Lovelace");
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_register_dto_rejects_blank_fields() {
        let dto = RegisterUserDto {
            name: "  ".into(),
            family_name: "Lovelace".into(),
            email: "not-an-email".into(),
            phone_number: "0912".into(),
            password: "secret".into(),
            student_number: "S-1".into(),
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            family_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone_number: None,
            student_number: "S-1".into(),
            password_hash: "hash".into(),
            is_active: true,
            role: Role::Student,
            usertype: DEFAULT_USERTYPE.into(),
            profile: DEFAULT_PROFILE_IMAGE.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], "Student");
        assert_eq!(value["isActive"], true);
    }
}
