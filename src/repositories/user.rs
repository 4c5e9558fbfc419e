use async_trait::async_trait;
use log::{debug, error};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::Database;
use crate::errors::RepositoryError;
use crate::models::{NewUser, UpdateUserDto, User};

type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait {
    /// Inserts a user and returns the stored row
    ///
    /// ### Errors
    /// * `RepositoryError::Conflict` - If email, phone number or student number is taken
    async fn save(&self, user: &NewUser) -> Result<User>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>>;

    /// Finds a user whose email or phone number equals `login`
    async fn find_by_login(&self, login: &str) -> Result<Option<User>>;

    /// Finds any other user already holding one of the unique identifiers
    async fn find_conflicting(
        &self,
        email: &str,
        phone_number: Option<String>,
        student_number: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>>;

    async fn find_all(&self) -> Result<Vec<User>>;

    /// Overwrites profile fields, returns affected rows
    async fn update(&self, id: &Uuid, params: &UpdateUserDto) -> Result<u64>;

    /// Deletes a user, returns whether a row was removed
    async fn delete(&self, id: &Uuid) -> Result<bool>;
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self {
            pool: db.get_pool().clone(),
        }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn save(&self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
                INSERT INTO users
                (name, family_name, email, phone_number, student_number, password_hash, is_active, role, usertype, profile)
                VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9)
                RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.family_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.student_number)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.usertype)
        .bind(&user.profile)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert user: {}", e);
            RepositoryError::from(e)
        })
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 OR phone_number = $1 LIMIT 1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::Database)
    }

    async fn find_conflicting(
        &self,
        email: &str,
        phone_number: Option<String>,
        student_number: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
                SELECT * FROM users
                WHERE (email = $1 OR ($2::TEXT IS NOT NULL AND phone_number = $2) OR student_number = $3)
                AND ($4::UUID IS NULL OR id <> $4)
                LIMIT 1
            "#,
        )
        .bind(email)
        .bind(phone_number)
        .bind(student_number)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::Database)
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn update(&self, id: &Uuid, params: &UpdateUserDto) -> Result<u64> {
        debug!("Updating user with id: {}", id);

        let result = sqlx::query(
            r#"
                UPDATE users SET
                    name = $2, family_name = $3, email = $4, phone_number = $5,
                    student_number = $6, is_active = $7, usertype = $8, role = $9,
                    profile = $10, updated_at = NOW()
                WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&params.name)
        .bind(&params.family_name)
        .bind(&params.email)
        .bind(&params.phone_number)
        .bind(&params.student_number)
        .bind(params.is_active)
        .bind(&params.usertype)
        .bind(params.role.as_str())
        .bind(&params.profile)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
