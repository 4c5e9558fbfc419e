use async_trait::async_trait;
use log::{debug, error};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::db::Database;
use crate::errors::RepositoryError;
use crate::models::{Class, ClassDto};
use crate::utils::schedule::ActivitySlot;

type Result<T> = std::result::Result<T, RepositoryError>;

/// Rows per activity insert, three binds each, well under the 65535 bind limit
const ACTIVITY_INSERT_BATCH: usize = 1000;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassRepositoryTrait {
    /// Inserts a class together with one empty activity per slot, atomically
    ///
    /// ### Returns
    /// * `Result<(Class, u64)>` - The stored class and the number of activities created
    ///
    /// ### Errors
    /// * `RepositoryError::Conflict` - If the class code is already used
    async fn create_with_activities(&self, class: &ClassDto, slots: &[ActivitySlot]) -> Result<(Class, u64)>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Class>>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Class>>;

    async fn find_all(&self) -> Result<Vec<Class>>;

    /// Overwrites a class, returns affected rows
    async fn update(&self, id: &Uuid, class: &ClassDto) -> Result<u64>;

    /// Deletes a class and, through the foreign key, its activities
    async fn delete(&self, id: &Uuid) -> Result<bool>;
}

pub struct ClassRepository {
    pool: PgPool,
}

impl ClassRepository {
    pub fn new(db: Database) -> Self {
        Self {
            pool: db.get_pool().clone(),
        }
    }

    async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            error!("Failed to start database transaction: {}", e);
            RepositoryError::Database(e)
        })
    }
}

#[async_trait]
impl ClassRepositoryTrait for ClassRepository {
    async fn create_with_activities(&self, class: &ClassDto, slots: &[ActivitySlot]) -> Result<(Class, u64)> {
        let mut tx = self.begin_transaction().await?;

        let record = sqlx::query_as::<_, Class>(
            r#"
                INSERT INTO classes
                (name, description, class_code, professor, admins, students, is_active, start_date, end_date, schedule, exam_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
            "#,
        )
        .bind(&class.name)
        .bind(&class.description)
        .bind(&class.class_code)
        .bind(&class.professor)
        .bind(&class.admins)
        .bind(&class.students)
        .bind(class.is_active)
        .bind(class.start_date)
        .bind(class.end_date)
        .bind(Json(&class.schedule))
        .bind(class.exam_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert class: {}", e);
            RepositoryError::from(e)
        })?;

        let mut created = 0;
        for batch in slots.chunks(ACTIVITY_INSERT_BATCH) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO activities (class_id, date, time) ");
            builder.push_values(batch, |mut row, slot| {
                row.push_bind(record.id)
                    .push_bind(slot.date)
                    .push_bind(&slot.time);
            });

            created += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to insert activities for class {}: {}", record.id, e);
                    RepositoryError::from(e)
                })?
                .rows_affected();
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            RepositoryError::Database(e)
        })?;

        debug!("Created class {} with {} activities", record.id, created);
        Ok((record, created))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Class>> {
        sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Class>> {
        sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE class_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn find_all(&self) -> Result<Vec<Class>> {
        sqlx::query_as::<_, Class>("SELECT * FROM classes ORDER BY start_date DESC, name")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn update(&self, id: &Uuid, class: &ClassDto) -> Result<u64> {
        debug!("Updating class with id: {}", id);

        let result = sqlx::query(
            r#"
                UPDATE classes SET
                    name = $2, description = $3, class_code = $4, professor = $5,
                    admins = $6, students = $7, is_active = $8, start_date = $9,
                    end_date = $10, schedule = $11, exam_date = $12, updated_at = NOW()
                WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&class.name)
        .bind(&class.description)
        .bind(&class.class_code)
        .bind(&class.professor)
        .bind(&class.admins)
        .bind(&class.students)
        .bind(class.is_active)
        .bind(class.start_date)
        .bind(class.end_date)
        .bind(Json(&class.schedule))
        .bind(class.exam_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
