use async_trait::async_trait;
use log::{debug, error};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::Database;
use crate::errors::RepositoryError;
use crate::models::{Activity, ActivityPatch, ActivityQueryParams, NewActivity};

type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepositoryTrait {
    async fn save(&self, activity: &NewActivity) -> Result<Activity>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Activity>>;

    /// Lists activities, optionally narrowed to one class and/or one date
    async fn find(&self, params: &ActivityQueryParams) -> Result<Vec<Activity>>;

    /// Overwrites every field except the owning class
    async fn replace(&self, id: &Uuid, activity: &NewActivity) -> Result<u64>;

    /// Sets only the fields present in the patch
    async fn patch(&self, id: &Uuid, patch: &ActivityPatch) -> Result<u64>;

    /// Writes back the exercise and student documents of a previously read activity.
    ///
    /// The write only lands if the row is unchanged since it was read
    /// (`updated_at` still matches), so concurrent read-modify-write cycles
    /// never lose each other's updates.
    ///
    /// ### Returns
    /// * `Result<bool>` - false when the row changed or disappeared in between
    async fn store_documents(&self, activity: &Activity) -> Result<bool>;
}

pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(db: Database) -> Self {
        Self {
            pool: db.get_pool().clone(),
        }
    }
}

#[async_trait]
impl ActivityRepositoryTrait for ActivityRepository {
    async fn save(&self, activity: &NewActivity) -> Result<Activity> {
        sqlx::query_as::<_, Activity>(
            r#"
                INSERT INTO activities
                (class_id, date, time, present_enable, alert, note, class_exercises, students)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            "#,
        )
        .bind(activity.class_id)
        .bind(activity.date)
        .bind(&activity.time)
        .bind(activity.present_enable)
        .bind(&activity.alert)
        .bind(&activity.note)
        .bind(Json(&activity.class_exercises))
        .bind(Json(&activity.students))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert activity: {}", e);
            RepositoryError::from(e)
        })
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Activity>> {
        sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn find(&self, params: &ActivityQueryParams) -> Result<Vec<Activity>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM activities WHERE TRUE");

        if let Some(class_id) = params.class_id {
            builder.push(" AND class_id = ").push_bind(class_id);
        }
        if let Some(date) = params.date {
            builder.push(" AND date = ").push_bind(date);
        }
        builder.push(" ORDER BY date, time");

        builder
            .build_query_as::<Activity>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::Database)
    }

    async fn replace(&self, id: &Uuid, activity: &NewActivity) -> Result<u64> {
        debug!("Replacing activity with id: {}", id);

        let result = sqlx::query(
            r#"
                UPDATE activities SET
                    date = $2, time = $3, present_enable = $4, alert = $5, note = $6,
                    class_exercises = $7, students = $8, updated_at = NOW()
                WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(activity.date)
        .bind(&activity.time)
        .bind(activity.present_enable)
        .bind(&activity.alert)
        .bind(&activity.note)
        .bind(Json(&activity.class_exercises))
        .bind(Json(&activity.students))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn patch(&self, id: &Uuid, patch: &ActivityPatch) -> Result<u64> {
        if patch.is_empty() {
            return Err(RepositoryError::InvalidData("No fields to update".to_string()));
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE activities SET ");
        let mut fields = builder.separated(", ");

        if let Some(present_enable) = patch.present_enable {
            fields.push("present_enable = ").push_bind_unseparated(present_enable);
        }
        if let Some(alert) = &patch.alert {
            fields.push("alert = ").push_bind_unseparated(alert);
        }
        if let Some(note) = &patch.note {
            fields.push("note = ").push_bind_unseparated(note);
        }
        if let Some(exercises) = &patch.class_exercises {
            fields.push("class_exercises = ").push_bind_unseparated(Json(exercises));
        }
        if let Some(students) = &patch.students {
            fields.push("students = ").push_bind_unseparated(Json(students));
        }
        fields.push("updated_at = NOW()");

        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn store_documents(&self, activity: &Activity) -> Result<bool> {
        let result = sqlx::query(
            r#"
                UPDATE activities SET
                    present_enable = $3, class_exercises = $4, students = $5, updated_at = NOW()
                WHERE id = $1 AND updated_at = $2
            "#,
        )
        .bind(activity.id)
        .bind(activity.updated_at)
        .bind(activity.present_enable)
        .bind(Json(&activity.class_exercises))
        .bind(Json(&activity.students))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
