use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::{Class, ClassDto};
use crate::repositories::ClassRepositoryTrait;
use crate::utils::schedule::activity_slots;

type Result<T> = std::result::Result<T, ServiceError>;

/// Id of a new class and how many activities were generated for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedClass {
    pub id: Uuid,
    pub activity_count: u64,
}

#[async_trait]
pub trait ClassServiceTrait {
    async fn list(&self) -> Result<Vec<Class>>;

    async fn get(&self, id: &Uuid) -> Result<Class>;

    /// Stores the class and one activity per scheduled day between its start and end dates
    ///
    /// ### Errors
    /// * `ServiceError::Validation` - Missing fields or end date before start date
    /// * `ServiceError::Conflict` - The class code is already used
    async fn create(&self, dto: ClassDto) -> Result<CreatedClass>;

    /// Full update; already generated activities are kept as they are
    async fn update(&self, id: &Uuid, dto: ClassDto) -> Result<()>;

    async fn delete(&self, id: &Uuid) -> Result<()>;
}

pub struct ClassService<T: ClassRepositoryTrait> {
    repository: Arc<T>,
}

impl<T: ClassRepositoryTrait> ClassService<T> {
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }
}

fn not_found(id: &Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Class with ID '{}' not found", id))
}

#[async_trait]
impl<T: ClassRepositoryTrait + Send + Sync> ClassServiceTrait for ClassService<T> {
    async fn list(&self) -> Result<Vec<Class>> {
        Ok(self.repository.find_all().await?)
    }

    async fn get(&self, id: &Uuid) -> Result<Class> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, dto: ClassDto) -> Result<CreatedClass> {
        dto.validate()?;

        if self.repository.find_by_code(&dto.class_code).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Class with classID '{}' already exists",
                dto.class_code
            )));
        }

        let slots = activity_slots(dto.start_date, dto.end_date, &dto.schedule);
        let (class, activity_count) = self.repository.create_with_activities(&dto, &slots).await?;

        info!("Created class {} with {} activities", class.id, activity_count);
        Ok(CreatedClass {
            id: class.id,
            activity_count,
        })
    }

    async fn update(&self, id: &Uuid, dto: ClassDto) -> Result<()> {
        dto.validate()?;

        if let Some(other) = self.repository.find_by_code(&dto.class_code).await? {
            if other.id != *id {
                return Err(ServiceError::Conflict(format!(
                    "Class with classID '{}' already exists",
                    dto.class_code
                )));
            }
        }

        match self.repository.update(id, &dto).await? {
            0 => Err(not_found(id)),
            _ => Ok(()),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        if self.repository.delete(id).await? {
            info!("Deleted class {} and its activities", id);
            Ok(())
        } else {
            Err(not_found(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::models::Schedule;
    use crate::repositories::MockClassRepositoryTrait;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dto() -> ClassDto {
        ClassDto {
            name: "Algorithms".into(),
            description: "Intro course".into(),
            class_code: "CS-101".into(),
            professor: Uuid::new_v4().to_string(),
            admins: Vec::new(),
            students: vec!["s1".into()],
            is_active: true,
            // Monday 2 September to Sunday 15 September
            start_date: date(2024, 9, 2),
            end_date: date(2024, 9, 15),
            exam_date: date(2024, 9, 20),
            schedule: Schedule {
                day1: Some("10:00".into()),
                day3: Some("14:00".into()),
                ..Default::default()
            },
        }
    }

    fn class_from(dto: &ClassDto) -> Class {
        Class {
            id: Uuid::new_v4(),
            name: dto.name.clone(),
            description: dto.description.clone(),
            class_code: dto.class_code.clone(),
            professor: dto.professor.clone(),
            admins: dto.admins.clone(),
            students: dto.students.clone(),
            is_active: dto.is_active,
            start_date: dto.start_date,
            end_date: dto.end_date,
            schedule: dto.schedule.clone(),
            exam_date: dto.exam_date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn test_create_generates_one_activity_per_scheduled_day() {
        let mut repo = MockClassRepositoryTrait::new();
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_create_with_activities()
            .withf(|_, slots| {
                slots.len() == 4
                    && slots[0].date == date(2024, 9, 2)
                    && slots[0].time == "10:00"
                    && slots[1].date == date(2024, 9, 4)
                    && slots[1].time == "14:00"
            })
            .times(1)
            .returning(|dto, slots| Ok((class_from(dto), slots.len() as u64)));

        let service = ClassService::new(Arc::new(repo));
        let created = service.create(dto()).await.unwrap();
        assert_eq!(created.activity_count, 4);
    }

    #[actix_web::test]
    async fn test_create_rejects_existing_code() {
        let existing = class_from(&dto());
        let mut repo = MockClassRepositoryTrait::new();
        repo.expect_find_by_code()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_create_with_activities().never();

        let service = ClassService::new(Arc::new(repo));
        let err = service.create(dto()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[actix_web::test]
    async fn test_create_rejects_inverted_dates() {
        let mut repo = MockClassRepositoryTrait::new();
        repo.expect_find_by_code().never();

        let mut dto = dto();
        dto.end_date = date(2024, 8, 1);
        let service = ClassService::new(Arc::new(repo));
        let err = service.create(dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn test_update_keeps_own_code() {
        let dto = dto();
        let current = class_from(&dto);
        let id = current.id;

        let mut repo = MockClassRepositoryTrait::new();
        repo.expect_find_by_code()
            .returning(move |_| Ok(Some(current.clone())));
        repo.expect_update().times(1).returning(|_, _| Ok(1));

        let service = ClassService::new(Arc::new(repo));
        assert!(service.update(&id, dto).await.is_ok());
    }

    #[actix_web::test]
    async fn test_get_missing_class() {
        let mut repo = MockClassRepositoryTrait::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = ClassService::new(Arc::new(repo));
        let err = service.get(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
