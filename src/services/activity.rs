use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Claims;
use crate::errors::ServiceError;
use crate::models::{
    Activity, ActivityDto, ActivityPatch, ActivityQueryParams, Class, ClassExercise,
    ExerciseAnswer, MarkPresentDto, NewActivity, Role,
};
use crate::repositories::{ActivityRepositoryTrait, ClassRepositoryTrait};

type Result<T> = std::result::Result<T, ServiceError>;

/// Read-modify-write cycles attempted before giving up on a busy activity
const MAX_WRITE_ATTEMPTS: usize = 3;

#[async_trait]
pub trait ActivityServiceTrait {
    /// Filtered activities, each trimmed to what `caller` may see
    async fn list(&self, params: &ActivityQueryParams, caller: &Claims) -> Result<Vec<Activity>>;

    /// Activity as seen by `caller`: class managers get every student record,
    /// anyone else only their own
    async fn get(&self, id: &Uuid, caller: &Claims) -> Result<Activity>;

    async fn create(&self, dto: ActivityDto, caller: &Claims) -> Result<Activity>;

    async fn replace(&self, id: &Uuid, dto: ActivityDto, caller: &Claims) -> Result<()>;

    async fn patch(&self, id: &Uuid, patch: ActivityPatch, caller: &Claims) -> Result<()>;

    /// Closes attendance for the activity
    async fn finish(&self, id: &Uuid, caller: &Claims) -> Result<()>;

    async fn replace_student_exercises(
        &self,
        id: &Uuid,
        student_id: &str,
        exercises: Vec<ExerciseAnswer>,
        caller: &Claims,
    ) -> Result<()>;

    /// Marks the student present, enrolling them if needed
    ///
    /// ### Returns
    /// * `Result<bool>` - false when the student was already marked present
    ///
    /// ### Errors
    /// * `ServiceError::NotFound` - Unknown activity
    /// * `ServiceError::Forbidden` - Attendance is closed, or the caller is someone else
    async fn mark_present(&self, dto: MarkPresentDto, caller: &Claims) -> Result<bool>;

    /// Appends a staff-provided exercise to the activity
    async fn attach_class_exercise(&self, id: &Uuid, exercise: ClassExercise, caller: &Claims) -> Result<()>;

    /// Appends an answer to the caller's own student record
    async fn attach_student_answer(
        &self,
        id: &Uuid,
        student_id: &str,
        answer: ExerciseAnswer,
        caller: &Claims,
    ) -> Result<()>;
}

pub struct ActivityService<A: ActivityRepositoryTrait, C: ClassRepositoryTrait> {
    activities: Arc<A>,
    classes: Arc<C>,
}

impl<A: ActivityRepositoryTrait, C: ClassRepositoryTrait> ActivityService<A, C> {
    pub fn new(activities: Arc<A>, classes: Arc<C>) -> Self {
        Self { activities, classes }
    }
}

/// Admins manage every class, professors only their own
fn can_manage(class: &Class, caller: &Claims) -> bool {
    caller.role == Role::Admin || class.is_professor(&caller.id)
}

fn ensure_manager(class: &Class, caller: &Claims) -> Result<()> {
    if can_manage(class, caller) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Only admins or the class professor can manage its activities".to_string(),
        ))
    }
}

fn is_caller(student_id: &str, caller: &Claims) -> bool {
    Uuid::parse_str(student_id.trim())
        .map(|id| id == caller.id)
        .unwrap_or(false)
}

/// Stored form of a student id: the caller's canonical id when it names the caller
fn record_id(student_id: &str, caller: &Claims) -> String {
    if is_caller(student_id, caller) {
        caller.id.to_string()
    } else {
        student_id.trim().to_string()
    }
}

fn student_not_found(student_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Student '{}' is not part of this activity", student_id))
}

impl<A, C> ActivityService<A, C>
where
    A: ActivityRepositoryTrait + Send + Sync,
    C: ClassRepositoryTrait + Send + Sync,
{
    async fn find_activity(&self, id: &Uuid) -> Result<Activity> {
        self.activities
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Activity with ID '{}' not found", id)))
    }

    async fn find_class(&self, id: &Uuid) -> Result<Class> {
        self.classes
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Class with ID '{}' not found", id)))
    }

    /// Re-reads and rewrites the activity documents until the write lands on an unchanged row.
    ///
    /// `apply` returns false when it left the activity untouched, in which case nothing is written.
    async fn update_documents<F>(&self, id: &Uuid, mut apply: F) -> Result<bool>
    where
        F: FnMut(&mut Activity) -> Result<bool> + Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut activity = self.find_activity(id).await?;
            if !apply(&mut activity)? {
                return Ok(false);
            }
            if self.activities.store_documents(&activity).await? {
                return Ok(true);
            }
            debug!("Activity {} changed during update, attempt {}", id, attempt);
        }

        warn!("Giving up on activity {} after {} attempts", id, MAX_WRITE_ATTEMPTS);
        Err(ServiceError::Conflict(
            "Activity is being modified, please try again".to_string(),
        ))
    }

    /// Loads the activity's class and checks the caller may manage it
    async fn authorize_manager(&self, id: &Uuid, caller: &Claims) -> Result<Activity> {
        let activity = self.find_activity(id).await?;
        let class = self.find_class(&activity.class_id).await?;
        ensure_manager(&class, caller)?;
        Ok(activity)
    }
}

#[async_trait]
impl<A, C> ActivityServiceTrait for ActivityService<A, C>
where
    A: ActivityRepositoryTrait + Send + Sync,
    C: ClassRepositoryTrait + Send + Sync,
{
    async fn list(&self, params: &ActivityQueryParams, caller: &Claims) -> Result<Vec<Activity>> {
        let activities = self.activities.find(params).await?;
        if caller.role == Role::Admin {
            return Ok(activities);
        }

        // One class lookup per distinct class
        let mut managed: HashMap<Uuid, bool> = HashMap::new();
        for activity in &activities {
            if !managed.contains_key(&activity.class_id) {
                let allowed = self
                    .classes
                    .find_by_id(&activity.class_id)
                    .await?
                    .map(|class| can_manage(&class, caller))
                    .unwrap_or(false);
                managed.insert(activity.class_id, allowed);
            }
        }

        let viewer = caller.id.to_string();
        Ok(activities
            .into_iter()
            .map(|activity| match managed.get(&activity.class_id) {
                Some(true) => activity,
                _ => activity.visible_to(&viewer),
            })
            .collect())
    }

    async fn get(&self, id: &Uuid, caller: &Claims) -> Result<Activity> {
        let activity = self.find_activity(id).await?;
        let class = self.find_class(&activity.class_id).await?;

        if can_manage(&class, caller) {
            Ok(activity)
        } else {
            Ok(activity.visible_to(&caller.id.to_string()))
        }
    }

    async fn create(&self, dto: ActivityDto, caller: &Claims) -> Result<Activity> {
        let class = self.find_class(&dto.class_id).await?;
        ensure_manager(&class, caller)?;

        let activity = self.activities.save(&NewActivity::from(dto)).await?;
        info!("Created activity {} for class {}", activity.id, class.id);
        Ok(activity)
    }

    async fn replace(&self, id: &Uuid, dto: ActivityDto, caller: &Claims) -> Result<()> {
        let current = self.authorize_manager(id, caller).await?;
        if dto.class_id != current.class_id {
            return Err(ServiceError::Validation(
                "An activity cannot be moved to another class".to_string(),
            ));
        }

        match self.activities.replace(id, &NewActivity::from(dto)).await? {
            0 => Err(ServiceError::NotFound(format!("Activity with ID '{}' not found", id))),
            _ => Ok(()),
        }
    }

    async fn patch(&self, id: &Uuid, patch: ActivityPatch, caller: &Claims) -> Result<()> {
        patch.validate()?;
        self.authorize_manager(id, caller).await?;

        match self.activities.patch(id, &patch).await? {
            0 => Err(ServiceError::NotFound(format!("Activity with ID '{}' not found", id))),
            _ => Ok(()),
        }
    }

    async fn finish(&self, id: &Uuid, caller: &Claims) -> Result<()> {
        let patch = ActivityPatch {
            present_enable: Some(false),
            ..Default::default()
        };
        self.patch(id, patch, caller).await?;
        info!("Closed attendance for activity {}", id);
        Ok(())
    }

    async fn replace_student_exercises(
        &self,
        id: &Uuid,
        student_id: &str,
        exercises: Vec<ExerciseAnswer>,
        caller: &Claims,
    ) -> Result<()> {
        if !is_caller(student_id, caller) {
            let activity = self.find_activity(id).await?;
            let class = self.find_class(&activity.class_id).await?;
            ensure_manager(&class, caller)?;
        }
        let student_id = record_id(student_id, caller);

        self.update_documents(id, |activity| {
            if activity.replace_student_exercises(&student_id, exercises.clone()) {
                Ok(true)
            } else {
                Err(student_not_found(&student_id))
            }
        })
        .await?;
        Ok(())
    }

    async fn mark_present(&self, dto: MarkPresentDto, caller: &Claims) -> Result<bool> {
        dto.validate()?;
        let student_id = record_id(&dto.student_id, caller);

        if !is_caller(&student_id, caller) {
            let activity = self.find_activity(&dto.class_id).await?;
            let class = self.find_class(&activity.class_id).await?;
            if !can_manage(&class, caller) {
                return Err(ServiceError::Forbidden(
                    "You can only mark your own attendance".to_string(),
                ));
            }
        }

        let marked = self
            .update_documents(&dto.class_id, |activity| {
                if !activity.present_enable {
                    return Err(ServiceError::Forbidden(
                        "Attendance is not enabled for this activity".to_string(),
                    ));
                }
                Ok(activity.mark_present(&student_id))
            })
            .await?;

        if marked {
            info!("Marked student {} present on activity {}", student_id, dto.class_id);
        }
        Ok(marked)
    }

    async fn attach_class_exercise(&self, id: &Uuid, exercise: ClassExercise, caller: &Claims) -> Result<()> {
        self.authorize_manager(id, caller).await?;

        self.update_documents(id, |activity| {
            activity.class_exercises.push(exercise.clone());
            Ok(true)
        })
        .await?;
        Ok(())
    }

    async fn attach_student_answer(
        &self,
        id: &Uuid,
        student_id: &str,
        answer: ExerciseAnswer,
        caller: &Claims,
    ) -> Result<()> {
        if !is_caller(student_id, caller) {
            return Err(ServiceError::Forbidden(
                "You can only upload your own exercises".to_string(),
            ));
        }

        let student_id = record_id(student_id, caller);

        self.update_documents(id, |activity| {
            if activity.push_student_exercise(&student_id, answer.clone()) {
                Ok(true)
            } else {
                Err(student_not_found(&student_id))
            }
        })
        .await?;
        Ok(())
    }
}
