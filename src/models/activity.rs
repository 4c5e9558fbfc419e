use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validations::{validate_activity_patch, validate_not_blank};

/// Exercise handed out to the whole class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassExercise {
    #[serde(rename = "exerciseID")]
    pub exercise_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "attachedFilesUrl", default, skip_serializing_if = "Option::is_none")]
    pub attached_files_url: Option<String>,
}

/// A student's answer to an exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAnswer {
    #[serde(rename = "exerciseID")]
    pub exercise_id: String,
    pub answer: String,
    #[serde(rename = "attachedFilesUrl", default, skip_serializing_if = "Option::is_none")]
    pub attached_files_url: Option<String>,
}

/// Per-student record kept on an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student_id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub present: bool,
    #[serde(default)]
    pub exercises: Vec<ExerciseAnswer>,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            score: 0.0,
            comment: String::new(),
            present: false,
            exercises: Vec::new(),
        }
    }
}

/// One scheduled meeting of a class
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub class_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub present_enable: bool,
    pub alert: Option<String>,
    pub note: Option<String>,
    #[sqlx(json)]
    pub class_exercises: Vec<ClassExercise>,
    #[sqlx(json)]
    pub students: Vec<StudentRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn student(&self, student_id: &str) -> Option<&StudentRecord> {
        self.students.iter().find(|s| s.student_id == student_id)
    }

    fn student_mut(&mut self, student_id: &str) -> Option<&mut StudentRecord> {
        self.students.iter_mut().find(|s| s.student_id == student_id)
    }

    /// Marks the student present, enrolling them first if needed.
    /// Returns false when the student was already marked.
    pub fn mark_present(&mut self, student_id: &str) -> bool {
        if self.student(student_id).is_none() {
            self.students.push(StudentRecord::new(student_id));
        }
        match self.student_mut(student_id) {
            Some(record) if !record.present => {
                record.present = true;
                true
            }
            _ => false,
        }
    }

    /// Appends an answer to the student's exercises; false if the student is not on the activity
    pub fn push_student_exercise(&mut self, student_id: &str, answer: ExerciseAnswer) -> bool {
        match self.student_mut(student_id) {
            Some(record) => {
                record.exercises.push(answer);
                true
            }
            None => false,
        }
    }

    /// Replaces the student's answers; false if the student is not on the activity
    pub fn replace_student_exercises(&mut self, student_id: &str, answers: Vec<ExerciseAnswer>) -> bool {
        match self.student_mut(student_id) {
            Some(record) => {
                record.exercises = answers;
                true
            }
            None => false,
        }
    }

    /// Copy of the activity showing only the viewer's own student record
    pub fn visible_to(mut self, viewer_id: &str) -> Self {
        self.students.retain(|s| s.student_id == viewer_id);
        self
    }
}

/// Row to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub class_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub present_enable: bool,
    pub alert: Option<String>,
    pub note: Option<String>,
    pub class_exercises: Vec<ClassExercise>,
    pub students: Vec<StudentRecord>,
}

impl NewActivity {
    /// Empty meeting with attendance closed
    pub fn scheduled(class_id: Uuid, date: NaiveDate, time: impl Into<String>) -> Self {
        Self {
            class_id,
            date,
            time: time.into(),
            present_enable: false,
            alert: None,
            note: None,
            class_exercises: Vec::new(),
            students: Vec::new(),
        }
    }
}

// Payload for creating or replacing an activity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    #[serde(alias = "classID")]
    pub class_id: Uuid,

    pub date: NaiveDate,

    #[serde(default)]
    pub time: String,

    pub students: Vec<StudentRecord>,

    #[serde(default)]
    pub alert: Option<String>,

    #[serde(default)]
    pub note: Option<String>,

    pub present_enable: bool,

    #[serde(default)]
    pub class_exercises: Vec<ClassExercise>,
}

impl From<ActivityDto> for NewActivity {
    fn from(dto: ActivityDto) -> Self {
        NewActivity {
            class_id: dto.class_id,
            date: dto.date,
            time: dto.time,
            present_enable: dto.present_enable,
            alert: dto.alert,
            note: dto.note,
            class_exercises: dto.class_exercises,
            students: dto.students,
        }
    }
}

/// Partial update sent by the activity admin screen
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_activity_patch"))]
pub struct ActivityPatch {
    pub present_enable: Option<bool>,
    pub alert: Option<String>,
    pub note: Option<String>,
    pub class_exercises: Option<Vec<ClassExercise>>,
    pub students: Option<Vec<StudentRecord>>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.present_enable.is_none()
            && self.alert.is_none()
            && self.note.is_none()
            && self.class_exercises.is_none()
            && self.students.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQueryParams {
    #[serde(alias = "classID")]
    pub class_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkPresentDto {
    /// Id of the activity being attended
    pub class_id: Uuid,

    #[validate(custom(function = "validate_not_blank"))]
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StudentExercisesDto {
    pub exercises: Vec<ExerciseAnswer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity() -> Activity {
        Activity {
            id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            time: "10:00".into(),
            present_enable: true,
            alert: None,
            note: None,
            class_exercises: Vec::new(),
            students: vec![StudentRecord::new("s1")],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_mark_present_enrolls_missing_student() {
        let mut activity = activity();
        assert!(activity.mark_present("s2"));
        let record = activity.student("s2").unwrap();
        assert!(record.present);
        assert_eq!(record.score, 0.0);
        assert_eq!(activity.students.len(), 2);
    }

    #[test]
    fn test_mark_present_is_idempotent() {
        let mut activity = activity();
        assert!(activity.mark_present("s1"));
        assert!(!activity.mark_present("s1"));
        assert_eq!(activity.students.len(), 1);
    }

    #[test]
    fn test_exercise_answers_need_enrolled_student() {
        let mut activity = activity();
        let answer = ExerciseAnswer {
            exercise_id: "e1".into(),
            answer: "42".into(),
            attached_files_url: None,
        };
        assert!(!activity.push_student_exercise("ghost", answer.clone()));
        assert!(activity.push_student_exercise("s1", answer));
        assert_eq!(activity.student("s1").unwrap().exercises.len(), 1);
        assert!(activity.replace_student_exercises("s1", Vec::new()));
        assert!(activity.student("s1").unwrap().exercises.is_empty());
    }

    #[test]
    fn test_visible_to_keeps_only_own_record() {
        let mut activity = activity();
        activity.students.push(StudentRecord::new("s2"));
        let view = activity.visible_to("s2");
        assert_eq!(view.students.len(), 1);
        assert_eq!(view.students[0].student_id, "s2");
    }

    #[test]
    fn test_student_record_defaults() {
        let record: StudentRecord = serde_json::from_value(serde_json::json!({
            "studentId": "s9"
        }))
        .unwrap();
        assert_eq!(record, StudentRecord::new("s9"));
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        assert!(ActivityPatch::default().validate().is_err());
        let patch = ActivityPatch {
            note: Some("Bring laptops".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
    }
}
