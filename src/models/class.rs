use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validations::{validate_class_dates, validate_not_blank};

/// Weekly timetable; `day1` is Monday and `day7` is Sunday
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day7: Option<String>,
}

impl Schedule {
    /// Start time scheduled for the given weekday, blank entries count as unscheduled
    pub fn time_for(&self, weekday: Weekday) -> Option<&str> {
        let slot = match weekday {
            Weekday::Mon => &self.day1,
            Weekday::Tue => &self.day2,
            Weekday::Wed => &self.day3,
            Weekday::Thu => &self.day4,
            Weekday::Fri => &self.day5,
            Weekday::Sat => &self.day6,
            Weekday::Sun => &self.day7,
        };
        slot.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .all(|day| self.time_for(day).is_none())
    }
}

/// A course with its roster and timetable
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "classID")]
    pub class_code: String,
    /// User id of the professor running the class
    pub professor: String,
    pub admins: Vec<String>,
    pub students: Vec<String>,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[sqlx(json)]
    pub schedule: Schedule,
    pub exam_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Class {
    pub fn is_professor(&self, user_id: &Uuid) -> bool {
        self.professor == user_id.to_string()
    }
}

// Payload for creating or replacing a class; the timetable arrives as flat day1..day7 fields
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_class_dates"))]
pub struct ClassDto {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,

    #[serde(rename = "classID")]
    #[validate(custom(function = "validate_not_blank"))]
    pub class_code: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub professor: String,

    pub admins: Vec<String>,

    pub students: Vec<String>,

    pub is_active: bool,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    pub exam_date: NaiveDate,

    #[serde(flatten)]
    pub schedule: Schedule,
}
