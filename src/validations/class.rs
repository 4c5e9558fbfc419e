use validator::ValidationError;

use crate::models::ClassDto;

/// Longest class, in days, that activities are generated for
pub const MAX_CLASS_SPAN_DAYS: i64 = 5 * 366;

/// A class must end on or after the day it starts, within `MAX_CLASS_SPAN_DAYS`
pub fn validate_class_dates(dto: &ClassDto) -> Result<(), ValidationError> {
    if dto.end_date < dto.start_date {
        let mut err = ValidationError::new("date_range");
        err.message = Some("End date must not be before start date".into());
        return Err(err);
    }

    if (dto.end_date - dto.start_date).num_days() > MAX_CLASS_SPAN_DAYS {
        let mut err = ValidationError::new("date_range");
        err.message = Some(format!("A class cannot run longer than {} days", MAX_CLASS_SPAN_DAYS).into());
        return Err(err);
    }

    Ok(())
}
