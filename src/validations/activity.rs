use validator::ValidationError;

use crate::models::ActivityPatch;

pub fn validate_activity_patch(patch: &ActivityPatch) -> Result<(), ValidationError> {
    if patch.is_empty() {
        let mut err = ValidationError::new("empty_patch");
        err.message = Some("At least one field must be provided".into());
        return Err(err);
    }

    Ok(())
}
