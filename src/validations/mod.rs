mod activity;
mod class;
mod common;

pub use activity::validate_activity_patch;
pub use class::validate_class_dates;
pub use common::{sanitize_file_name, validate_not_blank};
