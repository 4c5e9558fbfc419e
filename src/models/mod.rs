mod activity;
mod class;
mod user;

pub use activity::{
    Activity, ActivityDto, ActivityPatch, ActivityQueryParams, ClassExercise, ExerciseAnswer,
    MarkPresentDto, NewActivity, StudentExercisesDto, StudentRecord,
};
pub use class::{Class, ClassDto, Schedule};
pub use user::{
    CreateUserDto, LoginDto, NewUser, RegisterUserDto, Role, UpdateUserDto, User,
    UserProfileDto, DEFAULT_PROFILE_IMAGE, DEFAULT_USERTYPE,
};
