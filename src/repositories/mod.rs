mod activity;
mod class;
mod user;

pub use activity::{ActivityRepository, ActivityRepositoryTrait};
pub use class::{ClassRepository, ClassRepositoryTrait};
pub use user::{UserRepository, UserRepositoryTrait};

#[cfg(test)]
pub use activity::MockActivityRepositoryTrait;
#[cfg(test)]
pub use class::MockClassRepositoryTrait;
#[cfg(test)]
pub use user::MockUserRepositoryTrait;
