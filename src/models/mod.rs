pub mod patch;
pub mod task;
pub mod user;

pub use patch::{ensure_allowed_updates, parse_patch};
pub use task::{Task, TaskInput, TaskPatch, TASK_UPDATABLE_FIELDS};
pub use user::{
    NewUserRecord, RegisterRequest, User, UserChanges, UserPatch, USER_UPDATABLE_FIELDS,
};
