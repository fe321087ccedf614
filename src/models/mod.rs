pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskQuery, TaskStatus, TaskUpdate, TaskWithUsers};
pub use user::{NewUser, User, UserQuery, UserUpdate, UserWithTasks};
