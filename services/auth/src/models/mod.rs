//! Authentication service models

pub mod reset_token;
pub mod todo;
pub mod user;

// Re-export for convenience
pub use reset_token::{NewResetToken, ResetToken};
pub use todo::{NewTodo, Priority, Todo, TodoCreate};
pub use user::{LoginCredentials, NewUser, User, UserProfile};
