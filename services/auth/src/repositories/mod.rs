//! Storage collaborators for users, password reset tokens and todos

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewResetToken, NewTodo, NewUser, ResetToken, Todo, User};

pub mod memory;
pub mod reset_token;
pub mod todo;
pub mod user;

pub use memory::MemoryStore;
pub use reset_token::ResetTokenRepository;
pub use todo::TodoRepository;
pub use user::UserRepository;

/// Lookup and persistence of user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Insert a user; a taken username surfaces as `DatabaseError::Conflict`
    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Flip the active flag, returning whether the user existed
    async fn set_active(&self, id: Uuid, active: bool) -> DatabaseResult<bool>;
}

/// Persistence of password reset tokens
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert(&self, new_token: &NewResetToken) -> DatabaseResult<ResetToken>;

    /// Exact-match lookup by token string
    async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<ResetToken>>;

    /// Claim a token and write the owner's new password hash as one unit
    ///
    /// The claim only succeeds while the token is unused and `now < expires_at`;
    /// of several concurrent calls for the same token at most one gets the
    /// owner's id back, every other one gets `None` and changes nothing.
    async fn redeem(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Uuid>>;

    /// Mark every unused token of a user as used, returning how many changed
    async fn mark_all_used(&self, user_id: Uuid) -> DatabaseResult<u64>;

    async fn list_all(&self) -> DatabaseResult<Vec<ResetToken>>;

    async fn delete(&self, ids: &[Uuid]) -> DatabaseResult<u64>;
}

/// Persistence of todos, always scoped to their owner
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Insert a todo; an unknown owner surfaces as `DatabaseError::Conflict`
    async fn create(&self, new_todo: &NewTodo) -> DatabaseResult<Todo>;

    /// Fetch a todo only if it belongs to `user_id`
    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Todo>>;
}
