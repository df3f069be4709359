//! In-process storage for users, reset tokens and todos
//!
//! All tables sit behind one lock, which makes `redeem` atomic the same way a
//! database transaction would. Used by the test suite and when the service
//! runs with `STORAGE_BACKEND=memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ResetTokenStore, TodoStore, UserStore};
use crate::models::{NewResetToken, NewTodo, NewUser, ResetToken, Todo, User};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    reset_tokens: HashMap<Uuid, ResetToken>,
    todos: HashMap<Uuid, Todo>,
}

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|user| user.username == new_user.username)
        {
            return Err(DatabaseError::Conflict("users_username_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DatabaseResult<bool> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ResetTokenStore for MemoryStore {
    async fn insert(&self, new_token: &NewResetToken) -> DatabaseResult<ResetToken> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&new_token.user_id) {
            return Err(DatabaseError::Conflict(
                "password_reset_tokens_user_id_fkey".to_string(),
            ));
        }
        if state
            .reset_tokens
            .values()
            .any(|existing| existing.token == new_token.token)
        {
            return Err(DatabaseError::Conflict(
                "password_reset_tokens_token_key".to_string(),
            ));
        }

        let token = ResetToken {
            id: Uuid::new_v4(),
            user_id: new_token.user_id,
            token: new_token.token.clone(),
            expires_at: new_token.expires_at,
            used: false,
            created_at: Utc::now(),
        };
        state.reset_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<ResetToken>> {
        let state = self.state.lock().await;
        Ok(state
            .reset_tokens
            .values()
            .find(|existing| existing.token == token)
            .cloned())
    }

    async fn redeem(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Uuid>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(record) = state
            .reset_tokens
            .values_mut()
            .find(|existing| existing.token == token && existing.is_usable(now))
        else {
            return Ok(None);
        };

        let Some(user) = state.users.get_mut(&record.user_id) else {
            return Ok(None);
        };

        record.used = true;
        user.password_hash = password_hash.to_string();
        user.updated_at = now;
        Ok(Some(user.id))
    }

    async fn mark_all_used(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for token in state.reset_tokens.values_mut() {
            if token.user_id == user_id && !token.used {
                token.used = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn list_all(&self) -> DatabaseResult<Vec<ResetToken>> {
        let state = self.state.lock().await;
        Ok(state.reset_tokens.values().cloned().collect())
    }

    async fn delete(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let mut state = self.state.lock().await;
        let removed = ids
            .iter()
            .filter(|id| state.reset_tokens.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn create(&self, new_todo: &NewTodo) -> DatabaseResult<Todo> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&new_todo.user_id) {
            return Err(DatabaseError::Conflict("todos_user_id_fkey".to_string()));
        }

        let now = Utc::now();
        let todo = Todo {
            id: Uuid::new_v4(),
            user_id: new_todo.user_id,
            title: new_todo.title.clone(),
            description: new_todo.description.clone(),
            priority: new_todo.priority,
            due_date: new_todo.due_date,
            is_completed: false,
            created_at: now,
            updated_at: now,
        };
        state.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Todo>> {
        let state = self.state.lock().await;
        Ok(state
            .todos
            .get(&id)
            .filter(|todo| todo.user_id == user_id)
            .cloned())
    }
}
