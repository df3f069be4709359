//! Todo creation and lookup for the signed-in user

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::{NewTodo, Todo, TodoCreate, User},
    repositories::TodoStore,
    validation::validate_todo_title,
};

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    /// Create a todo owned by `owner`
    ///
    /// The title is trimmed; a blank description is stored as none.
    pub async fn create(&self, owner: &User, payload: TodoCreate) -> AuthResult<Todo> {
        let title = validate_todo_title(&payload.title).map_err(AuthError::Validation)?;
        let description = payload
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let new_todo = NewTodo {
            user_id: owner.id,
            title,
            description,
            priority: payload.priority,
            due_date: payload.due_date,
        };

        let todo = self.store.create(&new_todo).await?;
        info!("User {} created todo {}", owner.id, todo.id);
        Ok(todo)
    }

    /// Fetch one of `owner`'s todos; other users' todos look absent
    pub async fn get(&self, owner: &User, id: Uuid) -> AuthResult<Todo> {
        self.store
            .find_for_user(id, owner.id)
            .await?
            .ok_or(AuthError::TodoNotFound)
    }
}
