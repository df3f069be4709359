//! Todo repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::TodoStore;
use crate::models::{NewTodo, Todo};

/// PostgreSQL-backed todo repository
#[derive(Clone)]
pub struct TodoRepository {
    pool: PgPool,
}

impl TodoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TodoStore for TodoRepository {
    async fn create(&self, new_todo: &NewTodo) -> DatabaseResult<Todo> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, user_id, title, description, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, description, priority, due_date,
                      is_completed, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_todo.user_id)
        .bind(&new_todo.title)
        .bind(&new_todo.description)
        .bind(new_todo.priority)
        .bind(new_todo.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        info!("Created todo {} for user {}", todo.id, todo.user_id);
        Ok(todo)
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Todo>> {
        debug!("Finding todo {} for user {}", id, user_id);

        sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, description, priority, due_date,
                   is_completed, created_at, updated_at
            FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)
    }
}
