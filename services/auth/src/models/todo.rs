//! Todo model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Priority levels for todos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "priority_level", rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Todo entity, always owned by exactly one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: NaiveDate,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client payload for a new todo
#[derive(Debug, Clone, Deserialize)]
pub struct TodoCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub due_date: NaiveDate,
}

/// Validated todo ready for insertion
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_payload_accepts_missing_optionals() {
        let payload: TodoCreate =
            serde_json::from_str(r#"{"title": "Buy milk", "due_date": "2024-12-31"}"#).unwrap();

        assert_eq!(payload.title, "Buy milk");
        assert!(payload.description.is_none());
        assert!(payload.priority.is_none());
        assert_eq!(payload.due_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_priority_is_lowercase_on_the_wire() {
        let payload: TodoCreate = serde_json::from_str(
            r#"{"title": "t", "priority": "high", "due_date": "2024-01-01"}"#,
        )
        .unwrap();
        assert_eq!(payload.priority, Some(Priority::High));

        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), r#""medium""#);
        assert!(
            serde_json::from_str::<TodoCreate>(
                r#"{"title": "t", "priority": "urgent", "due_date": "2024-01-01"}"#
            )
            .is_err()
        );
    }
}
