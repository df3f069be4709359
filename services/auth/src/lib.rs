//! Authentication and session service for the todo backend
//!
//! Accounts, bearer sessions with revocation, single-use password reset
//! tokens and per-user todos, served over HTTP with axum.

pub mod config;
pub mod error;
pub mod hashing;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod reset;
pub mod revocation;
pub mod routes;
pub mod session;
pub mod sweeper;
pub mod todos;
pub mod validation;

use std::sync::Arc;

use crate::{
    config::AuthConfig,
    hashing::CredentialHasher,
    jwt::TokenCodec,
    repositories::{ResetTokenStore, TodoStore, UserStore},
    reset::{ResetNotifier, ResetTokenLedger},
    revocation::RevocationRegistry,
    session::SessionAuthority,
    todos::TodoService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionAuthority,
    pub resets: ResetTokenLedger,
    pub todos: TodoService,
}

impl AppState {
    /// Wire the session authority, reset ledger and todo service over the given stores
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn ResetTokenStore>,
        todos: Arc<dyn TodoStore>,
        hasher: CredentialHasher,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let sessions = SessionAuthority::new(
            users.clone(),
            TokenCodec::from_config(config),
            RevocationRegistry::new(),
            hasher.clone(),
        );
        let resets = ResetTokenLedger::new(
            tokens,
            users,
            hasher,
            notifier,
            config.reset_token_ttl(),
            config.frontend_url.clone(),
        );

        Self {
            sessions,
            resets,
            todos: TodoService::new(todos),
        }
    }
}
