//! Authentication service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    middleware::CurrentSession,
    models::{LoginCredentials, Todo, TodoCreate, UserProfile},
    reset::RESET_REQUESTED_MESSAGE,
    validation::{validate_password, validate_username},
};

/// Request for account registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Response for login and refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

/// Plain message body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/request-password-reset", post(request_password_reset))
        .route("/reset-password", post(reset_password));

    let users = Router::new().route("/me", get(get_me).delete(delete_me));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth)
        .nest("/api/v1/users", users)
        .route("/api/v1/todos", post(create_todo))
        .route("/api/v1/todos/:id", get(get_todo))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    validate_username(&payload.username).map_err(AuthError::Validation)?;
    validate_password(&payload.password).map_err(AuthError::Validation)?;

    let user = state
        .sessions
        .register(&payload.username, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> AuthResult<Json<TokenResponse>> {
    let (_, token) = state
        .sessions
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(TokenResponse::bearer(token)))
}

/// Exchange a valid token for a fresh one; the presented token is revoked
pub async fn refresh(
    State(state): State<AppState>,
    session: CurrentSession,
) -> AuthResult<Json<TokenResponse>> {
    let token = state.sessions.refresh(&session.token, &session.user).await?;
    info!("Refreshed session for user {}", session.user.id);

    Ok(Json(TokenResponse::bearer(token)))
}

/// Logout endpoint
pub async fn logout(State(state): State<AppState>, session: CurrentSession) -> StatusCode {
    state.sessions.revoke(&session.token).await;
    info!("User {} logged out", session.user.id);
    StatusCode::NO_CONTENT
}

/// Start a password reset; the answer never reveals whether the user exists
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> AuthResult<Json<MessageResponse>> {
    state.resets.request_reset(&payload.username).await?;

    Ok(Json(MessageResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
    }))
}

/// Finish a password reset with a token from the reset link
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> AuthResult<Json<MessageResponse>> {
    validate_password(&payload.new_password).map_err(AuthError::Validation)?;

    state
        .resets
        .reset_password(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset successfully".to_string(),
    }))
}

/// Current user's profile
pub async fn get_me(session: CurrentSession) -> Json<UserProfile> {
    Json(UserProfile::from(&session.user))
}

/// Soft-delete the current account and end this session
pub async fn delete_me(
    State(state): State<AppState>,
    session: CurrentSession,
) -> AuthResult<StatusCode> {
    let user_id = session.user.id;

    state.sessions.deactivate(user_id).await?;
    state.resets.invalidate_all(user_id).await?;
    state.sessions.revoke(&session.token).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Create a todo for the current user
pub async fn create_todo(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(payload): Json<TodoCreate>,
) -> AuthResult<impl IntoResponse> {
    let todo = state.todos.create(&session.user, payload).await?;

    Ok((StatusCode::CREATED, Json(todo)))
}

/// Get one of the current user's todos
pub async fn get_todo(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
) -> AuthResult<Json<Todo>> {
    Ok(Json(state.todos.get(&session.user, id).await?))
}
