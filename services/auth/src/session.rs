//! Session issuance, validation and revocation

use std::sync::Arc;

use common::error::DatabaseError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    hashing::CredentialHasher,
    jwt::TokenCodec,
    models::{NewUser, User},
    repositories::UserStore,
    revocation::RevocationRegistry,
};

/// Issues and checks bearer sessions
///
/// A token is `VALID` while its signature verifies, it is unexpired and it is
/// not in the revocation registry. It ends either `REVOKED` (logout, refresh)
/// or `EXPIRED`; neither state is stored, both are computed on every check.
#[derive(Clone)]
pub struct SessionAuthority {
    users: Arc<dyn UserStore>,
    codec: TokenCodec,
    registry: RevocationRegistry,
    hasher: CredentialHasher,
}

impl SessionAuthority {
    pub fn new(
        users: Arc<dyn UserStore>,
        codec: TokenCodec,
        registry: RevocationRegistry,
        hasher: CredentialHasher,
    ) -> Self {
        Self {
            users,
            codec,
            registry,
            hasher,
        }
    }

    pub fn registry(&self) -> &RevocationRegistry {
        &self.registry
    }

    /// Create an account with a freshly hashed password
    pub async fn register(&self, username: &str, password: &str) -> AuthResult<User> {
        let password_hash = self.hasher.hash_async(password.to_string()).await?;

        let new_user = NewUser {
            username: username.to_string(),
            password_hash,
        };

        match self.users.create(&new_user).await {
            Ok(user) => {
                info!("Registered user {}", user.id);
                Ok(user)
            }
            Err(DatabaseError::Conflict(_)) => Err(AuthError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Check a username/password pair
    ///
    /// Unknown user, inactive account and wrong password all yield
    /// `InvalidCredentials`, and each of them runs exactly one hash verification.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<User> {
        let user = self.users.find_by_username(username).await?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let password_matches = self
            .hasher
            .verify_async(password.to_string(), stored_hash)
            .await;

        match user {
            Some(user) if user.is_active && password_matches => Ok(user),
            _ => {
                info!("Rejected login attempt for user: {}", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Mint a session token with the configured lifetime
    pub fn issue(&self, user: &User) -> AuthResult<String> {
        self.codec.mint(user.id, &user.username, self.codec.ttl())
    }

    /// Authenticate and issue in one step
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<(User, String)> {
        let user = self.authenticate(username, password).await?;
        let token = self.issue(&user)?;
        info!("User {} logged in", user.id);
        Ok((user, token))
    }

    /// Resolve a presented token to its user
    ///
    /// Checks run in order and stop at the first failure: revocation, then
    /// signature and expiry, then subject lookup, then the active flag.
    pub async fn validate(&self, token: &str) -> AuthResult<User> {
        if self.registry.contains(token).await {
            return Err(AuthError::TokenRevoked);
        }

        let claims = self
            .codec
            .verify_and_decode(token)
            .ok_or(AuthError::TokenInvalidOrExpired)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::SubjectNotFound)?;

        if !user.is_active {
            return Err(AuthError::SubjectInactive);
        }

        Ok(user)
    }

    /// Revoke `old_token`, then issue a new token for `user`
    pub async fn refresh(&self, old_token: &str, user: &User) -> AuthResult<String> {
        self.revoke(old_token).await;
        self.issue(user)
    }

    /// Put a token in the revocation registry until its natural expiry
    ///
    /// A token whose expiry cannot be decoded could never validate, so it is
    /// left alone.
    pub async fn revoke(&self, token: &str) {
        match self.codec.expiry_of(token) {
            Some(expires_at) => {
                self.registry.add(token, expires_at).await;
                info!("Revoked session token expiring at {}", expires_at);
            }
            None => warn!("Ignoring revocation of an undecodable token"),
        }
    }

    /// Soft-delete an account; its tokens stop validating immediately
    pub async fn deactivate(&self, user_id: Uuid) -> AuthResult<()> {
        if !self.users.set_active(user_id, false).await? {
            return Err(AuthError::SubjectNotFound);
        }
        info!("Deactivated user {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hashing::Argon2Params, repositories::MemoryStore};
    use chrono::Duration;
    use jsonwebtoken::Algorithm;

    fn authority(store: &MemoryStore) -> SessionAuthority {
        let hasher = CredentialHasher::new(Argon2Params {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let codec = TokenCodec::new(b"unit-test-secret", Algorithm::HS256, Duration::hours(24));
        SessionAuthority::new(
            Arc::new(store.clone()),
            codec,
            RevocationRegistry::new(),
            hasher,
        )
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        let user = sessions.register("alice", "Password123").await.unwrap();
        assert_ne!(user.password_hash, "Password123");

        let (logged_in, token) = sessions.login("alice", "Password123").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(sessions.validate(&token).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        sessions.register("alice", "Password123").await.unwrap();
        let result = sessions.register("alice", "Password456").await;
        assert!(matches!(result, Err(AuthError::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_authentication_failures_are_uniform() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        let inactive = sessions.register("bob", "Password123").await.unwrap();
        sessions.register("carol", "Password123").await.unwrap();
        sessions.deactivate(inactive.id).await.unwrap();

        let unknown = sessions.authenticate("nobody", "Password123").await;
        let wrong = sessions.authenticate("carol", "Wrong-pass1").await;
        let disabled = sessions.authenticate("bob", "Password123").await;

        for result in [unknown, wrong, disabled] {
            let err = result.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.to_string(), "Incorrect username or password");
        }
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected_first() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        let user = sessions.register("dave", "Password123").await.unwrap();
        let token = sessions.issue(&user).unwrap();

        sessions.revoke(&token).await;
        assert!(matches!(
            sessions.validate(&token).await,
            Err(AuthError::TokenRevoked)
        ));

        // Still revoked, not inactive, once the account is disabled too.
        sessions.deactivate(user.id).await.unwrap();
        assert!(matches!(
            sessions.validate(&token).await,
            Err(AuthError::TokenRevoked)
        ));
    }

    #[tokio::test]
    async fn test_validate_unknown_and_inactive_subjects() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        let ghost = User {
            id: Uuid::new_v4(),
            username: "ghost".to_string(),
            password_hash: String::new(),
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let token = sessions.issue(&ghost).unwrap();
        assert!(matches!(
            sessions.validate(&token).await,
            Err(AuthError::SubjectNotFound)
        ));

        let user = sessions.register("erin", "Password123").await.unwrap();
        let token = sessions.issue(&user).unwrap();
        sessions.deactivate(user.id).await.unwrap();
        assert!(matches!(
            sessions.validate(&token).await,
            Err(AuthError::SubjectInactive)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        let user = sessions.register("frank", "Password123").await.unwrap();
        let old = sessions.issue(&user).unwrap();
        let new = sessions.refresh(&old, &user).await.unwrap();

        assert_ne!(old, new);
        assert!(matches!(
            sessions.validate(&old).await,
            Err(AuthError::TokenRevoked)
        ));
        assert_eq!(sessions.validate(&new).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_revoking_garbage_is_a_no_op() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        sessions.revoke("not-a-token").await;
        assert_eq!(sessions.registry().size().await, 0);
        assert!(matches!(
            sessions.validate("not-a-token").await,
            Err(AuthError::TokenInvalidOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_deactivate_unknown_user() {
        let store = MemoryStore::new();
        let sessions = authority(&store);

        assert!(matches!(
            sessions.deactivate(Uuid::new_v4()).await,
            Err(AuthError::SubjectNotFound)
        ));
    }
}
