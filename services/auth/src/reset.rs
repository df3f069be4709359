//! Password reset tokens
//!
//! Reset tokens are random, single-use and short-lived. Every negative outcome
//! (unknown, used, expired) is reported the same way so callers cannot tell
//! them apart.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    hashing::CredentialHasher,
    models::{NewResetToken, ResetToken, User},
    repositories::{ResetTokenStore, UserStore},
};

/// Bytes of entropy per reset token
pub const RESET_TOKEN_BYTES: usize = 32;

/// Answer to every reset request, whether or not the username exists
pub const RESET_REQUESTED_MESSAGE: &str =
    "If the username exists, a password reset link has been sent.";

/// Generate a URL-safe reset token (43 characters of base64url)
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Delivery channel for reset links
pub trait ResetNotifier: Send + Sync {
    fn deliver(&self, user: &User, reset: &ResetToken, link: &str);
}

/// Development notifier: writes the link to the log at debug level
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl ResetNotifier for LogNotifier {
    fn deliver(&self, user: &User, reset: &ResetToken, link: &str) {
        info!(
            "Password reset requested for user {} (expires {})",
            user.id, reset.expires_at
        );
        debug!("Password reset link for {}: {}", user.username, link);
    }
}

/// Persisted, single-use password reset tokens
#[derive(Clone)]
pub struct ResetTokenLedger {
    tokens: Arc<dyn ResetTokenStore>,
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    notifier: Arc<dyn ResetNotifier>,
    ttl: Duration,
    /// Base URL reset links point at
    link_base: String,
}

impl ResetTokenLedger {
    pub fn new(
        tokens: Arc<dyn ResetTokenStore>,
        users: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        notifier: Arc<dyn ResetNotifier>,
        ttl: Duration,
        link_base: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            users,
            hasher,
            notifier,
            ttl,
            link_base: link_base.into(),
        }
    }

    /// Persist a new token for `user` with the configured lifetime
    ///
    /// Earlier outstanding tokens of the same user stay valid.
    pub async fn create(&self, user: &User) -> AuthResult<ResetToken> {
        self.create_with_ttl(user, self.ttl).await
    }

    pub async fn create_with_ttl(&self, user: &User, ttl: Duration) -> AuthResult<ResetToken> {
        let new_token = NewResetToken {
            user_id: user.id,
            token: generate_reset_token(),
            expires_at: Utc::now() + ttl,
        };

        let token = self.tokens.insert(&new_token).await?;
        info!("Created password reset token {} for user {}", token.id, user.id);
        Ok(token)
    }

    pub async fn lookup(&self, token: &str) -> AuthResult<Option<ResetToken>> {
        Ok(self.tokens.find_by_token(token).await?)
    }

    /// Resolve a token to its owner while it is inside its single valid window
    pub async fn validate(&self, token: &str) -> AuthResult<User> {
        let record = self
            .lookup(token)
            .await?
            .ok_or(AuthError::ResetTokenInvalid)?;

        if !record.is_usable(Utc::now()) {
            return Err(AuthError::ResetTokenInvalid);
        }

        self.users
            .find_by_id(record.user_id)
            .await?
            .ok_or(AuthError::ResetTokenInvalid)
    }

    /// Spend a token to set a new password
    ///
    /// Returns `Ok(false)`, with nothing changed, when the token is not usable
    /// or another request spent it first. Do not retry a `false`; only retry an
    /// `Err` whose storage failure is connection-level.
    pub async fn consume(&self, token: &str, new_password: &str) -> AuthResult<bool> {
        Ok(self.consume_for(token, new_password).await?.is_some())
    }

    async fn consume_for(&self, token: &str, new_password: &str) -> AuthResult<Option<Uuid>> {
        match self.validate(token).await {
            Ok(_) => {}
            Err(AuthError::ResetTokenInvalid) => return Ok(None),
            Err(e) => return Err(e),
        }

        let password_hash = self.hasher.hash_async(new_password.to_string()).await?;

        Ok(self
            .tokens
            .redeem(token, &password_hash, Utc::now())
            .await?)
    }

    /// Mark every unused token of a user as used
    pub async fn invalidate_all(&self, user_id: Uuid) -> AuthResult<u64> {
        let count = self.tokens.mark_all_used(user_id).await?;
        if count > 0 {
            info!("Invalidated {} reset tokens for user {}", count, user_id);
        }
        Ok(count)
    }

    /// Delete every token past its expiry, used or not
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let expired: Vec<Uuid> = self
            .tokens
            .list_all()
            .await?
            .into_iter()
            .filter(|token| token.is_expired(now))
            .map(|token| token.id)
            .collect();

        let deleted = self.tokens.delete(&expired).await?;
        if deleted > 0 {
            info!("Purged {} expired reset tokens", deleted);
        }
        Ok(deleted)
    }

    /// Handle a reset request for a username
    ///
    /// Only an existing, active user gets a token and a link; the caller answers
    /// with [`RESET_REQUESTED_MESSAGE`] in every case.
    pub async fn request_reset(&self, username: &str) -> AuthResult<()> {
        let user = match self.users.find_by_username(username).await? {
            Some(user) if user.is_active => user,
            _ => {
                debug!("Reset requested for an unknown or inactive account");
                return Ok(());
            }
        };

        let reset = self.create(&user).await?;
        let link = format!("{}/reset-password?token={}", self.link_base, reset.token);
        self.notifier.deliver(&user, &reset, &link);
        Ok(())
    }

    /// Set a new password from a reset token and retire the user's other tokens
    ///
    /// Once the password change is committed the call succeeds; failing to
    /// retire the sibling tokens is only logged.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        let user_id = self
            .consume_for(token, new_password)
            .await?
            .ok_or(AuthError::ResetTokenInvalid)?;

        if let Err(e) = self.invalidate_all(user_id).await {
            warn!(
                "Password reset for user {} succeeded but other reset tokens were not invalidated: {}",
                user_id, e
            );
        }
        Ok(())
    }
}
