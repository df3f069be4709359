//! Session token codec
//!
//! Session tokens are compact JWTs signed with a process-wide HMAC secret.
//! They carry the subject id, a display name and a fixed expiry; nothing about
//! them is stored server-side except revocations.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AuthError, AuthResult},
};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Username at mint time; informational only
    pub username: String,
    /// Issued at time (UTC Unix timestamp)
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp)
    pub exp: i64,
    /// Unique token id, so two tokens minted in the same second still differ
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    /// Signature-only validation used to recover `exp` for bookkeeping
    signature_only: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Initialize a codec for an HMAC secret
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl: Duration) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let mut signature_only = validation.clone();
        signature_only.validate_exp = false;

        TokenCodec {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            validation,
            signature_only,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.secret_key.as_bytes(),
            config.algorithm,
            config.access_token_ttl(),
        )
    }

    /// Configured session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a fresh token for a subject, valid for `ttl`
    pub fn mint(&self, subject_id: Uuid, subject_name: &str, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: subject_id,
            username: subject_name.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Decode a token whose signature verifies and which has not yet expired
    ///
    /// Malformed, tampered and expired tokens all come back as `None`.
    pub fn verify_and_decode(&self, token: &str) -> Option<Claims> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Rejected session token: {}", e);
                return None;
            }
        };

        // Valid only while now < exp.
        if Utc::now().timestamp() >= claims.exp {
            return None;
        }

        Some(claims)
    }

    /// Recover the expiry of a correctly signed token, expired or not
    pub fn expiry_of(&self, token: &str) -> Option<DateTime<Utc>> {
        decode::<Claims>(token, &self.decoding_key, &self.signature_only)
            .ok()
            .and_then(|data| data.claims.expires_at())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            b"test-secret-that-is-long-enough-for-hmac",
            Algorithm::HS256,
            Duration::minutes(1440),
        )
    }

    fn sign_raw(codec: &TokenCodec, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &codec.encoding_key).unwrap()
    }

    #[test]
    fn test_mint_and_decode() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec.mint(user_id, "alice", codec.ttl()).unwrap();

        let claims = codec.verify_and_decode(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 1440 * 60);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_tokens_minted_back_to_back_differ() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let first = codec.mint(user_id, "alice", codec.ttl()).unwrap();
        let second = codec.mint(user_id, "alice", codec.ttl()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let token = sign_raw(
            &codec,
            &Claims {
                sub: Uuid::new_v4(),
                username: "bob".to_string(),
                iat: now - 600,
                exp: now - 300,
                jti: Uuid::new_v4().to_string(),
            },
        );

        assert!(codec.verify_and_decode(&token).is_none());
        // The expiry is still recoverable for revocation bookkeeping.
        assert_eq!(
            codec.expiry_of(&token).map(|t| t.timestamp()),
            Some(now - 300)
        );
    }

    #[test]
    fn test_token_expiring_now_is_invalid() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let token = sign_raw(
            &codec,
            &Claims {
                sub: Uuid::new_v4(),
                username: "bob".to_string(),
                iat: now - 60,
                exp: now,
                jti: Uuid::new_v4().to_string(),
            },
        );

        assert!(codec.verify_and_decode(&token).is_none());
    }

    #[test]
    fn test_different_secret_fails() {
        let codec_a = codec();
        let codec_b = TokenCodec::new(b"another-secret", Algorithm::HS256, Duration::hours(1));

        let token = codec_a.mint(Uuid::new_v4(), "carol", codec_a.ttl()).unwrap();
        assert!(codec_b.verify_and_decode(&token).is_none());
        assert!(codec_b.expiry_of(&token).is_none());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let codec = codec();
        let genuine = codec.mint(Uuid::new_v4(), "dave", codec.ttl()).unwrap();
        let other = codec.mint(Uuid::new_v4(), "mallory", codec.ttl()).unwrap();

        let genuine_parts: Vec<&str> = genuine.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!(
            "{}.{}.{}",
            genuine_parts[0], other_parts[1], genuine_parts[2]
        );

        assert!(codec.verify_and_decode(&forged).is_none());
        assert!(codec.expiry_of(&forged).is_none());
    }

    #[test]
    fn test_garbage_is_invalid() {
        let codec = codec();
        assert!(codec.verify_and_decode("").is_none());
        assert!(codec.verify_and_decode("not.a.jwt").is_none());
        assert!(codec.expiry_of("definitely not a token").is_none());
    }

    #[test]
    fn test_algorithm_mismatch_fails() {
        let codec = codec();
        let hs512 = TokenCodec::new(
            b"test-secret-that-is-long-enough-for-hmac",
            Algorithm::HS512,
            Duration::hours(1),
        );

        let token = hs512.mint(Uuid::new_v4(), "erin", hs512.ttl()).unwrap();
        assert!(codec.verify_and_decode(&token).is_none());
    }
}
