use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AuthError, Result};

/// The only claim a login token carries.
///
/// There is deliberately no `exp`: whether the session is alive is decided by
/// the session store, not by the token.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sid: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// Issues and verifies HS256 login tokens bound to a session identifier.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<Keys>,
}

impl TokenCodec {
    /// Creates a codec from the server secret.
    ///
    /// An empty secret is a configuration error.
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(AppError::Configuration(
                "token signing secret is empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation,
            }),
        })
    }

    /// Signs a token for `session_id`. The same id always yields the same token.
    pub fn issue(&self, session_id: &str) -> Result<String> {
        let claims = SessionClaims {
            sid: session_id.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Returns the session identifier of an authentic token.
    ///
    /// Malformed and tampered tokens produce the same error.
    pub fn verify(&self, token: &str) -> std::result::Result<String, AuthError> {
        let data = decode::<SessionClaims>(token, &self.keys.decoding, &self.keys.validation)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AuthError::InvalidSignature
            })?;

        if data.claims.sid.is_empty() {
            return Err(AuthError::InvalidSignature);
        }

        Ok(data.claims.sid)
    }
}
