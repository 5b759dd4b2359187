//! Session token verification
//!
//! Tokens are issued by the external identity provider and signed with a
//! shared HS256 secret.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed authorization header")]
    MalformedHeader,
    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    exp: usize,
}

pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // identity provider tokens carry a provider-specific audience
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionUser, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(SessionUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }

    /// Bearer token from the headers, `Ok(None)` when there is none
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<Option<SessionUser>, AuthError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;
        self.verify(token).map(Some)
    }

    /// Missing or invalid sessions both resolve to an anonymous caller
    pub fn identify(&self, headers: &HeaderMap) -> Option<SessionUser> {
        match self.verify_headers(headers) {
            Ok(user) => user,
            Err(e) => {
                tracing::debug!("Treating caller as anonymous: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn token_for(secret: &str, user_id: &str, email: Option<&str>) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(String::from),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
