//! Session - the bearer credential and the identity derived from it.
//!
//! The token is a JWT issued by the backend's login endpoint. Its payload
//! carries the username (`sub` or `username`) and an `authorities` list:
//!
//! ```json
//! {
//!   "sub": "alice",
//!   "authorities": ["USER", "ADMIN"]
//! }
//! ```
//!
//! The payload is decoded exactly once, when the session is built. The
//! signature is not verified here; that is the backend's job.

mod role;

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;

pub use role::{Capability, Role};

const JWT_PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Error raised when a token cannot be turned into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The token does not have the `header.payload.signature` shape.
    MalformedToken,
    /// The payload is not valid base64url JSON.
    Decode(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MalformedToken => write!(f, "malformed bearer token"),
            SessionError::Decode(msg) => write!(f, "token payload decode failed: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// Claims read from the token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub authorities: Vec<String>,
}

/// An authenticated session.
#[derive(Clone)]
pub struct Session {
    token: String,
    claims: Claims,
    role: Role,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username())
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Decode a session from a raw JWT.
    pub fn from_token(token: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into();
        let claims = decode_claims(&token)?;
        let role = Role::from_authorities(&claims.authorities);
        tracing::debug!(username = ?claims.sub.as_deref().or(claims.username.as_deref()), ?role, "session established");
        Ok(Self {
            token,
            claims,
            role,
        })
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Username, preferring `sub` over `username`.
    pub fn username(&self) -> Option<&str> {
        self.claims
            .sub
            .as_deref()
            .or(self.claims.username.as_deref())
    }

    /// The role derived from the token's authorities.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the decoded claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => return Err(SessionError::MalformedToken),
    };

    let bytes = JWT_PAYLOAD
        .decode(payload)
        .map_err(|e| SessionError::Decode(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| SessionError::Decode(e.to_string()))
}
