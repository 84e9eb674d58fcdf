use axum::Json;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Identity carried by a verified access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing access token")]
    MissingToken,

    #[error("malformed Authorization header")]
    MalformedHeader,

    #[error("kid not found in token header")]
    MissingKeyId,

    #[error("unknown signing key '{0}'")]
    UnknownKey(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid key material for '{kid}': {reason}")]
    InvalidKey { kid: String, reason: String },
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, AuthError>;

    /// Whether connections without any token are turned away.
    fn requires_token(&self) -> bool {
        true
    }
}

/// Verifies signed JWTs, picking the key by the header's `kid`.
#[derive(Default)]
pub struct JwtVerifier {
    keys: HashMap<String, (DecodingKey, Algorithm)>,
}

impl JwtVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust an RS256 public key in PEM form.
    pub fn with_rsa_pem(mut self, kid: impl Into<String>, pem: &[u8]) -> Result<Self, AuthError> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| AuthError::InvalidKey {
            kid: kid.clone(),
            reason: e.to_string(),
        })?;
        self.keys.insert(kid, (key, Algorithm::RS256));
        Ok(self)
    }

    /// Trust an HS256 shared secret.
    pub fn with_secret(mut self, kid: impl Into<String>, secret: &[u8]) -> Self {
        self.keys
            .insert(kid.into(), (DecodingKey::from_secret(secret), Algorithm::HS256));
        self
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let (key, algorithm) = self
            .keys
            .get(&kid)
            .ok_or_else(|| AuthError::UnknownKey(kid.clone()))?;

        let validation = Validation::new(*algorithm);
        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            debug!("Token with kid {} rejected: {}", kid, e);
            AuthError::InvalidToken(e.to_string())
        })?;
        Ok(data.claims)
    }
}

/// Accepts every connection. For local development only.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAnonymous;

impl TokenVerifier for AllowAnonymous {
    fn verify(&self, _token: &str) -> Result<Claims, AuthError> {
        Ok(Claims {
            sub: "anonymous".to_owned(),
            username: "anonymous".to_owned(),
            ..Default::default()
        })
    }

    fn requires_token(&self) -> bool {
        false
    }
}

/// Pull the access token from `Authorization: Bearer` or a `token` query value.
pub fn bearer_token<'a>(
    headers: &'a HeaderMap,
    query_token: Option<&'a str>,
) -> Result<Option<&'a str>, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedHeader)?;
        return Ok(Some(token));
    }
    Ok(query_token.filter(|t| !t.is_empty()))
}

/// Check an upgrade request before accepting the websocket.
pub fn authorize(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Claims, AuthError> {
    match bearer_token(headers, query_token)? {
        Some(token) => verifier.verify(token),
        None if !verifier.requires_token() => verifier.verify(""),
        None => Err(AuthError::MissingToken),
    }
}
