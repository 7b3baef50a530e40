//! Password sign-in and bearer token verification.
//!
//! Tokens are HS256 JWTs carrying only an `iat` claim; there is no expiry.
//! A request is authenticated by either a matching `X-Password` header or a
//! valid `Authorization: Bearer <token>` header.

use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Span, debug};

pub const PASSWORD_HEADER: &str = "x-password";

/// Allowed clock skew for `iat`, in seconds.
const IAT_LEEWAY_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidAuth(&'static str),
    #[error("failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iat: i64,
}

#[derive(Clone)]
pub struct AuthService {
    password: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    span: Span,
}

impl AuthService {
    pub fn new(password: impl Into<String>, jwt_secret: &str, span: Span) -> Self {
        Self {
            password: password.into(),
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            span,
        }
    }

    fn password_matches(&self, candidate: &str) -> bool {
        let (a, b) = (self.password.as_bytes(), candidate.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }

    /// Exchange the configured password for a signed token.
    pub fn signin(&self, password: &str) -> Result<String, AuthError> {
        if !self.password_matches(password) {
            debug!(parent: &self.span, "rejected sign-in attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let claims = Claims {
            iat: Utc::now().timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check the request headers for a password or a valid bearer token.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        if let Some(password) = headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok()) {
            if !password.is_empty() && self.password_matches(password) {
                return Ok(());
            }
        }

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer)
            .ok_or(AuthError::InvalidAuth("invalid authorization header"))?;

        self.verify_token(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<(), AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            debug!(parent: &self.span, "token rejected: {}", err);
            AuthError::InvalidAuth("invalid authorization token")
        })?;

        if data.claims.iat > Utc::now().timestamp() + IAT_LEEWAY_SECS {
            return Err(AuthError::InvalidAuth("invalid authorization token"));
        }
        Ok(())
    }
}

/// Extract the token from `Bearer <token>`; the scheme is case-insensitive.
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new("hunter2", "secret", Span::none())
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn signin_rejects_wrong_password() {
        assert!(matches!(
            service().signin("wrong"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn issued_token_verifies() {
        let auth = service();
        let token = auth.signin("hunter2").expect("password is correct");
        auth.verify_headers(&bearer(&token)).expect("token is valid");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = AuthService::new("hunter2", "other", Span::none())
            .signin("hunter2")
            .unwrap();
        assert!(matches!(
            service().verify_headers(&bearer(&token)),
            Err(AuthError::InvalidAuth(_))
        ));
    }

    #[test]
    fn password_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(PASSWORD_HEADER, HeaderValue::from_static("hunter2"));
        service().verify_headers(&headers).expect("password header matches");
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        let auth = service();
        assert!(auth.verify_headers(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            auth.verify_headers(&headers),
            Err(AuthError::InvalidAuth("invalid authorization header"))
        ));
    }

    #[test]
    fn parse_bearer_variants() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Token abc"), None);
    }
}
