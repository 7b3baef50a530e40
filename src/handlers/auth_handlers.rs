//! Sign-in endpoint and the extractor guarding write routes.

use crate::{errors::AppError, state::AppState};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SigninBody {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Signin {
    pub token: String,
}

/// `POST /api/v1/auth/signin`
pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninBody>,
) -> Result<Json<Signin>, AppError> {
    if body.password.is_empty() {
        return Err(AppError::bad_request("password is required"));
    }

    let token = state.auth.signin(&body.password)?;
    Ok(Json(Signin { token }))
}

/// Rejects the request with 401 unless it carries a valid password or token.
pub struct RequireAuth;

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state.auth.verify_headers(&parts.headers)?;
        Ok(RequireAuth)
    }
}
