//! JSON endpoints over the identity provider.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use server::identity::{AuthSession, IdentityError, IdentityProvider, LoginRequest, RegisterRequest};
use std::sync::Arc;
use tracing::error;

use crate::AppState;

const TOKEN_COOKIE: &str = "token";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
}

/// Identity failure rendered as `{ "message": ... }`.
struct ApiError(IdentityError);

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Identity error: {}", self.0);
        }
        (status, Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}

/// Run a provider call off the async workers; password hashing is CPU bound.
async fn blocking<T, F>(identity: &Arc<dyn IdentityProvider>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn IdentityProvider) -> Result<T, IdentityError> + Send + 'static,
{
    let identity = Arc::clone(identity);
    tokio::task::spawn_blocking(move || f(identity.as_ref()))
        .await
        .map_err(|e| IdentityError::Internal(e.to_string()))?
        .map_err(ApiError)
}

/// Bearer header first, then the `token` cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn token_cookie(token: &str, max_age: u64) -> String {
    format!("{TOKEN_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}")
}

/// `200 OK` with `{ user, token }` and the token cookie; shared by register and login.
fn session_response(session: AuthSession, max_age: u64) -> Response {
    let cookie = token_cookie(&session.token, max_age);
    ([(header::SET_COOKIE, cookie)], Json(session)).into_response()
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let session = blocking(&state.identity, move |id| id.register(request)).await?;
    Ok(session_response(session, state.token_ttl_secs))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let session = blocking(&state.identity, move |id| id.login(request)).await?;
    Ok(session_response(session, state.token_ttl_secs))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let token = extract_token(&headers);
    let user = blocking(&state.identity, move |id| id.whoami(token.as_deref())).await?;
    Ok(Json(json!({ "user": user })).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let token = extract_token(&headers);
    blocking(&state.identity, move |id| id.logout(token.as_deref())).await?;
    Ok((
        [(header::SET_COOKIE, token_cookie("", 0))],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response())
}
