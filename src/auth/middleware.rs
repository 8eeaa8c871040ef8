use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::{
    auth::{jwt::JwtKeys, repo_types::User},
    error::ApiError,
    state::AppState,
};

/// Identity resolved by [`require_auth`] and stored in request extensions.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for AuthUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

/// Where an authorization attempt stopped. Only ever logged; the client
/// always gets the same 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejected {
    MissingToken,
    InvalidToken,
    UnknownIdentity,
}

/// Pulls the token out of `Authorization: Bearer <token>`. The scheme is
/// case-insensitive.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, Rejected> {
    let token = bearer_token(headers).ok_or(Rejected::MissingToken)?;

    let keys = JwtKeys::from_ref(state);
    let user_id = keys.validate(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        Rejected::InvalidToken
    })?;

    match User::find_by_id(&state.db, user_id).await {
        Ok(Some(user)) => Ok(user.into()),
        Ok(None) => Err(Rejected::UnknownIdentity),
        Err(e) => {
            error!(error = %e, user_id, "identity lookup failed");
            Err(Rejected::UnknownIdentity)
        }
    }
}

/// Guards a router: runs before the handler and either injects [`AuthUser`]
/// or short-circuits with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authorize(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(stage) => {
            warn!(?stage, path = %req.uri().path(), "unauthorized request");
            Err(ApiError::Unauthorized)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
