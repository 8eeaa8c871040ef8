use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse},
        jwt::JwtKeys,
        middleware::{require_auth, AuthUser},
        services,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn profile_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(payload) = payload?;
    let user = services::register(
        &state.db,
        payload.username.as_deref().unwrap_or_default(),
        payload.email.as_deref().unwrap_or_default(),
        payload.password.as_deref().unwrap_or_default(),
    )
    .await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Usuario registrado exitosamente",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    // Blank fields go through the same lookup and fail as bad credentials.
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let Some(user) = services::authenticate(&state.db, &username, &password).await? else {
        warn!(username = %username.trim(), "login failed");
        return Err(ApiError::InvalidCredentials);
    };

    let access_token = JwtKeys::from_ref(&state)
        .issue(user.id)
        .map_err(|e| ApiError::Internal(e.into()))?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(LoginResponse {
        access_token,
        user: user.into(),
        message: "Login exitoso",
    }))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn profile(user: AuthUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
    })
}
