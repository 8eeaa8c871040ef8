use axum::{extract::Query, middleware, routing::get, Json, Router};
use tracing::{debug, instrument};

use crate::{
    auth::middleware::{require_auth, AuthUser},
    hola::dto::{HolaInput, HolaResponse},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route(
        "/api/agregar_hola_publico",
        get(agregar_hola_publico_get).post(agregar_hola_publico_post),
    )
}

pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/agregar_hola",
            get(agregar_hola_get).post(agregar_hola_post),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

pub fn saludo_publico(cadena: &str) -> String {
    format!("hola {cadena} desde la api de python (público)")
}

pub fn saludo_para(cadena: &str, username: &str) -> String {
    format!("hola {cadena} desde la api de python - Usuario: {username}")
}

// Unparsable input falls back to an empty cadena rather than a rejection.
fn from_body(body: Option<Json<HolaInput>>) -> String {
    body.map(|Json(b)| b.cadena()).unwrap_or_default()
}

fn from_query(query: Option<Query<HolaInput>>) -> String {
    query.map(|Query(q)| q.cadena()).unwrap_or_default()
}

#[instrument(skip_all)]
pub async fn agregar_hola_publico_get(query: Option<Query<HolaInput>>) -> Json<HolaResponse> {
    Json(HolaResponse {
        resultado: saludo_publico(&from_query(query)),
    })
}

#[instrument(skip_all)]
pub async fn agregar_hola_publico_post(body: Option<Json<HolaInput>>) -> Json<HolaResponse> {
    Json(HolaResponse {
        resultado: saludo_publico(&from_body(body)),
    })
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn agregar_hola_get(
    user: AuthUser,
    query: Option<Query<HolaInput>>,
) -> Json<HolaResponse> {
    debug!(username = %user.username, "agregar_hola via query");
    Json(HolaResponse {
        resultado: saludo_para(&from_query(query), &user.username),
    })
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn agregar_hola_post(
    user: AuthUser,
    body: Option<Json<HolaInput>>,
) -> Json<HolaResponse> {
    debug!(username = %user.username, "agregar_hola via body");
    Json(HolaResponse {
        resultado: saludo_para(&from_body(body), &user.username),
    })
}
