//! Unauthenticated service routes: health probe and super admin bootstrap.

use axum::{extract::State, routing::{get, post}, Json, Router};
use serde_json::{json, Value};

use crate::{auth::seed, errors::AppResult, models::User, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health",                get(health))
        .route("/bootstrap/super-admin", post(bootstrap_super_admin))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn bootstrap_super_admin(State(state): State<AppState>) -> AppResult<Json<User>> {
    let user = seed::bootstrap_super_admin(&state.pool).await?;
    Ok(Json(user))
}
