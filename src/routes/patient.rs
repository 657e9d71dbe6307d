//! `/patient` routes — a patient's own assignments.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::{
    errors::AppResult,
    middleware::auth_guard::AuthUser,
    models::{AssignmentDetail, ScaleAssignment},
    routes::{AppJson, AppPath},
    services::assignments,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patient/assignments",                get(list_assignments))
        .route("/patient/assignments/{id}/responses", post(submit_responses))
}

async fn list_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<AssignmentDetail>>> {
    let details = assignments::list_patient_assignments(&state.pool, &user).await?;
    Ok(Json(details))
}

async fn submit_responses(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<assignments::Submission>,
) -> AppResult<Json<ScaleAssignment>> {
    body.validate()?;
    let assignment = assignments::submit_responses(&state.pool, &user, id, &body).await?;
    Ok(Json(assignment))
}
