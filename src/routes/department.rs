//! `/department` routes — patient registration and scale assignment by a
//! department admin.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    errors::AppResult,
    middleware::auth_guard::AuthUser,
    models::{Patient, ScaleAssignment},
    routes::{AppJson, AppPath},
    services::{assignments, patients},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/department/patients",                       post(create_patient))
        .route("/department/assignments",                    post(assign_scale))
        .route("/department/assignments/{id}/report-settings", patch(update_report_settings))
}

#[derive(Deserialize, Validate)]
struct CreatePatientBody {
    #[validate(length(min = 1, max = 255, message = "name is required"))]
    name: String,
}

async fn create_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(body): AppJson<CreatePatientBody>,
) -> AppResult<(StatusCode, Json<Patient>)> {
    body.validate()?;
    let patient = patients::create_patient(&state.pool, &user, &body.name).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn assign_scale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(body): AppJson<assignments::NewAssignment>,
) -> AppResult<(StatusCode, Json<ScaleAssignment>)> {
    body.validate()?;
    let assignment = assignments::assign_scale(&state.pool, &user, &body).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_report_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<assignments::ReportSettingsPatch>,
) -> AppResult<Json<ScaleAssignment>> {
    body.validate()?;
    let assignment = assignments::update_report_settings(&state.pool, &user, id, &body).await?;
    Ok(Json(assignment))
}
