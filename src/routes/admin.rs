//! `/admin` routes — department provisioning and scale management.
//!
//! The provisioning routes (`/admin/departments*`) are open unless
//! `REQUIRE_PROVISIONING_AUTH` is set; see `all_routes`. `/admin/scales`
//! always requires an identity and the super_admin role.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    routing::{post, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::policy::Operation,
    errors::AppResult,
    middleware::{auth_guard::AuthUser, role_guard::require_operation},
    models::{Department, Role, ScaleWithItems, User},
    routes::{AppJson, AppPath},
    services::{departments, scales},
    state::AppState,
};

/// Department provisioning. With `guarded`, each route checks the policy for
/// its own operation; the caller must still layer `require_auth` on top.
pub fn provisioning_router(guarded: bool) -> Router<AppState> {
    let guard = |route: MethodRouter<AppState>, operation: Operation| {
        if guarded {
            route.route_layer(middleware::from_fn_with_state(operation, require_operation))
        } else {
            route
        }
    };

    Router::new()
        .route("/admin/departments",             guard(post(create_department), Operation::CreateDepartment))
        .route("/admin/departments/{id}/admins", guard(post(create_department_admin), Operation::CreateDepartmentAdmin))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/scales", post(create_scale))
}

// ── Request bodies ───────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreateDepartmentBody {
    #[validate(length(min = 1, max = 255, message = "name is required"))]
    name: String,
}

// A `department_id` field may be present in the body; the path id is used.
#[derive(Deserialize, Validate)]
struct CreateAdminBody {
    #[validate(length(min = 1, max = 255, message = "username is required"))]
    username:     String,
    #[validate(length(min = 1, max = 255, message = "display_name is required"))]
    display_name: String,
    role:         Role,
}

// ── Handlers ─────────────────────────────────────────────────

async fn create_department(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateDepartmentBody>,
) -> AppResult<(StatusCode, Json<Department>)> {
    body.validate()?;
    let department = departments::create_department(&state.pool, &body.name).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

async fn create_department_admin(
    State(state): State<AppState>,
    AppPath(department_id): AppPath<i64>,
    AppJson(body): AppJson<CreateAdminBody>,
) -> AppResult<(StatusCode, Json<User>)> {
    body.validate()?;
    let user = departments::create_department_admin(
        &state.pool,
        department_id,
        &body.username,
        &body.display_name,
        body.role,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn create_scale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(body): AppJson<scales::NewScale>,
) -> AppResult<(StatusCode, Json<ScaleWithItems>)> {
    body.validate()?;
    let scale = scales::create_scale(&state.pool, &user, &body).await?;
    Ok((StatusCode::CREATED, Json(scale)))
}
