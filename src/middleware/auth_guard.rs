//! Authentication guard middleware.
//!
//! Reads the `X-User-Id` / `X-User-Role` headers, resolves them against the
//! `users` table, and injects an `AuthUser` extension into the request for
//! downstream handlers.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{
    auth::{resolve_identity, USER_ID_HEADER, USER_ROLE_HEADER},
    errors::AppError,
    models::{Role, User},
    state::AppState,
};

/// Authenticated caller. Injected into request extensions by `require_auth`;
/// downstream handlers use `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id:       i64,
    pub role:          Role,
    pub department_id: Option<i64>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            user_id:       user.id,
            role:          user.role,
            department_id: user.department_id,
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Middleware: require a resolvable identity.
/// On success, inserts `AuthUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = req.headers();
    let user = resolve_identity(
        &state.pool,
        header(headers, USER_ID_HEADER),
        header(headers, USER_ROLE_HEADER),
    )
    .await?;

    req.extensions_mut().insert(AuthUser::from(user));

    Ok(next.run(req).await)
}
