//! Role-based authorization guard for individual routes.

use axum::{
    extract::{Extension, Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::policy::{authorize, Operation};
use crate::errors::AppError;
use crate::middleware::auth_guard::AuthUser;

/// Middleware: apply the policy check for the operation a route performs.
/// Layered per route with `from_fn_with_state(Operation::.., require_operation)`,
/// after `require_auth` has inserted the caller.
pub async fn require_operation(
    State(operation): State<Operation>,
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&user, operation)?;
    Ok(next.run(req).await)
}
