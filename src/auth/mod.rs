//! Caller identity and authorization.
//!
//! Identity is asserted by a trusted upstream through two headers and only
//! cross-checked against the `users` table here; no credentials are verified.

pub mod policy;
pub mod seed;

use crate::{
    db::Db,
    errors::{AppError, AppResult},
    models::User,
};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

// ── Identity resolution ──────────────────────────────────────

/// Resolve the claimed `(id, role)` pair to a stored user.
///
/// Fails with `Unauthenticated` when either value is missing, the id is not
/// an integer, no user has that id, or the role string differs from the
/// stored role.
pub async fn resolve_identity(
    pool: &Db,
    claimed_id: Option<&str>,
    claimed_role: Option<&str>,
) -> AppResult<User> {
    let (raw_id, claimed_role) = match (claimed_id, claimed_role) {
        (Some(id), Some(role)) if !id.trim().is_empty() && !role.is_empty() => (id, role),
        _ => {
            return Err(AppError::Unauthenticated(
                "Missing identity headers: X-User-Id and X-User-Role".into(),
            ))
        }
    };

    let user_id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| AppError::Unauthenticated("X-User-Id must be an integer".into()))?;

    let user = find_user(pool, user_id)
        .await?
        .filter(|u| u.role.as_str() == claimed_role)
        .ok_or_else(|| AppError::Unauthenticated("Unknown user or role mismatch".into()))?;

    Ok(user)
}

pub async fn find_user(pool: &Db, user_id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, display_name, role, department_id
         FROM users
         WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}
