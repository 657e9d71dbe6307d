use crate::{
    db::Db,
    errors::{AppError, AppResult},
    models::User,
};

const SUPER_ADMIN_USERNAME: &str = "superadmin";
const SUPER_ADMIN_DISPLAY_NAME: &str = "Super Administrator";

/// Returns the super admin, creating it on first call.
/// Safe to call on every startup and from concurrent bootstrap requests: the
/// partial unique index `idx_users_single_super_admin` admits one row, a losing
/// insert is ignored and the winner is read back.
pub async fn bootstrap_super_admin(pool: &Db) -> AppResult<User> {
    let inserted = sqlx::query(
        "INSERT INTO users (username, display_name, role, department_id)
         VALUES (?, ?, 'super_admin', NULL)
         ON CONFLICT DO NOTHING",
    )
    .bind(SUPER_ADMIN_USERNAME)
    .bind(SUPER_ADMIN_DISPLAY_NAME)
    .execute(pool)
    .await?
    .rows_affected();

    let user: Option<User> = sqlx::query_as::<_, User>(
        "SELECT id, username, display_name, role, department_id
         FROM users
         WHERE role = 'super_admin'",
    )
    .fetch_optional(pool)
    .await?;

    // Nothing inserted and no super admin: the username is held by another account.
    let user = user.ok_or_else(|| {
        AppError::Conflict(format!("Username '{SUPER_ADMIN_USERNAME}' is already taken"))
    })?;

    if inserted > 0 {
        tracing::info!(user_id = user.id, "Seeded super admin account");
    }
    Ok(user)
}
