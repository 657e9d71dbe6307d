//! Departments and their administrators.

use crate::{
    db::Db,
    errors::{conflict_on_unique, AppError, AppResult},
    models::{Department, Role, User},
    services::require_text,
};

pub async fn create_department(pool: &Db, name: &str) -> AppResult<Department> {
    require_text("name", name)?;
    let mut tx = pool.begin().await?;

    let department = sqlx::query_as::<_, Department>(
        "INSERT INTO departments (name) VALUES (?) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "Department name already exists"))?;

    tx.commit().await?;
    tracing::info!(department_id = department.id, "Created department");
    Ok(department)
}

/// Create a `department_admin` user scoped to `department_id`.
///
/// `role` must be `department_admin`; it is part of the payload so that a
/// caller sending any other role gets `BadRequest` rather than a silently
/// different account.
pub async fn create_department_admin(
    pool: &Db,
    department_id: i64,
    username: &str,
    display_name: &str,
    role: Role,
) -> AppResult<User> {
    if role != Role::DepartmentAdmin {
        return Err(AppError::BadRequest(
            "Department admins must use the department_admin role".into(),
        ));
    }
    require_text("username", username)?;
    require_text("display_name", display_name)?;

    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE id = ?)")
        .bind(department_id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Err(AppError::NotFound("Department not found".into()));
    }

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, display_name, role, department_id)
         VALUES (?, ?, ?, ?)
         RETURNING id, username, display_name, role, department_id",
    )
    .bind(username)
    .bind(display_name)
    .bind(Role::DepartmentAdmin)
    .bind(department_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "Username already exists"))?;

    tx.commit().await?;
    tracing::info!(user_id = user.id, department_id, "Created department admin");
    Ok(user)
}
