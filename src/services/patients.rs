//! Patients and their implicit login users.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    auth::policy::{authorize, caller_department, Operation},
    db::Db,
    errors::{conflict_on_unique, AppError, AppResult},
    middleware::auth_guard::AuthUser,
    models::{Patient, Role},
    services::require_text,
};

/// Login name for a new patient: a slug of the name, the creation time in
/// microseconds and a random suffix, e.g. `patient_alice_1760000000123456_3f2a9c1d`.
fn patient_username(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_lowercase().next().unwrap_or(c) } else { '_' })
        .take(32)
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("patient_{}_{}_{}", slug, Utc::now().timestamp_micros(), &suffix[..8])
}

/// Create a patient in the caller's department together with its login user.
pub async fn create_patient(pool: &Db, caller: &AuthUser, name: &str) -> AppResult<Patient> {
    authorize(caller, Operation::CreatePatient)?;
    let department_id = caller_department(caller)?;
    require_text("name", name)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, display_name, role, department_id)
         VALUES (?, ?, ?, ?)
         RETURNING id",
    )
    .bind(patient_username(name))
    .bind(name)
    .bind(Role::Patient)
    .bind(department_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "Generated patient username collided, retry the request"))?;

    let patient = sqlx::query_as::<_, Patient>(
        "INSERT INTO patients (name, department_id, user_id)
         VALUES (?, ?, ?)
         RETURNING id, name, department_id, user_id",
    )
    .bind(name)
    .bind(department_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(patient_id = patient.id, user_id, department_id, "Created patient");
    Ok(patient)
}

/// The patient record owned by a patient-role user.
pub(crate) async fn patient_for_user(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Patient> {
    sqlx::query_as::<_, Patient>(
        "SELECT id, name, department_id, user_id FROM patients WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Patient profile not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::find_user, db::test_pool, services::departments};

    async fn department_admin(pool: &Db, department: &str) -> AuthUser {
        let dept = departments::create_department(pool, department).await.unwrap();
        let username = format!("{}-admin", department.to_lowercase());
        departments::create_department_admin(pool, dept.id, &username, "Admin", Role::DepartmentAdmin)
            .await
            .unwrap()
            .into()
    }

    #[test]
    fn usernames_are_distinct_for_the_same_name() {
        let a = patient_username("Alice Smith");
        let b = patient_username("Alice Smith");
        assert!(a.starts_with("patient_alice_smith_"), "{a}");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn creates_patient_with_login_user() {
        let pool = test_pool().await;
        let admin = department_admin(&pool, "Cardiology").await;

        let patient = create_patient(&pool, &admin, "Alice").await.unwrap();
        assert_eq!(patient.name, "Alice");
        assert_eq!(Some(patient.department_id), admin.department_id);

        let user = find_user(&pool, patient.user_id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Patient);
        assert_eq!(user.display_name, "Alice");
        assert_eq!(user.department_id, admin.department_id);

        let mut conn = pool.acquire().await.unwrap();
        let owned = patient_for_user(&mut conn, user.id).await.unwrap();
        assert_eq!(owned.id, patient.id);
    }

    #[tokio::test]
    async fn same_name_twice_creates_two_patients() {
        let pool = test_pool().await;
        let admin = department_admin(&pool, "Cardiology").await;

        let first = create_patient(&pool, &admin, "Alice").await.unwrap();
        let second = create_patient(&pool, &admin, "Alice").await.unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.user_id, second.user_id);
    }

    #[tokio::test]
    async fn only_department_admins_create_patients() {
        let pool = test_pool().await;
        let super_admin = AuthUser { user_id: 1, role: Role::SuperAdmin, department_id: None };

        let err = create_patient(&pool, &super_admin, "Alice").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn failed_insert_leaves_nothing_behind() {
        let pool = test_pool().await;
        // Unknown department: foreign keys reject the write.
        let ghost = AuthUser { user_id: 1, role: Role::DepartmentAdmin, department_id: Some(999) };

        let err = create_patient(&pool, &ghost, "Alice").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)), "{err:?}");

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn rejected_patient_row_rolls_back_login_user() {
        let pool = test_pool().await;
        let admin = department_admin(&pool, "Cardiology").await;
        sqlx::query(
            "CREATE TRIGGER reject_patients BEFORE INSERT ON patients
             BEGIN SELECT RAISE(ABORT, 'patient rows rejected'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = create_patient(&pool, &admin, "Alice").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)), "{err:?}");

        let patient_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'patient'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(patient_users, 0);
    }
}
