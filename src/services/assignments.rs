//! Scale assignments: handing a scale to a patient, report settings, and the
//! patient side (listing and answering).

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use sqlx::SqliteConnection;
use validator::Validate;

use crate::{
    auth::policy::{authorize, caller_department, Operation},
    db::Db,
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    models::{
        datetime, AssignmentDetail, ResponseAnswer, ScaleAssignment, ScaleResponse,
        ScaleWithItems, ASSIGNMENT_COLUMNS,
    },
    services::{patients::patient_for_user, scales::load_scale},
};

// ── Inputs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct NewAssignment {
    pub patient_id:         i64,
    pub scale_id:           i64,
    #[serde(default)]
    pub allow_patient_view: bool,
    #[validate(length(max = 255))]
    pub report_header:      Option<String>,
    /// Defaults to the time of assignment.
    #[serde(default, deserialize_with = "datetime::deserialize_option")]
    pub evaluation_date:    Option<NaiveDateTime>,
}

/// Partial update of an assignment's report settings.
///
/// Absent fields are left unchanged. `report_header: null` clears the header;
/// `allow_patient_view: null` is treated as absent.
#[derive(Debug, Deserialize, Validate)]
pub struct ReportSettingsPatch {
    #[serde(default)]
    pub allow_patient_view: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub report_header:      Option<Option<String>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing field
/// (`None`, via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct Submission {
    pub responses:        Vec<ResponseAnswer>,
    #[validate(range(min = 0))]
    pub duration_seconds: Option<i64>,
}

// ── Shared lookups ───────────────────────────────────────────

async fn fetch_assignment(conn: &mut SqliteConnection, assignment_id: i64) -> AppResult<Option<ScaleAssignment>> {
    let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM scale_assignments WHERE id = ?");
    let row = sqlx::query_as::<_, ScaleAssignment>(&sql)
        .bind(assignment_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn fetch_answers(conn: &mut SqliteConnection, assignment_id: i64) -> AppResult<Vec<ResponseAnswer>> {
    let rows = sqlx::query_as::<_, ScaleResponse>(
        "SELECT id, assignment_id, item_id, answer_text, created_at
         FROM scale_responses
         WHERE assignment_id = ?
         ORDER BY id",
    )
    .bind(assignment_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(ResponseAnswer::from).collect())
}

// ── Department admin side ────────────────────────────────────

/// Hand a scale to a patient of the caller's department.
///
/// A patient outside the caller's department is reported as not found.
pub async fn assign_scale(pool: &Db, caller: &AuthUser, input: &NewAssignment) -> AppResult<ScaleAssignment> {
    authorize(caller, Operation::AssignScale)?;
    let department_id = caller_department(caller)?;

    let mut tx = pool.begin().await?;

    let patient_department: Option<i64> = sqlx::query_scalar(
        "SELECT department_id FROM patients WHERE id = ?",
    )
    .bind(input.patient_id)
    .fetch_optional(&mut *tx)
    .await?;
    if patient_department != Some(department_id) {
        return Err(AppError::NotFound("Patient not found in this department".into()));
    }

    let scale_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM scales WHERE id = ?)")
        .bind(input.scale_id)
        .fetch_one(&mut *tx)
        .await?;
    if !scale_exists {
        return Err(AppError::NotFound("Scale not found".into()));
    }

    let sql = format!(
        "INSERT INTO scale_assignments
            (patient_id, scale_id, assigned_by, allow_patient_view, report_header, evaluation_date)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING {ASSIGNMENT_COLUMNS}"
    );
    let assignment = sqlx::query_as::<_, ScaleAssignment>(&sql)
        .bind(input.patient_id)
        .bind(input.scale_id)
        .bind(caller.user_id)
        .bind(input.allow_patient_view)
        .bind(&input.report_header)
        .bind(input.evaluation_date.unwrap_or_else(datetime::now))
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(
        assignment_id = assignment.id,
        patient_id = assignment.patient_id,
        scale_id = assignment.scale_id,
        "Assigned scale"
    );
    Ok(assignment)
}

/// Update visibility and header of an assignment.
///
/// Unlike the other scoped operations, an assignment of another department
/// is refused with `Forbidden` rather than hidden.
pub async fn update_report_settings(
    pool: &Db,
    caller: &AuthUser,
    assignment_id: i64,
    patch: &ReportSettingsPatch,
) -> AppResult<ScaleAssignment> {
    authorize(caller, Operation::UpdateReportSettings)?;
    let department_id = caller_department(caller)?;

    let mut tx = pool.begin().await?;

    let owner_department: i64 = sqlx::query_scalar(
        "SELECT p.department_id
         FROM scale_assignments a
         JOIN patients p ON p.id = a.patient_id
         WHERE a.id = ?",
    )
    .bind(assignment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
    if owner_department != department_id {
        return Err(AppError::Forbidden("Cannot modify assignments of another department".into()));
    }

    if let Some(allow) = patch.allow_patient_view {
        sqlx::query("UPDATE scale_assignments SET allow_patient_view = ? WHERE id = ?")
            .bind(allow)
            .bind(assignment_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(header) = &patch.report_header {
        sqlx::query("UPDATE scale_assignments SET report_header = ? WHERE id = ?")
            .bind(header)
            .bind(assignment_id)
            .execute(&mut *tx)
            .await?;
    }

    let assignment = fetch_assignment(&mut tx, assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;

    tx.commit().await?;
    tracing::info!(assignment_id, "Updated report settings");
    Ok(assignment)
}

// ── Patient side ─────────────────────────────────────────────

/// All assignments of the calling patient, newest evaluation first, with
/// scale, items and current answers.
pub async fn list_patient_assignments(pool: &Db, caller: &AuthUser) -> AppResult<Vec<AssignmentDetail>> {
    authorize(caller, Operation::ListOwnAssignments)?;

    let mut tx = pool.begin().await?;
    let patient = patient_for_user(&mut tx, caller.user_id).await?;

    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS}
         FROM scale_assignments
         WHERE patient_id = ?
         ORDER BY evaluation_date DESC, id DESC"
    );
    let assignments = sqlx::query_as::<_, ScaleAssignment>(&sql)
        .bind(patient.id)
        .fetch_all(&mut *tx)
        .await?;

    let mut scales: HashMap<i64, ScaleWithItems> = HashMap::new();
    let mut details = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        if !scales.contains_key(&assignment.scale_id) {
            let scale = load_scale(&mut tx, assignment.scale_id).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "assignment {} references missing scale {}",
                    assignment.id,
                    assignment.scale_id
                ))
            })?;
            scales.insert(assignment.scale_id, scale);
        }
        let scale = scales[&assignment.scale_id].clone();
        let responses = fetch_answers(&mut tx, assignment.id).await?;
        details.push(AssignmentDetail { assignment, scale, responses });
    }

    tx.commit().await?;
    Ok(details)
}

/// Replace the answers of one of the caller's assignments and mark it
/// completed. Resubmission overwrites the previous answers and completion.
pub async fn submit_responses(
    pool: &Db,
    caller: &AuthUser,
    assignment_id: i64,
    submission: &Submission,
) -> AppResult<ScaleAssignment> {
    authorize(caller, Operation::SubmitResponses)?;
    if submission.duration_seconds.is_some_and(|d| d < 0) {
        return Err(AppError::BadRequest("duration_seconds must not be negative".into()));
    }

    let mut tx = pool.begin().await?;
    let patient = patient_for_user(&mut tx, caller.user_id).await?;

    let assignment = fetch_assignment(&mut tx, assignment_id)
        .await?
        .filter(|a| a.patient_id == patient.id)
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;

    let item_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM scale_items WHERE scale_id = ?")
        .bind(assignment.scale_id)
        .fetch_all(&mut *tx)
        .await?;
    let scale_items: HashSet<i64> = item_ids.into_iter().collect();
    let mut seen = HashSet::with_capacity(submission.responses.len());
    for answer in &submission.responses {
        if !scale_items.contains(&answer.item_id) {
            return Err(AppError::BadRequest(format!(
                "Item {} does not belong to this scale",
                answer.item_id
            )));
        }
        if !seen.insert(answer.item_id) {
            return Err(AppError::BadRequest(format!("Item {} answered more than once", answer.item_id)));
        }
    }

    sqlx::query("DELETE FROM scale_responses WHERE assignment_id = ?")
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;

    let now = datetime::now();
    for answer in &submission.responses {
        sqlx::query(
            "INSERT INTO scale_responses (assignment_id, item_id, answer_text, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(assignment_id)
        .bind(answer.item_id)
        .bind(&answer.answer_text)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE scale_assignments SET completed_at = ?, duration_seconds = ? WHERE id = ?")
        .bind(now)
        .bind(submission.duration_seconds)
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;

    let assignment = fetch_assignment(&mut tx, assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;

    tx.commit().await?;
    tracing::info!(
        assignment_id,
        patient_id = patient.id,
        answers = submission.responses.len(),
        "Submitted responses"
    );
    Ok(assignment)
}
