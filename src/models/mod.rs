#![allow(dead_code)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub mod datetime;

// ── Roles ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    DepartmentAdmin,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin      => "super_admin",
            Role::DepartmentAdmin => "department_admin",
            Role::Patient         => "patient",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Departments ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id:   i64,
    pub name: String,
}

// ── Users ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id:            i64,
    pub username:      String,
    pub display_name:  String,
    pub role:          Role,
    pub department_id: Option<i64>,
}

// ── Patients ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Patient {
    pub id:            i64,
    pub name:          String,
    pub department_id: i64,
    pub user_id:       i64,
}

// ── Scales ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Scale {
    pub id:          i64,
    pub name:        String,
    pub description: Option<String>,
    pub logic:       Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScaleItem {
    pub id:         i64,
    pub scale_id:   i64,
    pub prompt:     String,
    pub field_type: String,
    pub options:    Option<String>,
}

/// A scale together with its items in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct ScaleWithItems {
    #[serde(flatten)]
    pub scale: Scale,
    pub items: Vec<ScaleItem>,
}

// ── Assignments ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScaleAssignment {
    pub id:                 i64,
    pub patient_id:         i64,
    pub scale_id:           i64,
    pub assigned_by:        i64,
    pub allow_patient_view: bool,
    pub report_header:      Option<String>,
    #[serde(serialize_with = "datetime::serialize")]
    pub evaluation_date:    NaiveDateTime,
    #[serde(serialize_with = "datetime::serialize_option")]
    pub completed_at:       Option<NaiveDateTime>,
    pub duration_seconds:   Option<i64>,
}

/// Column list matching [`ScaleAssignment`], for reuse across queries.
pub const ASSIGNMENT_COLUMNS: &str =
    "id, patient_id, scale_id, assigned_by, allow_patient_view, report_header,
     evaluation_date, completed_at, duration_seconds";

// ── Responses ────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScaleResponse {
    pub id:            i64,
    pub assignment_id: i64,
    pub item_id:       i64,
    pub answer_text:   String,
    pub created_at:    NaiveDateTime,
}

/// One answer as submitted by a patient and as echoed back in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAnswer {
    pub item_id:     i64,
    pub answer_text: String,
}

impl From<ScaleResponse> for ResponseAnswer {
    fn from(r: ScaleResponse) -> Self {
        Self { item_id: r.item_id, answer_text: r.answer_text }
    }
}

/// An assignment as seen by the patient: the assignment itself, the scale
/// with its items, and the current answers.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentDetail {
    #[serde(flatten)]
    pub assignment: ScaleAssignment,
    pub scale:      ScaleWithItems,
    pub responses:  Vec<ResponseAnswer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_match_serde_names() {
        for role in [Role::SuperAdmin, Role::DepartmentAdmin, Role::Patient] {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, serde_json::Value::String(role.as_str().to_string()));
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn unknown_role_literal_is_rejected() {
        let parsed: Result<Role, _> = serde_json::from_str("\"admin\"");
        assert!(parsed.is_err());
    }
}
