//! Domain operations. Each public operation runs in one transaction on the
//! pool it is handed and returns the resulting entity view.

pub mod assignments;
pub mod departments;
pub mod patients;
pub mod scales;

/// Reject blank required text fields.
pub(crate) fn require_text(field: &str, value: &str) -> crate::errors::AppResult<()> {
    if value.trim().is_empty() {
        return Err(crate::errors::AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}
