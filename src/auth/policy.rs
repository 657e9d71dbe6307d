//! Role → operation permission table.
//!
//! Ownership checks (department scope, own patient record) are not part of
//! this table; the domain operations perform them after [`authorize`].

use crate::{
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    models::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateDepartment,
    CreateDepartmentAdmin,
    CreateScale,
    CreatePatient,
    AssignScale,
    UpdateReportSettings,
    ListOwnAssignments,
    SubmitResponses,
}

impl Operation {
    /// The single role allowed to perform this operation.
    pub fn required_role(self) -> Role {
        match self {
            Operation::CreateDepartment
            | Operation::CreateDepartmentAdmin
            | Operation::CreateScale => Role::SuperAdmin,

            Operation::CreatePatient
            | Operation::AssignScale
            | Operation::UpdateReportSettings => Role::DepartmentAdmin,

            Operation::ListOwnAssignments
            | Operation::SubmitResponses => Role::Patient,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Operation::CreateDepartment      => "Only a super admin can create departments",
            Operation::CreateDepartmentAdmin => "Only a super admin can create department admins",
            Operation::CreateScale           => "Only a super admin can create scales",
            Operation::CreatePatient         => "Only a department admin can create patients",
            Operation::AssignScale           => "Only a department admin can assign scales",
            Operation::UpdateReportSettings  => "Only a department admin can change report settings",
            Operation::ListOwnAssignments    => "Only patients can list their assignments",
            Operation::SubmitResponses       => "Only patients can submit responses",
        }
    }
}

pub fn allowed(role: Role, operation: Operation) -> bool {
    operation.required_role() == role
}

/// Role check for `caller`; `Forbidden` when the role is not permitted.
pub fn authorize(caller: &AuthUser, operation: Operation) -> AppResult<()> {
    if allowed(caller.role, operation) {
        Ok(())
    } else {
        tracing::debug!(user_id = caller.user_id, role = %caller.role, ?operation, "Operation denied");
        Err(AppError::Forbidden(operation.denial().into()))
    }
}

/// The department a department admin acts within.
pub fn caller_department(caller: &AuthUser) -> AppResult<i64> {
    caller
        .department_id
        .ok_or_else(|| AppError::Forbidden("Caller is not attached to a department".into()))
}
