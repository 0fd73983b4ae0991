//! Conversion of a hired candidate into an employee.
//!
//! Everything happens in one transaction: the employee id allocation, the
//! principal and employee rows and the candidate's `is_employee` flag either
//! all commit or none do.

use crate::{
    config::EmployeeIdScheme,
    core::{
        context::RequestContext,
        employee::{EmployeeInput, Placement, insert_employee_record, validate_placement},
        salary::parse_salary,
        user::ensure_capacity,
    },
    entities::{
        Candidate, CandidateModel, CandidateStatus, EmployeeModel, EmploymentStatus,
        PrincipalModel, candidate,
    },
    errors::{Error, FieldErrors, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Employment parameters supplied on the conversion form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConversionForm {
    pub branch_id: Option<i64>,
    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
    pub shift_id: Option<i64>,
    pub attendance_policy_id: Option<i64>,
    pub date_of_joining: Option<NaiveDate>,
}

/// The rows written by a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub employee: EmployeeModel,
    pub principal: PrincipalModel,
    pub candidate: CandidateModel,
}

fn validate_form(form: &ConversionForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if form.date_of_joining.is_none() {
        errors.add("date_of_joining", "The date of joining field is required.");
    }
    if form.department_id.is_none() {
        errors.add("department_id", "The department id field is required.");
    }
    if form.designation_id.is_none() {
        errors.add("designation_id", "The designation id field is required.");
    }
    errors
}

/// Seeds an employee form from the candidate's carried attributes.
///
/// Final salary wins over expected salary; unparseable text leaves the base
/// salary empty.
#[must_use]
pub fn employee_input_from(candidate: &CandidateModel, form: &ConversionForm) -> EmployeeInput {
    let base_salary = candidate
        .final_salary
        .as_deref()
        .and_then(parse_salary)
        .or_else(|| candidate.expected_salary.as_deref().and_then(parse_salary));

    EmployeeInput {
        name: candidate.full_name(),
        email: candidate.email.clone(),
        branch_id: form.branch_id,
        department_id: form.department_id,
        designation_id: form.designation_id,
        shift_id: form.shift_id,
        attendance_policy_id: form.attendance_policy_id,
        date_of_joining: form.date_of_joining,
        date_of_birth: candidate.date_of_birth,
        gender: candidate.gender.clone(),
        phone: candidate.phone.clone(),
        address_line_1: candidate.address.clone(),
        city: candidate.city.clone(),
        state: candidate.state.clone(),
        country: candidate.country.clone(),
        postal_code: candidate.zip_code.clone(),
        base_salary,
        ..Default::default()
    }
}

/// Promotes a hired candidate to an employee.
///
/// # Errors
/// - `InvalidState` unless the candidate is Hired, or when the plan's
///   `max_users` is reached
/// - `Conflict` when the candidate was already converted or its email
///   belongs to an existing principal
/// - `Validation` for missing form fields or a designation outside the
///   chosen department
#[instrument(skip(db, scheme, ctx, form))]
pub async fn convert_to_employee(
    db: &DatabaseConnection,
    scheme: &EmployeeIdScheme,
    max_users: Option<u64>,
    ctx: &RequestContext,
    candidate_id: i64,
    form: &ConversionForm,
) -> Result<ConversionResult> {
    validate_form(form).into_result()?;

    let txn = db.begin().await?;

    let candidate = Candidate::find_by_id(candidate_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;
    if candidate.status != CandidateStatus::Hired {
        return Err(Error::InvalidState {
            message: "Only hired candidates can be converted to employees.".to_string(),
        });
    }
    if candidate.is_employee {
        return Err(Error::Conflict {
            message: "This candidate has already been converted to an employee.".to_string(),
        });
    }
    ensure_capacity(&txn, max_users).await?;

    let mut errors = FieldErrors::new();
    let placement = Placement {
        branch_id: form.branch_id,
        department_id: form.department_id,
        designation_id: form.designation_id,
        shift_id: form.shift_id,
        attendance_policy_id: form.attendance_policy_id,
    };
    validate_placement(&txn, placement, &mut errors).await?;
    errors.into_result()?;

    let input = employee_input_from(&candidate, form);
    let record = insert_employee_record(&txn, scheme, &input, EmploymentStatus::Active).await?;

    let mut active: candidate::ActiveModel = candidate.into();
    active.is_employee = Set(true);
    active.updated_at = Set(Utc::now());
    let candidate = active.update(&txn).await?;

    txn.commit().await?;

    info!(
        "Candidate {} converted to employee {} by {}",
        candidate.id,
        record.employee.employee_id,
        ctx.principal.as_ref().map_or("system", |p| p.email.as_str())
    );
    Ok(ConversionResult {
        employee: record.employee,
        principal: record.principal,
        candidate,
    })
}
