//! Employee records.
//!
//! An employee row is owned 1:1 by a principal of kind employee; the name and
//! official email live on the principal. Creating an employee allocates the
//! next employee id and creates the principal in the same transaction.

use crate::{
    config::EmployeeIdScheme,
    core::{
        candidate::{follow_employee_email, release_converted},
        pagination::{Page, PageRequest, fetch_page},
        sequence::allocate_employee_id,
        session::terminate_all_sessions,
        timeline::{TimelineEvent, employee_timeline},
        user::{MIN_PASSWORD_LENGTH, ensure_capacity, hash_password},
    },
    entities::{
        AttendancePolicy, Branch, Candidate, Department, Designation, Employee,
        EmployeeDocument, EmployeeDocumentModel, EmployeeModel, EmploymentStatus, Principal,
        PrincipalKind, PrincipalModel, PrincipalStatus, Shift, candidate, department,
        designation, employee, employee_document,
        lifecycle::{
            asset_assignment, award, complaint, promotion, resignation, termination, training,
            transfer, warning,
        },
        principal,
    },
    errors::{Error, FieldErrors, Result},
    services::FileStore,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, JoinType, PaginatorTrait, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Employee form fields, including the owning principal's name and email.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeInput {
    pub name: String,
    pub email: String,
    /// Sets the login password when present
    pub password: Option<String>,
    pub branch_id: Option<i64>,
    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
    pub shift_id: Option<i64>,
    pub attendance_policy_id: Option<i64>,
    /// Defaults to `active`
    pub employment_status: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    pub date_of_exit: Option<NaiveDate>,
    pub base_salary: Option<Decimal>,
    pub personal_email: Option<String>,
    pub phone: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub national_id: Option<String>,
    pub tax_id: Option<String>,
    pub provident_fund_id: Option<String>,
    pub bank_name: Option<String>,
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_identifier_code: Option<String>,
    pub bank_branch: Option<String>,
    pub qualification: Option<String>,
    pub blood_group: Option<String>,
    pub process: Option<String>,
}

/// An employee together with its owning principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    pub employee: EmployeeModel,
    pub principal: PrincipalModel,
}

/// Employee show page.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDetail {
    pub employee: EmployeeModel,
    pub principal: PrincipalModel,
    pub department: Option<department::Model>,
    pub designation: Option<designation::Model>,
    pub documents: Vec<EmployeeDocumentModel>,
    pub timeline: Vec<TimelineEvent>,
}

/// Index filters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EmployeeFilters {
    /// Matches name, email or employee id
    pub search: Option<String>,
    pub department_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub employment_status: Option<String>,
}

/// Branch, department, designation, shift and policy chosen on a form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub branch_id: Option<i64>,
    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
    pub shift_id: Option<i64>,
    pub attendance_policy_id: Option<i64>,
}

impl EmployeeInput {
    fn placement(&self) -> Placement {
        Placement {
            branch_id: self.branch_id,
            department_id: self.department_id,
            designation_id: self.designation_id,
            shift_id: self.shift_id,
            attendance_policy_id: self.attendance_policy_id,
        }
    }
}

/// Checks that every chosen reference exists and that the designation
/// belongs to the chosen department.
pub async fn validate_placement<C>(db: &C, placement: Placement, errors: &mut FieldErrors) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(id) = placement.branch_id {
        if Branch::find_by_id(id).count(db).await? == 0 {
            errors.add("branch_id", "The selected branch id is invalid.");
        }
    }
    if let Some(id) = placement.shift_id {
        if Shift::find_by_id(id).count(db).await? == 0 {
            errors.add("shift_id", "The selected shift id is invalid.");
        }
    }
    if let Some(id) = placement.attendance_policy_id {
        if AttendancePolicy::find_by_id(id).count(db).await? == 0 {
            errors.add("attendance_policy_id", "The selected attendance policy id is invalid.");
        }
    }

    let department = match placement.department_id {
        Some(id) => {
            let found = Department::find_by_id(id).one(db).await?;
            if found.is_none() {
                errors.add("department_id", "The selected department id is invalid.");
            }
            found
        }
        None => None,
    };
    if let Some(id) = placement.designation_id {
        match Designation::find_by_id(id).one(db).await? {
            None => errors.add("designation_id", "The selected designation id is invalid."),
            Some(designation) => match &department {
                Some(dept) if dept.id == designation.department_id => {}
                Some(_) => errors.add(
                    "designation_id",
                    "The selected designation does not belong to the selected department.",
                ),
                None if placement.department_id.is_none() => {
                    errors.add("department_id", "The department id field is required when designation id is present.");
                }
                None => {}
            },
        }
    }
    Ok(())
}

fn parse_employment_status(raw: Option<&str>, errors: &mut FieldErrors) -> EmploymentStatus {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => EmploymentStatus::Active,
        Some(s) => s.parse().unwrap_or_else(|_| {
            errors.add("employment_status", "The selected employment status is invalid.");
            EmploymentStatus::Active
        }),
    }
}

async fn email_taken<C>(db: &C, email: &str, except_principal: Option<i64>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = Principal::find().filter(principal::Column::Email.eq(email));
    if let Some(id) = except_principal {
        query = query.filter(principal::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Validates an employee form. `principal_id` is the record being edited.
async fn validate_input<C>(
    db: &C,
    input: &EmployeeInput,
    principal_id: Option<i64>,
) -> Result<EmploymentStatus>
where
    C: ConnectionTrait,
{
    let mut errors = FieldErrors::new();
    if input.name.trim().is_empty() {
        errors.add("name", "The name field is required.");
    }
    let email = input.email.trim();
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !crate::core::candidate::is_valid_email(email) {
        errors.add("email", "The email must be a valid email address.");
    }
    if let Some(password) = &input.password {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("The password must be at least {MIN_PASSWORD_LENGTH} characters."),
            );
        }
    }
    match input.date_of_joining {
        None => errors.add("date_of_joining", "The date of joining field is required."),
        Some(joining) => {
            if input.date_of_exit.is_some_and(|exit| exit < joining) {
                errors.add(
                    "date_of_exit",
                    "The date of exit must be a date after or equal to date of joining.",
                );
            }
        }
    }
    if input.base_salary.is_some_and(|s| s.is_sign_negative()) {
        errors.add("base_salary", "The base salary must be at least 0.");
    }
    let status = parse_employment_status(input.employment_status.as_deref(), &mut errors);

    if errors.is_empty() {
        if email_taken(db, email, principal_id).await? {
            errors.add("email", "The email has already been taken.");
        }
        validate_placement(db, input.placement(), &mut errors).await?;
    }
    errors.into_result()?;
    Ok(status)
}

fn clean(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Copies the form's employee fields onto an active model.
fn apply_fields(active: &mut employee::ActiveModel, input: &EmployeeInput, status: EmploymentStatus) {
    active.branch_id = Set(input.branch_id);
    active.department_id = Set(input.department_id);
    active.designation_id = Set(input.designation_id);
    active.shift_id = Set(input.shift_id);
    active.attendance_policy_id = Set(input.attendance_policy_id);
    active.employment_status = Set(status);
    active.date_of_birth = Set(input.date_of_birth);
    active.gender = Set(clean(input.gender.as_ref()));
    active.date_of_exit = Set(input.date_of_exit);
    active.base_salary = Set(input.base_salary);
    active.personal_email = Set(clean(input.personal_email.as_ref()));
    active.phone = Set(clean(input.phone.as_ref()));
    active.address_line_1 = Set(clean(input.address_line_1.as_ref()));
    active.address_line_2 = Set(clean(input.address_line_2.as_ref()));
    active.city = Set(clean(input.city.as_ref()));
    active.state = Set(clean(input.state.as_ref()));
    active.country = Set(clean(input.country.as_ref()));
    active.postal_code = Set(clean(input.postal_code.as_ref()));
    active.emergency_contact_name = Set(clean(input.emergency_contact_name.as_ref()));
    active.emergency_contact_number = Set(clean(input.emergency_contact_number.as_ref()));
    active.emergency_contact_relationship =
        Set(clean(input.emergency_contact_relationship.as_ref()));
    active.national_id = Set(clean(input.national_id.as_ref()));
    active.tax_id = Set(clean(input.tax_id.as_ref()));
    active.provident_fund_id = Set(clean(input.provident_fund_id.as_ref()));
    active.bank_name = Set(clean(input.bank_name.as_ref()));
    active.account_holder_name = Set(clean(input.account_holder_name.as_ref()));
    active.account_number = Set(clean(input.account_number.as_ref()));
    active.bank_identifier_code = Set(clean(input.bank_identifier_code.as_ref()));
    active.bank_branch = Set(clean(input.bank_branch.as_ref()));
    active.qualification = Set(clean(input.qualification.as_ref()));
    active.blood_group = Set(clean(input.blood_group.as_ref()));
    active.process = Set(clean(input.process.as_ref()));
}

/// Inserts the principal and employee rows for an already validated form.
///
/// Must run inside the caller's transaction. An email already held by any
/// principal is a `Conflict`.
pub(crate) async fn insert_employee_record<C>(
    db: &C,
    scheme: &EmployeeIdScheme,
    input: &EmployeeInput,
    status: EmploymentStatus,
) -> Result<EmployeeRecord>
where
    C: ConnectionTrait,
{
    let email = input.email.trim();
    if email_taken(db, email, None).await? {
        return Err(Error::Conflict {
            message: format!("The email {email} is already in use."),
        });
    }
    let date_of_joining = input
        .date_of_joining
        .ok_or_else(|| Error::field("date_of_joining", "The date of joining field is required."))?;
    let password_hash = match &input.password {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    let employee_id = allocate_employee_id(db, scheme).await?;
    let now = Utc::now();

    let principal = principal::ActiveModel {
        name: Set(input.name.trim().to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        status: Set(PrincipalStatus::Active),
        kind: Set(PrincipalKind::Employee),
        role_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut active = employee::ActiveModel {
        principal_id: Set(principal.id),
        employee_id: Set(employee_id.clone()),
        biometric_emp_id: Set(employee_id),
        date_of_joining: Set(date_of_joining),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    apply_fields(&mut active, input, status);
    let employee = active.insert(db).await?;

    Ok(EmployeeRecord { employee, principal })
}

/// Creates an employee and its principal.
///
/// # Errors
/// - `InvalidState` when the plan's `max_users` is reached
/// - `Validation` for missing fields, a taken email, unknown references or a
///   designation outside the chosen department
/// - Database errors; nothing is written on failure
#[instrument(skip(db, scheme, input), fields(email = %input.email))]
pub async fn create_employee(
    db: &DatabaseConnection,
    scheme: &EmployeeIdScheme,
    max_users: Option<u64>,
    input: &EmployeeInput,
) -> Result<EmployeeRecord> {
    let txn = db.begin().await?;
    ensure_capacity(&txn, max_users).await?;
    let status = validate_input(&txn, input, None).await?;
    let record = insert_employee_record(&txn, scheme, input, status).await?;
    txn.commit().await?;

    info!(
        "Created employee {} ({})",
        record.employee.employee_id, record.principal.name
    );
    Ok(record)
}

/// Retrieves an employee and its principal.
pub async fn get_employee<C>(db: &C, id: i64) -> Result<EmployeeRecord>
where
    C: ConnectionTrait,
{
    let (employee, principal) = Employee::find_by_id(id)
        .find_also_related(Principal)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Employee", id))?;
    let principal = principal.ok_or_else(|| Error::not_found("Principal", employee.principal_id))?;
    Ok(EmployeeRecord { employee, principal })
}

/// Updates an employee and its principal's name, email and password.
/// The employee id is never changed.
#[instrument(skip(db, input))]
pub async fn update_employee(
    db: &DatabaseConnection,
    id: i64,
    input: &EmployeeInput,
) -> Result<EmployeeRecord> {
    let txn = db.begin().await?;
    let current = get_employee(&txn, id).await?;
    let status = validate_input(&txn, input, Some(current.principal.id)).await?;
    follow_employee_email(&txn, &current.principal.email, input.email.trim()).await?;

    let mut principal: principal::ActiveModel = current.principal.into();
    principal.name = Set(input.name.trim().to_string());
    principal.email = Set(input.email.trim().to_string());
    if let Some(password) = &input.password {
        principal.password_hash = Set(Some(hash_password(password).await?));
    }
    principal.updated_at = Set(Utc::now());
    let principal = principal.update(&txn).await?;

    let mut active: employee::ActiveModel = current.employee.into();
    apply_fields(&mut active, input, status);
    if let Some(joining) = input.date_of_joining {
        active.date_of_joining = Set(joining);
    }
    active.updated_at = Set(Utc::now());
    let employee = active.update(&txn).await?;

    txn.commit().await?;
    info!("Updated employee {}", employee.employee_id);
    Ok(EmployeeRecord { employee, principal })
}

/// Deletes an employee with its documents, lifecycle records, sessions and
/// owning principal. Referrals by this employee are cleared. Document files
/// are removed after commit, best effort.
#[instrument(skip(db, files))]
pub async fn delete_employee(
    db: &DatabaseConnection,
    files: &dyn FileStore,
    id: i64,
) -> Result<EmployeeRecord> {
    let txn = db.begin().await?;
    let record = get_employee(&txn, id).await?;

    let documents = EmployeeDocument::find()
        .filter(employee_document::Column::EmployeeId.eq(id))
        .all(&txn)
        .await?;
    EmployeeDocument::delete_many()
        .filter(employee_document::Column::EmployeeId.eq(id))
        .exec(&txn)
        .await?;

    award::Entity::delete_many().filter(award::Column::EmployeeId.eq(id)).exec(&txn).await?;
    promotion::Entity::delete_many().filter(promotion::Column::EmployeeId.eq(id)).exec(&txn).await?;
    transfer::Entity::delete_many().filter(transfer::Column::EmployeeId.eq(id)).exec(&txn).await?;
    warning::Entity::delete_many().filter(warning::Column::EmployeeId.eq(id)).exec(&txn).await?;
    complaint::Entity::delete_many().filter(complaint::Column::EmployeeId.eq(id)).exec(&txn).await?;
    resignation::Entity::delete_many()
        .filter(resignation::Column::EmployeeId.eq(id))
        .exec(&txn)
        .await?;
    termination::Entity::delete_many()
        .filter(termination::Column::EmployeeId.eq(id))
        .exec(&txn)
        .await?;
    asset_assignment::Entity::delete_many()
        .filter(asset_assignment::Column::EmployeeId.eq(id))
        .exec(&txn)
        .await?;
    training::Entity::delete_many().filter(training::Column::EmployeeId.eq(id)).exec(&txn).await?;

    let referred = Candidate::find()
        .filter(candidate::Column::ReferralEmployeeId.eq(id))
        .all(&txn)
        .await?;
    for referral in referred {
        let mut active: candidate::ActiveModel = referral.into();
        active.referral_employee_id = Set(None);
        active.update(&txn).await?;
    }

    release_converted(&txn, &record.principal.email).await?;
    Employee::delete_by_id(id).exec(&txn).await?;
    terminate_all_sessions(&txn, record.principal.id).await?;
    Principal::delete_by_id(record.principal.id).exec(&txn).await?;
    txn.commit().await?;

    for document in documents {
        if let Err(e) = files.delete(&document.file_path).await {
            warn!("Failed to remove document file {}: {}", document.file_path, e);
        }
    }
    info!("Deleted employee {}", record.employee.employee_id);
    Ok(record)
}

/// Flips the owning principal between active and inactive. Deactivation
/// ends the principal's sessions.
#[instrument(skip(db))]
pub async fn toggle_employee_status(db: &DatabaseConnection, id: i64) -> Result<EmployeeRecord> {
    let txn = db.begin().await?;
    let record = get_employee(&txn, id).await?;

    let next = record.principal.status.toggled();
    let principal_id = record.principal.id;
    let mut active: principal::ActiveModel = record.principal.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now());
    let principal = active.update(&txn).await?;
    if next == PrincipalStatus::Inactive {
        terminate_all_sessions(&txn, principal_id).await?;
    }

    txn.commit().await?;
    info!("Employee {} is now {}", record.employee.employee_id, next);
    Ok(EmployeeRecord {
        employee: record.employee,
        principal,
    })
}

/// Paginated employee index, newest first.
pub async fn list_employees<C>(
    db: &C,
    filters: &EmployeeFilters,
    page: PageRequest,
) -> Result<Page<EmployeeRecord>>
where
    C: ConnectionTrait,
{
    let mut select = Employee::find().join(JoinType::InnerJoin, employee::Relation::Principal.def());

    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(principal::Column::Name.contains(term))
                .add(principal::Column::Email.contains(term))
                .add(employee::Column::EmployeeId.contains(term)),
        );
    }
    if let Some(id) = filters.department_id {
        select = select.filter(employee::Column::DepartmentId.eq(id));
    }
    if let Some(id) = filters.branch_id {
        select = select.filter(employee::Column::BranchId.eq(id));
    }
    if let Some(raw) = filters.employment_status.as_deref().filter(|s| !s.is_empty()) {
        let status: EmploymentStatus = raw.parse().map_err(|_| {
            Error::field("employment_status", "The selected employment status is invalid.")
        })?;
        select = select.filter(employee::Column::EmploymentStatus.eq(status));
    }
    select = select.order_by_desc(employee::Column::Id);

    let page = fetch_page(db, select, page).await?;
    let principal_ids: Vec<i64> = page.items.iter().map(|e| e.principal_id).collect();
    let mut principals: HashMap<i64, PrincipalModel> = Principal::find()
        .filter(principal::Column::Id.is_in(principal_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut records = Vec::with_capacity(page.items.len());
    let Page {
        items,
        page: number,
        per_page,
        total,
        last_page,
    } = page;
    for employee in items {
        if let Some(principal) = principals.remove(&employee.principal_id) {
            records.push(EmployeeRecord { employee, principal });
        }
    }
    Ok(Page {
        items: records,
        page: number,
        per_page,
        total,
        last_page,
    })
}

/// Loads the employee show page, including documents and the timeline.
pub async fn employee_detail<C>(db: &C, id: i64) -> Result<EmployeeDetail>
where
    C: ConnectionTrait,
{
    let EmployeeRecord { employee, principal } = get_employee(db, id).await?;
    let department = match employee.department_id {
        Some(id) => Department::find_by_id(id).one(db).await?,
        None => None,
    };
    let designation = match employee.designation_id {
        Some(id) => Designation::find_by_id(id).one(db).await?,
        None => None,
    };
    let documents = EmployeeDocument::find()
        .filter(employee_document::Column::EmployeeId.eq(id))
        .order_by_desc(employee_document::Column::Id)
        .all(db)
        .await?;
    let timeline = employee_timeline(db, id).await?;

    Ok(EmployeeDetail {
        employee,
        principal,
        department,
        designation,
        documents,
        timeline,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::session::open_session;
    use crate::entities::Session;
    use crate::services::MemoryFileStore;
    use crate::test_utils::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(name: &str, email: &str) -> EmployeeInput {
        EmployeeInput {
            name: name.to_string(),
            email: email.to_string(),
            date_of_joining: Some(date(2026, 1, 5)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_allocates_id_and_principal() -> Result<()> {
        let db = setup_test_db().await?;
        let reference = seed_test_reference(&db).await?;
        let scheme = EmployeeIdScheme::default();

        let mut input = form("Priya Nair", "priya@example.com");
        input.department_id = Some(reference.department_id);
        input.designation_id = Some(reference.designation_id);
        input.password = Some("correct horse".to_string());
        let record = create_employee(&db, &scheme, None, &input).await?;

        assert_eq!(record.employee.employee_id, "EMP0001");
        assert_eq!(record.employee.biometric_emp_id, "EMP0001");
        assert_eq!(record.employee.employment_status, EmploymentStatus::Active);
        assert_eq!(record.principal.kind, PrincipalKind::Employee);
        assert!(record.principal.password_hash.is_some());

        let second = create_employee(&db, &scheme, None, &form("Jon Roe", "jon@example.com")).await?;
        assert_eq!(second.employee.employee_id, "EMP0002");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let reference = seed_test_reference(&db).await?;
        let scheme = EmployeeIdScheme::default();
        create_employee(&db, &scheme, None, &form("Priya Nair", "priya@example.com")).await?;

        let mut bad = form("Priya Again", "priya@example.com");
        bad.department_id = Some(reference.department_id);
        bad.designation_id = Some(reference.other_designation_id);
        let Err(Error::Validation { errors }) = create_employee(&db, &scheme, None, &bad).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("email"), Some("The email has already been taken."));
        assert_eq!(
            errors.get("designation_id"),
            Some("The selected designation does not belong to the selected department.")
        );

        let mut early_exit = form("Sam Poe", "sam@example.com");
        early_exit.date_of_exit = Some(date(2025, 12, 31));
        early_exit.date_of_joining = Some(date(2026, 1, 5));
        let Err(Error::Validation { errors }) = create_employee(&db, &scheme, None, &early_exit).await
        else {
            panic!("expected validation failure");
        };
        assert!(errors.get("date_of_exit").is_some());

        let mut no_joining = form("Sam Poe", "sam@example.com");
        no_joining.date_of_joining = None;
        assert!(matches!(
            create_employee(&db, &scheme, None, &no_joining).await,
            Err(Error::Validation { .. })
        ));
        // nothing but the first employee was written
        assert_eq!(Employee::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_toggle() -> Result<()> {
        let db = setup_test_db().await?;
        let scheme = EmployeeIdScheme::default();
        let record = create_employee(&db, &scheme, None, &form("Priya Nair", "priya@example.com")).await?;
        open_session(&db, record.principal.id, Utc::now()).await?;

        let mut edit = form("Priya N.", "priya.n@example.com");
        edit.blood_group = Some("O+".to_string());
        edit.employment_status = Some("probation".to_string());
        let updated = update_employee(&db, record.employee.id, &edit).await?;
        assert_eq!(updated.principal.name, "Priya N.");
        assert_eq!(updated.principal.email, "priya.n@example.com");
        assert_eq!(updated.employee.employee_id, record.employee.employee_id);
        assert_eq!(updated.employee.employment_status, EmploymentStatus::Probation);
        assert_eq!(updated.employee.blood_group.as_deref(), Some("O+"));

        let toggled = toggle_employee_status(&db, record.employee.id).await?;
        assert_eq!(toggled.principal.status, PrincipalStatus::Inactive);
        assert_eq!(Session::find().count(&db).await?, 0);
        let toggled = toggle_employee_status(&db, record.employee.id).await?;
        assert_eq!(toggled.principal.status, PrincipalStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();
        let reference = seed_test_reference(&db).await?;
        let files = MemoryFileStore::new();
        let scheme = EmployeeIdScheme::default();
        let record = create_employee(&db, &scheme, None, &form("Priya Nair", "priya@example.com")).await?;

        let handle = files.put("documents/1", "passport.pdf", b"scan".to_vec()).await?;
        insert_test_document(&db, record.employee.id, reference.document_type_id, &handle).await?;
        insert_test_award(&db, record.employee.id, Some(date(2026, 3, 10))).await?;
        let mut referred = sample_candidate_input("Ken", "Ito", "ken@example.com");
        referred.referral_employee_id = Some(record.employee.id);
        let referred = crate::core::candidate::create_candidate(&db, &ctx, &referred).await?;

        delete_employee(&db, &files, record.employee.id).await?;

        assert_eq!(Employee::find().count(&db).await?, 0);
        assert_eq!(Principal::find().count(&db).await?, 0);
        assert_eq!(EmployeeDocument::find().count(&db).await?, 0);
        assert_eq!(award::Entity::find().count(&db).await?, 0);
        assert!(!files.contains(&handle).await);
        let referred = Candidate::find_by_id(referred.id).one(&db).await?.unwrap();
        assert_eq!(referred.referral_employee_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let reference = seed_test_reference(&db).await?;
        let scheme = EmployeeIdScheme::default();

        let mut engineer = form("Priya Nair", "priya@example.com");
        engineer.department_id = Some(reference.department_id);
        let engineer = create_employee(&db, &scheme, None, &engineer).await?;
        let other = create_employee(&db, &scheme, None, &form("Jon Roe", "jon@corp.io")).await?;

        let all = list_employees(&db, &EmployeeFilters::default(), PageRequest::default()).await?;
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].employee.id, other.employee.id);

        let by_name = EmployeeFilters {
            search: Some("priya".to_string()),
            ..Default::default()
        };
        let found = list_employees(&db, &by_name, PageRequest::default()).await?;
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].principal.email, "priya@example.com");

        let by_code = EmployeeFilters {
            search: Some("EMP0002".to_string()),
            ..Default::default()
        };
        let found = list_employees(&db, &by_code, PageRequest::default()).await?;
        assert_eq!(found.items[0].employee.id, other.employee.id);

        let by_department = EmployeeFilters {
            department_id: Some(reference.department_id),
            ..Default::default()
        };
        let found = list_employees(&db, &by_department, PageRequest::default()).await?;
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].employee.id, engineer.employee.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_respects_user_limit() -> Result<()> {
        let db = setup_test_db().await?;
        let scheme = EmployeeIdScheme::default();
        create_employee(&db, &scheme, Some(1), &form("Priya Nair", "priya@example.com")).await?;

        let full = create_employee(&db, &scheme, Some(1), &form("Jon Roe", "jon@example.com")).await;
        assert!(matches!(full, Err(Error::InvalidState { .. })));
        assert_eq!(Employee::find().count(&db).await?, 1);
        assert_eq!(Principal::find().count(&db).await?, 1);

        create_employee(&db, &scheme, Some(2), &form("Jon Roe", "jon@example.com")).await?;
        Ok(())
    }
}
