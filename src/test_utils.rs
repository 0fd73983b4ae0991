//! Shared test utilities for `StaffDesk`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::{EmployeeIdScheme, Settings},
    core::{
        candidate::{self, CandidateInput},
        context::{RequestContext, permissions},
        employee::{self, EmployeeInput},
    },
    entities::{
        CandidateModel, CandidateStatus, EmployeeModel, OfferStatus, PrincipalKind, PrincipalModel,
        PrincipalStatus, VerificationStatus, branch, department, designation, document_type,
        employee as employee_entity, employee_document, job_posting,
        lifecycle::{award, promotion, warning},
        offer, offer_template, principal, role,
    },
    errors::Result,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default settings pinned to UTC so "today" does not depend on the host.
#[must_use]
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.app.utc_offset_minutes = Some(0);
    settings
}

/// The instant every fixture context is evaluated at: 2026-02-15 10:00 UTC.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 15, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A system context holding every permission, at [`test_now`].
#[must_use]
pub fn test_context() -> RequestContext {
    RequestContext::system(&test_settings(), test_now()).with_permissions(&permissions::ALL)
}

/// A context acting as `principal` at `now`, holding every permission.
#[must_use]
pub fn context_at(principal: &PrincipalModel, now: DateTime<Utc>) -> RequestContext {
    let mut ctx = RequestContext::system(&test_settings(), now).with_permissions(&permissions::ALL);
    ctx.principal = Some(principal.clone());
    ctx
}

/// Ids of the reference rows inserted by [`seed_test_reference`].
#[derive(Debug, Clone, Copy)]
pub struct TestReference {
    pub branch_id: i64,
    /// Engineering
    pub department_id: i64,
    /// Backend Engineer, in Engineering
    pub designation_id: i64,
    /// Recruiter, in People Ops
    pub other_designation_id: i64,
    pub job_id: i64,
    pub template_id: i64,
    /// Passport
    pub document_type_id: i64,
    /// Holds `manage-candidates` and `send-offers`
    pub recruiter_role_id: i64,
}

/// Inserts a small set of reference data.
///
/// # Defaults
/// * Branch "Head Office"
/// * Departments "Engineering" and "People Ops", one designation each
/// * Job "ENG-001" titled "Backend Engineer"
/// * Template "Standard" using the candidate, salary and date placeholders
/// * Document type "Passport" and role "Recruiter"
pub async fn seed_test_reference(db: &DatabaseConnection) -> Result<TestReference> {
    let branch = branch::ActiveModel {
        name: Set("Head Office".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let engineering = department::ActiveModel {
        name: Set("Engineering".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let people = department::ActiveModel {
        name: Set("People Ops".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let backend = designation::ActiveModel {
        name: Set("Backend Engineer".to_string()),
        department_id: Set(engineering.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let recruiter = designation::ActiveModel {
        name: Set("Recruiter".to_string()),
        department_id: Set(people.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let job = job_posting::ActiveModel {
        job_code: Set("ENG-001".to_string()),
        title: Set("Backend Engineer".to_string()),
        location: Set(Some("Remote".to_string())),
        job_type: Set(Some("full_time".to_string())),
        department_id: Set(Some(engineering.id)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let template = offer_template::ActiveModel {
        name: Set("Standard".to_string()),
        body: Set("Dear {candidate_name},\n\nWe are pleased to offer you the role of \
                   {job_title} at {company_name} with an annual salary of {salary}, \
                   starting {start_date}. This offer expires on {expiration_date}."
            .to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let passport = document_type::ActiveModel {
        name: Set("Passport".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let recruiter_role = role::ActiveModel {
        name: Set("Recruiter".to_string()),
        permissions: Set(serde_json::json!([
            permissions::MANAGE_CANDIDATES,
            permissions::SEND_OFFERS
        ])),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(TestReference {
        branch_id: branch.id,
        department_id: engineering.id,
        designation_id: backend.id,
        other_designation_id: recruiter.id,
        job_id: job.id,
        template_id: template.id,
        document_type_id: passport.id,
        recruiter_role_id: recruiter_role.id,
    })
}

/// Creates an employee (and its principal) through the regular create path.
///
/// # Defaults
/// * `date_of_joining`: 2026-01-05
/// * no placement, no password
pub async fn create_test_employee(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> Result<EmployeeModel> {
    let input = EmployeeInput {
        name: name.to_string(),
        email: email.to_string(),
        date_of_joining: NaiveDate::from_ymd_opt(2026, 1, 5),
        ..Default::default()
    };
    let record = employee::create_employee(db, &EmployeeIdScheme::default(), None, &input).await?;
    Ok(record.employee)
}

/// Creates a standalone active administrator without a password.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> Result<PrincipalModel> {
    let now = Utc::now();
    let user = principal::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(None),
        status: Set(PrincipalStatus::Active),
        kind: Set(PrincipalKind::Admin),
        role_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(user)
}

/// Sets `date_of_exit` directly, bypassing form validation.
pub async fn set_exit_date(
    db: &DatabaseConnection,
    employee: &EmployeeModel,
    date: NaiveDate,
) -> Result<EmployeeModel> {
    let mut active: employee_entity::ActiveModel = employee.clone().into();
    active.date_of_exit = Set(Some(date));
    Ok(active.update(db).await?)
}

/// Sets `date_of_joining` directly, bypassing form validation.
pub async fn set_joining_date(
    db: &DatabaseConnection,
    employee: &EmployeeModel,
    date: NaiveDate,
) -> Result<EmployeeModel> {
    let mut active: employee_entity::ActiveModel = employee.clone().into();
    active.date_of_joining = Set(date);
    Ok(active.update(db).await?)
}

/// A minimal valid candidate form with status New.
#[must_use]
pub fn sample_candidate_input(first: &str, last: &str, email: &str) -> CandidateInput {
    CandidateInput {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        status: Some(CandidateStatus::New.as_str().to_string()),
        ..Default::default()
    }
}

/// Creates a candidate with status New.
pub async fn create_test_candidate(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    first: &str,
    last: &str,
    email: &str,
) -> Result<CandidateModel> {
    candidate::create_candidate(db, ctx, &sample_candidate_input(first, last, email)).await
}

/// An unsaved candidate model, for pure functions.
#[must_use]
pub fn sample_candidate_model() -> CandidateModel {
    let now = test_now();
    CandidateModel {
        id: 1,
        first_name: "Alice".to_string(),
        last_name: "Ng".to_string(),
        email: "a@x.com".to_string(),
        phone: None,
        job_id: None,
        source_id: None,
        referral_employee_id: None,
        sourced_by: None,
        experience_years: 0,
        current_salary: None,
        expected_salary: None,
        final_salary: None,
        notice_period: None,
        languages_known: None,
        gender: None,
        date_of_birth: None,
        address: None,
        city: None,
        state: None,
        country: None,
        zip_code: None,
        resume_path: None,
        cover_letter_path: None,
        cover_letter_message: None,
        custom_question: None,
        status: CandidateStatus::New,
        is_archive: false,
        is_employee: false,
        application_date: now.date_naive(),
        rating: 0,
        terms_condition_check: false,
        created_at: now,
        updated_at: now,
    }
}

/// Inserts a sent offer directly.
///
/// # Defaults
/// * salary 60000, start 2026-03-01, expiration 2026-03-15
pub async fn insert_test_offer(
    db: &DatabaseConnection,
    candidate_id: i64,
    template_id: i64,
    pdf_path: Option<String>,
) -> Result<offer::Model> {
    let now = Utc::now();
    let row = offer::ActiveModel {
        candidate_id: Set(candidate_id),
        offer_template_id: Set(template_id),
        salary: Set(Decimal::from(60_000)),
        start_date: Set(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default()),
        expiration_date: Set(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap_or_default()),
        message: Set(None),
        status: Set(OfferStatus::Sent),
        pdf_path: Set(pdf_path),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row)
}

/// Inserts a pending document pointing at an existing file handle.
pub async fn insert_test_document(
    db: &DatabaseConnection,
    employee_id: i64,
    document_type_id: i64,
    handle: &str,
) -> Result<employee_document::Model> {
    let now = Utc::now();
    let row = employee_document::ActiveModel {
        employee_id: Set(employee_id),
        document_type_id: Set(document_type_id),
        file_path: Set(handle.to_string()),
        original_name: Set("scan.pdf".to_string()),
        mime_type: Set(Some("application/pdf".to_string())),
        notes: Set(None),
        verification_status: Set(VerificationStatus::Pending),
        expiry_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row)
}

/// Inserts an award ("Employee of the Month", gift "Voucher").
pub async fn insert_test_award(
    db: &DatabaseConnection,
    employee_id: i64,
    award_date: Option<NaiveDate>,
) -> Result<award::Model> {
    let row = award::ActiveModel {
        employee_id: Set(employee_id),
        award_type: Set(Some("Employee of the Month".to_string())),
        award_date: Set(award_date),
        gift: Set(Some("Voucher".to_string())),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row)
}

/// Inserts an approved promotion dated `promotion_date`.
pub async fn insert_test_promotion(
    db: &DatabaseConnection,
    employee_id: i64,
    promotion_date: Option<NaiveDate>,
) -> Result<promotion::Model> {
    let row = promotion::ActiveModel {
        employee_id: Set(employee_id),
        previous_designation_id: Set(None),
        new_designation_id: Set(None),
        promotion_date: Set(promotion_date),
        effective_date: Set(None),
        reason: Set(Some("Performance".to_string())),
        status: Set("approved".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row)
}

/// Inserts an open warning dated `warning_date`.
pub async fn insert_test_warning(
    db: &DatabaseConnection,
    employee_id: i64,
    warning_date: Option<NaiveDate>,
) -> Result<warning::Model> {
    let row = warning::ActiveModel {
        employee_id: Set(employee_id),
        warning_date: Set(warning_date),
        subject: Set("Late arrival".to_string()),
        status: Set("open".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row)
}
