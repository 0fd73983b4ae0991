//! Candidate store and status machine.
//!
//! Candidates move `New → Screening → Interview → Offer → Offered → Hired`,
//! with `Rejected` reachable from any non-terminal state. Operators pick the
//! next status freely; the store only checks membership and terminality, and
//! re-checks terminality inside the write transaction.

use crate::{
    core::{
        context::RequestContext,
        pagination::{Page, PageRequest, fetch_page},
        salary::{format_salary, parse_salary},
    },
    entities::{
        Candidate, CandidateModel, CandidateStatus, Employee, JobPosting, Offer, OfferTemplate,
        Principal, Source, candidate, job_posting, offer, offer_template, source,
    },
    errors::{Error, FieldErrors, Result},
    services::FileStore,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

const CONVERTED_EMAIL_MESSAGE: &str =
    "This candidate is an employee; change the email on the employee record.";
const STATUS_LOCKED_MESSAGE: &str =
    "Status cannot be changed once a candidate is Hired or Rejected.";

/// Editable candidate fields, as submitted by the create and edit forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CandidateInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_id: Option<i64>,
    pub source_id: Option<i64>,
    pub referral_employee_id: Option<i64>,
    pub sourced_by: Option<String>,
    pub experience_years: i32,
    pub current_salary: Option<String>,
    pub expected_salary: Option<String>,
    pub final_salary: Option<String>,
    pub notice_period: Option<String>,
    pub languages_known: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub cover_letter_message: Option<String>,
    pub custom_question: Option<BTreeMap<String, String>>,
    /// One of the candidate status strings
    pub status: Option<String>,
    pub is_archive: bool,
    /// Defaults to today on create
    pub application_date: Option<NaiveDate>,
    pub rating: i32,
    pub terms_condition_check: bool,
}

/// List filters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CandidateFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    pub job_id: Option<i64>,
    pub source_id: Option<i64>,
}

/// Sortable list columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSortField {
    #[default]
    ApplicationDate,
    FullName,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort selection for [`list_candidates`].
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CandidateSort {
    pub sort_field: CandidateSortField,
    pub sort_direction: SortDirection,
}

/// Who referred a candidate.
#[derive(Debug, Clone, Serialize)]
pub struct Referrer {
    pub id: i64,
    pub employee_id: String,
    pub name: String,
}

/// Candidate show page: the candidate, its references and offer history.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateDetail {
    pub candidate: CandidateModel,
    pub job: Option<job_posting::Model>,
    pub source: Option<source::Model>,
    pub referrer: Option<Referrer>,
    /// Newest first
    pub offers: Vec<offer::Model>,
    pub offer_templates: Vec<offer_template::Model>,
    /// Pre-fill for the offer form: final, then expected, then current salary
    pub default_offer_salary: Option<String>,
}

/// Loose `local@domain.tld` shape check.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn parse_status(raw: Option<&str>, errors: &mut FieldErrors) -> Option<CandidateStatus> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            errors.add("status", "The status field is required.");
            None
        }
        Some(s) => match s.parse::<CandidateStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                errors.add("status", "The selected status is invalid.");
                None
            }
        },
    }
}

/// Field checks that need no database access.
fn validate_fields(input: &CandidateInput, errors: &mut FieldErrors) -> Option<CandidateStatus> {
    if input.first_name.trim().is_empty() {
        errors.add("first_name", "The first name field is required.");
    }
    if input.last_name.trim().is_empty() {
        errors.add("last_name", "The last name field is required.");
    }
    let email = input.email.trim();
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !is_valid_email(email) {
        errors.add("email", "The email must be a valid email address.");
    }
    if input.experience_years < 0 {
        errors.add("experience_years", "The experience years must be at least 0.");
    }
    if !(0..=5).contains(&input.rating) {
        errors.add("rating", "The rating must be between 0 and 5.");
    }
    parse_status(input.status.as_deref(), errors)
}

/// Reference checks against the datastore.
async fn validate_references<C>(db: &C, input: &CandidateInput, errors: &mut FieldErrors) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(job_id) = input.job_id {
        if JobPosting::find_by_id(job_id).count(db).await? == 0 {
            errors.add("job_id", "The selected job id is invalid.");
        }
    }
    if let Some(source_id) = input.source_id {
        if Source::find_by_id(source_id).count(db).await? == 0 {
            errors.add("source_id", "The selected source id is invalid.");
        }
    }
    if let Some(referrer) = input.referral_employee_id {
        if Employee::find_by_id(referrer).count(db).await? == 0 {
            errors.add(
                "referral_employee_id",
                "The selected referral employee id is invalid.",
            );
        }
    }
    Ok(())
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Copies the editable fields onto an active model.
fn apply_input(active: &mut candidate::ActiveModel, input: &CandidateInput, status: CandidateStatus) {
    active.first_name = Set(input.first_name.trim().to_string());
    active.last_name = Set(input.last_name.trim().to_string());
    active.email = Set(input.email.trim().to_string());
    active.phone = Set(trimmed(input.phone.as_ref()));
    active.job_id = Set(input.job_id);
    active.source_id = Set(input.source_id);
    active.referral_employee_id = Set(input.referral_employee_id);
    active.sourced_by = Set(trimmed(input.sourced_by.as_ref()));
    active.experience_years = Set(input.experience_years);
    active.current_salary = Set(trimmed(input.current_salary.as_ref()));
    active.expected_salary = Set(trimmed(input.expected_salary.as_ref()));
    active.final_salary = Set(trimmed(input.final_salary.as_ref()));
    active.notice_period = Set(trimmed(input.notice_period.as_ref()));
    active.languages_known = Set(trimmed(input.languages_known.as_ref()));
    active.gender = Set(trimmed(input.gender.as_ref()));
    active.date_of_birth = Set(input.date_of_birth);
    active.address = Set(trimmed(input.address.as_ref()));
    active.city = Set(trimmed(input.city.as_ref()));
    active.state = Set(trimmed(input.state.as_ref()));
    active.country = Set(trimmed(input.country.as_ref()));
    active.zip_code = Set(trimmed(input.zip_code.as_ref()));
    active.cover_letter_message = Set(input.cover_letter_message.clone());
    active.custom_question = Set(input
        .custom_question
        .as_ref()
        .map(|answers| serde_json::json!(answers)));
    active.status = Set(status);
    active.is_archive = Set(input.is_archive);
    active.rating = Set(input.rating);
    active.terms_condition_check = Set(input.terms_condition_check);
    active.updated_at = Set(Utc::now());
}

/// Creates a candidate.
///
/// # Errors
/// - `Validation` when a required field is missing, the status is not one of
///   the candidate statuses, or a referenced job, source or employee is absent
/// - Database errors
#[instrument(skip(db, ctx, input), fields(email = %input.email))]
pub async fn create_candidate<C>(
    db: &C,
    ctx: &RequestContext,
    input: &CandidateInput,
) -> Result<CandidateModel>
where
    C: ConnectionTrait,
{
    let mut errors = FieldErrors::new();
    let status = validate_fields(input, &mut errors);
    if errors.is_empty() {
        validate_references(db, input, &mut errors).await?;
    }
    errors.into_result()?;
    let status = status.ok_or_else(|| Error::field("status", "The status field is required."))?;

    let now = Utc::now();
    let mut active = candidate::ActiveModel {
        is_employee: Set(false),
        application_date: Set(input.application_date.unwrap_or_else(|| ctx.today())),
        resume_path: Set(None),
        cover_letter_path: Set(None),
        created_at: Set(now),
        ..Default::default()
    };
    apply_input(&mut active, input, status);

    let created = active.insert(db).await?;
    info!("Created candidate {} ({})", created.id, created.full_name());
    Ok(created)
}

/// Retrieves a candidate by id.
pub async fn get_candidate<C>(db: &C, candidate_id: i64) -> Result<CandidateModel>
where
    C: ConnectionTrait,
{
    Candidate::find_by_id(candidate_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))
}

/// Replaces the editable fields of a candidate.
///
/// A status change follows the same rule as [`update_status`]: terminal
/// candidates keep their status. The check runs inside the transaction.
#[instrument(skip(db, input))]
pub async fn update_candidate(
    db: &DatabaseConnection,
    candidate_id: i64,
    input: &CandidateInput,
) -> Result<CandidateModel> {
    let mut errors = FieldErrors::new();
    let status = validate_fields(input, &mut errors);
    errors.into_result()?;
    let status = status.ok_or_else(|| Error::field("status", "The status field is required."))?;

    let txn = db.begin().await?;
    let current = get_candidate(&txn, candidate_id).await?;

    let mut errors = FieldErrors::new();
    validate_references(&txn, input, &mut errors).await?;
    errors.into_result()?;

    if status != current.status && current.status.is_terminal() {
        return Err(Error::InvalidState {
            message: STATUS_LOCKED_MESSAGE.to_string(),
        });
    }
    if current.is_employee && input.email.trim() != current.email {
        return Err(Error::field("email", CONVERTED_EMAIL_MESSAGE));
    }
    let application_date = input.application_date.unwrap_or(current.application_date);
    let mut active: candidate::ActiveModel = current.into();
    apply_input(&mut active, input, status);
    active.application_date = Set(application_date);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!("Updated candidate {}", updated.id);
    Ok(updated)
}

/// Moves a candidate to `new_status`.
///
/// # Errors
/// - `Validation` if `new_status` is not a candidate status
/// - `InvalidState` if the candidate is Hired or Rejected
/// - `NotFound` if the candidate does not exist
#[instrument(skip(db))]
pub async fn update_status(
    db: &DatabaseConnection,
    candidate_id: i64,
    new_status: &str,
) -> Result<CandidateModel> {
    let mut errors = FieldErrors::new();
    let status = parse_status(Some(new_status), &mut errors);
    errors.into_result()?;
    let status = status.ok_or_else(|| Error::field("status", "The selected status is invalid."))?;

    let txn = db.begin().await?;
    let current = get_candidate(&txn, candidate_id).await?;
    if current.status.is_terminal() {
        return Err(Error::InvalidState {
            message: STATUS_LOCKED_MESSAGE.to_string(),
        });
    }

    let previous = current.status;
    let mut active: candidate::ActiveModel = current.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        "Candidate {} status changed from {} to {}",
        candidate_id, previous, status
    );
    Ok(updated)
}

/// Deletes a candidate and its offers, then removes stored files.
///
/// File removal happens after commit and is best effort; failures are logged.
#[instrument(skip(db, files))]
pub async fn delete_candidate(
    db: &DatabaseConnection,
    files: &dyn FileStore,
    candidate_id: i64,
) -> Result<CandidateModel> {
    let txn = db.begin().await?;
    let current = get_candidate(&txn, candidate_id).await?;

    let offers = Offer::find()
        .filter(offer::Column::CandidateId.eq(candidate_id))
        .all(&txn)
        .await?;
    Offer::delete_many()
        .filter(offer::Column::CandidateId.eq(candidate_id))
        .exec(&txn)
        .await?;
    Candidate::delete_by_id(candidate_id).exec(&txn).await?;
    txn.commit().await?;

    let handles = offers
        .into_iter()
        .filter_map(|o| o.pdf_path)
        .chain(current.resume_path.clone())
        .chain(current.cover_letter_path.clone());
    for handle in handles {
        if let Err(e) = files.delete(&handle).await {
            warn!("Failed to remove file {} of candidate {}: {}", handle, candidate_id, e);
        }
    }

    info!("Deleted candidate {}", candidate_id);
    Ok(current)
}

/// Moves the email of the converted candidate behind `old_email` to
/// `new_email`, so the candidate keeps pointing at its employee.
pub(crate) async fn follow_employee_email<C>(db: &C, old_email: &str, new_email: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    if old_email == new_email {
        return Ok(());
    }
    Candidate::update_many()
        .col_expr(candidate::Column::Email, Expr::value(new_email))
        .col_expr(candidate::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(candidate::Column::IsEmployee.eq(true))
        .filter(candidate::Column::Email.eq(old_email))
        .exec(db)
        .await?;
    Ok(())
}

/// Clears `is_employee` on the candidate converted into the employee whose
/// principal had `email`. The candidate stays Hired and can be converted again.
pub(crate) async fn release_converted<C>(db: &C, email: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let released = Candidate::update_many()
        .col_expr(candidate::Column::IsEmployee, Expr::value(false))
        .col_expr(candidate::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(candidate::Column::IsEmployee.eq(true))
        .filter(candidate::Column::Email.eq(email))
        .exec(db)
        .await?;
    if released.rows_affected > 0 {
        info!("Released converted candidate with email {}", email);
    }
    Ok(())
}

/// Lists candidates with search, filters, sorting and pagination.
///
/// Search matches substrings of first name, last name, email and
/// "first last". Ties in the sort column break by id descending.
pub async fn list_candidates<C>(
    db: &C,
    filters: &CandidateFilters,
    sort: CandidateSort,
    page: PageRequest,
) -> Result<Page<CandidateModel>>
where
    C: ConnectionTrait,
{
    let mut select = Candidate::find();

    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let full_name = Expr::cust_with_values(
            "(\"first_name\" || ' ' || \"last_name\") LIKE ?",
            [format!("%{term}%")],
        );
        select = select.filter(
            Condition::any()
                .add(candidate::Column::FirstName.contains(term))
                .add(candidate::Column::LastName.contains(term))
                .add(candidate::Column::Email.contains(term))
                .add(full_name),
        );
    }
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        let status: CandidateStatus = status
            .parse()
            .map_err(|_| Error::field("status", "The selected status is invalid."))?;
        select = select.filter(candidate::Column::Status.eq(status));
    }
    if let Some(job_id) = filters.job_id {
        select = select.filter(candidate::Column::JobId.eq(job_id));
    }
    if let Some(source_id) = filters.source_id {
        select = select.filter(candidate::Column::SourceId.eq(source_id));
    }

    let order = match sort.sort_direction {
        SortDirection::Asc => sea_orm::Order::Asc,
        SortDirection::Desc => sea_orm::Order::Desc,
    };
    select = match sort.sort_field {
        CandidateSortField::ApplicationDate => {
            select.order_by(candidate::Column::ApplicationDate, order)
        }
        CandidateSortField::FullName => select
            .order_by(candidate::Column::FirstName, order.clone())
            .order_by(candidate::Column::LastName, order),
        CandidateSortField::Status => select.order_by(candidate::Column::Status, order),
    };
    select = select.order_by_desc(candidate::Column::Id);

    fetch_page(db, select, page).await
}

/// Salary to pre-fill on the offer form, normalised when it parses.
#[must_use]
pub fn default_offer_salary(candidate: &CandidateModel) -> Option<String> {
    [
        &candidate.final_salary,
        &candidate.expected_salary,
        &candidate.current_salary,
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.trim().is_empty())
    .map(|raw| parse_salary(raw).map_or_else(|| raw.clone(), format_salary))
}

/// Loads the candidate show page.
pub async fn candidate_detail<C>(db: &C, candidate_id: i64) -> Result<CandidateDetail>
where
    C: ConnectionTrait,
{
    let candidate = get_candidate(db, candidate_id).await?;

    let job = match candidate.job_id {
        Some(id) => JobPosting::find_by_id(id).one(db).await?,
        None => None,
    };
    let source = match candidate.source_id {
        Some(id) => Source::find_by_id(id).one(db).await?,
        None => None,
    };
    let referrer = match candidate.referral_employee_id {
        Some(id) => Employee::find_by_id(id)
            .find_also_related(Principal)
            .one(db)
            .await?
            .map(|(employee, principal)| Referrer {
                id: employee.id,
                employee_id: employee.employee_id,
                name: principal.map(|p| p.name).unwrap_or_default(),
            }),
        None => None,
    };

    let offers = Offer::find()
        .filter(offer::Column::CandidateId.eq(candidate_id))
        .order_by_desc(offer::Column::CreatedAt)
        .order_by_desc(offer::Column::Id)
        .all(db)
        .await?;
    let offer_templates = OfferTemplate::find()
        .order_by_asc(offer_template::Column::Name)
        .all(db)
        .await?;

    Ok(CandidateDetail {
        default_offer_salary: default_offer_salary(&candidate),
        candidate,
        job,
        source,
        referrer,
        offers,
        offer_templates,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::services::MemoryFileStore;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn input(first: &str, last: &str, email: &str, status: &str) -> CandidateInput {
        CandidateInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@@x.com"));
    }

    #[tokio::test]
    async fn test_create_validation_before_database() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = test_context();

        let mut bad = input("", "Ng", "not-an-email", "Maybe");
        bad.rating = 9;
        let Err(Error::Validation { errors }) = create_candidate(&db, &ctx, &bad).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("first_name"), Some("The first name field is required."));
        assert_eq!(errors.get("email"), Some("The email must be a valid email address."));
        assert_eq!(errors.get("status"), Some("The selected status is invalid."));
        assert_eq!(errors.get("rating"), Some("The rating must be between 0 and 5."));

        let missing_status = CandidateInput {
            status: None,
            ..input("Alice", "Ng", "a@x.com", "New")
        };
        let Err(Error::Validation { errors }) = create_candidate(&db, &ctx, &missing_status).await
        else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("status"), Some("The status field is required."));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_defaults_and_unknown_references() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();

        let created = create_candidate(&db, &ctx, &input("Alice", "Ng", "a@x.com", "New")).await?;
        assert_eq!(created.status, CandidateStatus::New);
        assert_eq!(created.application_date, ctx.today());
        assert!(!created.is_employee);

        let mut dangling = input("Bo", "Li", "bo@x.com", "New");
        dangling.job_id = Some(999);
        let Err(Error::Validation { errors }) = create_candidate(&db, &ctx, &dangling).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("job_id"), Some("The selected job id is invalid."));
        Ok(())
    }

    #[tokio::test]
    async fn test_status_machine() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();
        let c = create_candidate(&db, &ctx, &input("Alice", "Ng", "a@x.com", "New")).await?;

        for next in ["Screening", "Interview", "Offer"] {
            let updated = update_status(&db, c.id, next).await?;
            assert_eq!(updated.status.as_str(), next);
        }

        assert!(matches!(
            update_status(&db, c.id, "Archived").await,
            Err(Error::Validation { .. })
        ));

        update_status(&db, c.id, "Rejected").await?;
        for next in CandidateStatus::ALL {
            assert!(matches!(
                update_status(&db, c.id, next.as_str()).await,
                Err(Error::InvalidState { .. })
            ));
        }

        assert!(matches!(
            update_status(&db, 4242, "New").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_terminal_status() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();
        let c = create_candidate(&db, &ctx, &input("Alice", "Ng", "a@x.com", "Hired")).await?;

        let mut edit = input("Alicia", "Ng", "a@x.com", "Hired");
        edit.expected_salary = Some("12 LPA".to_string());
        let updated = update_candidate(&db, c.id, &edit).await?;
        assert_eq!(updated.first_name, "Alicia");
        assert_eq!(updated.expected_salary.as_deref(), Some("12 LPA"));

        let reopen = input("Alicia", "Ng", "a@x.com", "Interview");
        assert!(matches!(
            update_candidate(&db, c.id, &reopen).await,
            Err(Error::InvalidState { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_search_filter_sort() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();
        let reference = seed_test_reference(&db).await?;

        let mut alice = input("Alice", "Ng", "alice@x.com", "New");
        alice.application_date = NaiveDate::from_ymd_opt(2026, 1, 5);
        alice.job_id = Some(reference.job_id);
        let alice = create_candidate(&db, &ctx, &alice).await?;

        let mut bob = input("Bob", "Stone", "bob@y.org", "Interview");
        bob.application_date = NaiveDate::from_ymd_opt(2026, 1, 5);
        let bob = create_candidate(&db, &ctx, &bob).await?;

        let mut cara = input("Cara", "Ngata", "cara@x.com", "Interview");
        cara.application_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        let cara = create_candidate(&db, &ctx, &cara).await?;

        let all = list_candidates(&db, &CandidateFilters::default(), CandidateSort::default(), PageRequest::default()).await?;
        let ids: Vec<i64> = all.items.iter().map(|c| c.id).collect();
        // newest application first, equal dates by id descending
        assert_eq!(ids, vec![cara.id, bob.id, alice.id]);

        let search = CandidateFilters {
            search: Some("ng".to_string()),
            ..Default::default()
        };
        let found = list_candidates(&db, &search, CandidateSort::default(), PageRequest::default()).await?;
        assert_eq!(found.total, 2);

        let full_name = CandidateFilters {
            search: Some("Bob Sto".to_string()),
            ..Default::default()
        };
        let found = list_candidates(&db, &full_name, CandidateSort::default(), PageRequest::default()).await?;
        assert_eq!(found.items[0].id, bob.id);

        let by_status = CandidateFilters {
            status: Some("Interview".to_string()),
            ..Default::default()
        };
        let by_name = CandidateSort {
            sort_field: CandidateSortField::FullName,
            sort_direction: SortDirection::Asc,
        };
        let found = list_candidates(&db, &by_status, by_name, PageRequest::default()).await?;
        assert_eq!(found.items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![bob.id, cara.id]);

        let by_job = CandidateFilters {
            job_id: Some(reference.job_id),
            ..Default::default()
        };
        let found = list_candidates(&db, &by_job, CandidateSort::default(), PageRequest::new(1, 1)).await?;
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].id, alice.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades_offers_and_files() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();
        let files = MemoryFileStore::new();
        let reference = seed_test_reference(&db).await?;
        let c = create_candidate(&db, &ctx, &input("Alice", "Ng", "a@x.com", "Offer")).await?;

        let handle = files.put("offers", "letter.pdf", b"%PDF".to_vec()).await?;
        insert_test_offer(&db, c.id, reference.template_id, Some(handle.clone())).await?;

        delete_candidate(&db, &files, c.id).await?;
        assert_eq!(Offer::find().count(&db).await?, 0);
        assert!(!files.contains(&handle).await);
        assert!(matches!(
            get_candidate(&db, c.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_detail_default_salary() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = test_context();
        let reference = seed_test_reference(&db).await?;

        let mut with_salary = input("Alice", "Ng", "a@x.com", "Offer");
        with_salary.expected_salary = Some("$60k/yr".to_string());
        with_salary.current_salary = Some("50000".to_string());
        with_salary.job_id = Some(reference.job_id);
        let c = create_candidate(&db, &ctx, &with_salary).await?;

        let detail = candidate_detail(&db, c.id).await?;
        assert_eq!(detail.default_offer_salary.as_deref(), Some("60,000"));
        assert_eq!(detail.job.map(|j| j.id), Some(reference.job_id));
        assert_eq!(detail.offer_templates.len(), 1);
        assert!(detail.offers.is_empty());
        Ok(())
    }
}
