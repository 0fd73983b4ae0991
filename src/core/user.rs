//! User administration: principals that sign in, their roles and passwords.
//!
//! Employee-backed principals are created by the employee and conversion
//! modules; this module manages the standalone accounts and the shared
//! status and password actions.

use crate::{
    core::{
        candidate::follow_employee_email,
        context::RequestContext,
        pagination::{Page, PageRequest, fetch_page},
        session::terminate_all_sessions,
    },
    entities::{Principal, PrincipalKind, PrincipalModel, PrincipalStatus, Role, principal, role},
    errors::{Error, FieldErrors, Result},
};
use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub const MIN_PASSWORD_LENGTH: usize = 8;

const INVALID_CREDENTIALS: &str = "These credentials do not match our records.";

/// Hashes a password into an argon2 PHC string on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string())
    })
    .await?
}

/// Checks `password` against a stored PHC string on the blocking pool.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    let matches = tokio::task::spawn_blocking(move || {
        PasswordHash::new(&hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await?;
    Ok(matches)
}

/// Create and edit form for standalone users.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    /// Required on create, optional on edit
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub role_id: Option<i64>,
    /// `admin`, `recruiter` or `other`; defaults to `other`
    pub kind: Option<String>,
}

/// Reset-password form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordReset {
    pub password: String,
    pub password_confirmation: String,
}

/// Plan usage shown on the user index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub current_users: u64,
    pub max_users: Option<u64>,
    pub can_create: bool,
}

/// Index filters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserFilters {
    pub search: Option<String>,
    pub role_id: Option<i64>,
}

/// Users holding one role.
#[derive(Debug, Clone, Serialize)]
pub struct RoleUsers {
    pub role: role::Model,
    pub users: Page<PrincipalModel>,
}

/// Counts principals against the plan limit. Every principal counts.
pub async fn plan_limits<C>(db: &C, max_users: Option<u64>) -> Result<PlanLimits>
where
    C: ConnectionTrait,
{
    let current_users = Principal::find().count(db).await?;
    Ok(PlanLimits {
        current_users,
        max_users,
        can_create: max_users.is_none_or(|max| current_users < max),
    })
}

/// Refuses a new principal once the plan limit is reached. Standalone users
/// and employee-backed principals count alike.
pub async fn ensure_capacity<C>(db: &C, max_users: Option<u64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let limits = plan_limits(db, max_users).await?;
    if limits.can_create {
        return Ok(());
    }
    Err(Error::InvalidState {
        message: format!(
            "User limit reached: your plan allows {} users.",
            limits.max_users.unwrap_or_default()
        ),
    })
}

fn check_password(
    password: Option<&str>,
    confirmation: Option<&str>,
    required: bool,
    errors: &mut FieldErrors,
) {
    match password.filter(|p| !p.is_empty()) {
        None if required => errors.add("password", "The password field is required."),
        None => {}
        Some(p) => {
            if p.chars().count() < MIN_PASSWORD_LENGTH {
                errors.add(
                    "password",
                    format!("The password must be at least {MIN_PASSWORD_LENGTH} characters."),
                );
            } else if confirmation != Some(p) {
                errors.add("password", "The password confirmation does not match.");
            }
        }
    }
}

fn parse_kind(raw: Option<&str>, errors: &mut FieldErrors) -> PrincipalKind {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => PrincipalKind::Other,
        Some(s) => match s.parse::<PrincipalKind>() {
            Ok(PrincipalKind::Employee) => {
                errors.add("kind", "Employee accounts are created from the employee record.");
                PrincipalKind::Other
            }
            Ok(kind) => kind,
            Err(_) => {
                errors.add("kind", "The selected kind is invalid.");
                PrincipalKind::Other
            }
        },
    }
}

async fn validate_user<C>(
    db: &C,
    input: &UserInput,
    editing: Option<i64>,
    errors: &mut FieldErrors,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if input.name.trim().is_empty() {
        errors.add("name", "The name field is required.");
    }
    let email = input.email.trim();
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !crate::core::candidate::is_valid_email(email) {
        errors.add("email", "The email must be a valid email address.");
    } else {
        let mut taken = Principal::find().filter(principal::Column::Email.eq(email));
        if let Some(id) = editing {
            taken = taken.filter(principal::Column::Id.ne(id));
        }
        if taken.count(db).await? > 0 {
            errors.add("email", "The email has already been taken.");
        }
    }
    if let Some(role_id) = input.role_id {
        if Role::find_by_id(role_id).count(db).await? == 0 {
            errors.add("role_id", "The selected role id is invalid.");
        }
    }
    Ok(())
}

async fn get_user<C>(db: &C, id: i64) -> Result<PrincipalModel>
where
    C: ConnectionTrait,
{
    Principal::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", id))
}

/// Creates a standalone user, subject to the plan limit.
///
/// # Errors
/// - `InvalidState` when the plan limit is reached
/// - `Validation` for missing fields, a taken email, a short or unconfirmed
///   password, or an unknown role
#[instrument(skip(db, input), fields(email = %input.email))]
pub async fn create_user(
    db: &DatabaseConnection,
    max_users: Option<u64>,
    input: &UserInput,
) -> Result<PrincipalModel> {
    let txn = db.begin().await?;
    ensure_capacity(&txn, max_users).await?;

    let mut errors = FieldErrors::new();
    let kind = parse_kind(input.kind.as_deref(), &mut errors);
    check_password(
        input.password.as_deref(),
        input.password_confirmation.as_deref(),
        true,
        &mut errors,
    );
    validate_user(&txn, input, None, &mut errors).await?;
    errors.into_result()?;

    let password_hash = match &input.password {
        Some(p) => Some(hash_password(p).await?),
        None => None,
    };
    let now = Utc::now();
    let user = principal::ActiveModel {
        name: Set(input.name.trim().to_string()),
        email: Set(input.email.trim().to_string()),
        password_hash: Set(password_hash),
        status: Set(PrincipalStatus::Active),
        kind: Set(kind),
        role_id: Set(input.role_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Created user {} ({})", user.id, user.kind.as_str());
    Ok(user)
}

/// Updates name, email, role and optionally the password of a user.
/// The kind of an employee-backed principal never changes.
#[instrument(skip(db, input))]
pub async fn update_user(
    db: &DatabaseConnection,
    id: i64,
    input: &UserInput,
) -> Result<PrincipalModel> {
    let txn = db.begin().await?;
    let current = get_user(&txn, id).await?;

    let mut errors = FieldErrors::new();
    let kind = if current.kind == PrincipalKind::Employee {
        PrincipalKind::Employee
    } else {
        parse_kind(input.kind.as_deref(), &mut errors)
    };
    check_password(
        input.password.as_deref(),
        input.password_confirmation.as_deref(),
        false,
        &mut errors,
    );
    validate_user(&txn, input, Some(id), &mut errors).await?;
    errors.into_result()?;
    if current.kind == PrincipalKind::Employee {
        follow_employee_email(&txn, &current.email, input.email.trim()).await?;
    }

    let mut active: principal::ActiveModel = current.into();
    active.name = Set(input.name.trim().to_string());
    active.email = Set(input.email.trim().to_string());
    active.role_id = Set(input.role_id);
    active.kind = Set(kind);
    if let Some(p) = input.password.as_deref().filter(|p| !p.is_empty()) {
        active.password_hash = Set(Some(hash_password(p).await?));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!("Updated user {}", id);
    Ok(updated)
}

/// Deletes a standalone user and its sessions.
///
/// # Errors
/// - `InvalidState` when deleting one's own account
/// - `Conflict` for employee-backed principals; delete the employee instead
#[instrument(skip(db, ctx))]
pub async fn delete_user(db: &DatabaseConnection, ctx: &RequestContext, id: i64) -> Result<PrincipalModel> {
    if ctx.principal.as_ref().is_some_and(|p| p.id == id) {
        return Err(Error::InvalidState {
            message: "You cannot delete your own account.".to_string(),
        });
    }

    let txn = db.begin().await?;
    let user = get_user(&txn, id).await?;
    if user.kind == PrincipalKind::Employee {
        return Err(Error::Conflict {
            message: "This user belongs to an employee record; delete the employee instead."
                .to_string(),
        });
    }
    terminate_all_sessions(&txn, id).await?;
    Principal::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted user {}", id);
    Ok(user)
}

/// Sets a new password and ends the user's sessions.
#[instrument(skip(db, form))]
pub async fn reset_password(
    db: &DatabaseConnection,
    id: i64,
    form: &PasswordReset,
) -> Result<PrincipalModel> {
    let mut errors = FieldErrors::new();
    check_password(
        Some(form.password.as_str()),
        Some(form.password_confirmation.as_str()),
        true,
        &mut errors,
    );
    errors.into_result()?;

    let txn = db.begin().await?;
    let user = get_user(&txn, id).await?;
    let mut active: principal::ActiveModel = user.into();
    active.password_hash = Set(Some(hash_password(&form.password).await?));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    terminate_all_sessions(&txn, id).await?;
    txn.commit().await?;

    info!("Password reset for user {}", id);
    Ok(updated)
}

/// Flips a user between active and inactive; deactivation ends its sessions.
#[instrument(skip(db, ctx))]
pub async fn toggle_user_status(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    id: i64,
) -> Result<PrincipalModel> {
    if ctx.principal.as_ref().is_some_and(|p| p.id == id) {
        return Err(Error::InvalidState {
            message: "You cannot deactivate your own account.".to_string(),
        });
    }

    let txn = db.begin().await?;
    let user = get_user(&txn, id).await?;
    let next = user.status.toggled();
    let mut active: principal::ActiveModel = user.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    if next == PrincipalStatus::Inactive {
        terminate_all_sessions(&txn, id).await?;
    }
    txn.commit().await?;

    info!("User {} is now {}", id, next);
    Ok(updated)
}

/// Paginated user index, by name.
pub async fn list_users<C>(db: &C, filters: &UserFilters, page: PageRequest) -> Result<Page<PrincipalModel>>
where
    C: ConnectionTrait,
{
    let mut select = Principal::find();
    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(principal::Column::Name.contains(term))
                .add(principal::Column::Email.contains(term)),
        );
    }
    if let Some(role_id) = filters.role_id {
        select = select.filter(principal::Column::RoleId.eq(role_id));
    }
    select = select
        .order_by_asc(principal::Column::Name)
        .order_by_desc(principal::Column::Id);
    fetch_page(db, select, page).await
}

/// One role and a page of the users holding it.
pub async fn users_by_role<C>(db: &C, role_id: i64, page: PageRequest) -> Result<RoleUsers>
where
    C: ConnectionTrait,
{
    let role = Role::find_by_id(role_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Role", role_id))?;
    let filters = UserFilters {
        role_id: Some(role_id),
        ..Default::default()
    };
    let users = list_users(db, &filters, page).await?;
    Ok(RoleUsers { role, users })
}

/// Checks credentials for sign-in. Unknown emails and wrong passwords get the
/// same message.
pub async fn authenticate<C>(db: &C, email: &str, password: &str) -> Result<PrincipalModel>
where
    C: ConnectionTrait,
{
    let user = Principal::find()
        .filter(principal::Column::Email.eq(email.trim()))
        .one(db)
        .await?
        .ok_or_else(|| Error::field("email", INVALID_CREDENTIALS))?;

    let matches = match user.password_hash.as_deref() {
        Some(hash) => verify_password(password, hash).await?,
        None => false,
    };
    if !matches {
        return Err(Error::field("email", INVALID_CREDENTIALS));
    }
    if user.status == PrincipalStatus::Inactive {
        return Err(Error::field("email", "This account is inactive."));
    }
    Ok(user)
}

/// Creates the first administrator when none exists yet.
pub async fn ensure_admin(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Option<PrincipalModel>> {
    let admins = Principal::find()
        .filter(principal::Column::Kind.eq(PrincipalKind::Admin))
        .count(db)
        .await?;
    if admins > 0 {
        return Ok(None);
    }

    let input = UserInput {
        name: name.to_string(),
        email: email.to_string(),
        password: Some(password.to_string()),
        password_confirmation: Some(password.to_string()),
        role_id: None,
        kind: Some(PrincipalKind::Admin.as_str().to_string()),
    };
    let admin = create_user(db, None, &input).await?;
    info!("Bootstrapped administrator {}", admin.email);
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::session::{open_session, resolve_session};
    use crate::test_utils::*;

    fn user(name: &str, email: &str) -> UserInput {
        UserInput {
            name: name.to_string(),
            email: email.to_string(),
            password: Some("s3cret-pass".to_string()),
            password_confirmation: Some("s3cret-pass".to_string()),
            kind: Some("recruiter".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_password_hash_round_trip() -> Result<()> {
        let hash = hash_password("hunter2hunter2").await?;
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2hunter2", &hash).await?);
        assert!(!verify_password("wrong", &hash).await?);
        assert!(!verify_password("anything", "not-a-hash").await?);
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_executor_free() -> Result<()> {
        let hashing = tokio::spawn(async { hash_password("hunter2hunter2").await });
        // the hashing task gets polled here; argon2 must not run on this thread
        tokio::task::yield_now().await;
        assert!(!hashing.is_finished());
        assert!(hashing.await??.starts_with("$argon2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_plan_limit_gates_creation() -> Result<()> {
        let db = setup_test_db().await?;
        create_user(&db, Some(2), &user("Ana", "ana@example.com")).await?;
        create_user(&db, Some(2), &user("Ben", "ben@example.com")).await?;

        let limits = plan_limits(&db, Some(2)).await?;
        assert_eq!(limits.current_users, 2);
        assert!(!limits.can_create);
        assert!(matches!(
            create_user(&db, Some(2), &user("Cy", "cy@example.com")).await,
            Err(Error::InvalidState { .. })
        ));
        assert!(plan_limits(&db, None).await?.can_create);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_validation() -> Result<()> {
        let db = setup_test_db().await?;
        create_user(&db, None, &user("Ana", "ana@example.com")).await?;

        let mut bad = user("", "ana@example.com");
        bad.password_confirmation = Some("different".to_string());
        bad.kind = Some("employee".to_string());
        let Err(Error::Validation { errors }) = create_user(&db, None, &bad).await else {
            panic!("expected validation failure");
        };
        assert!(errors.get("name").is_some());
        assert_eq!(errors.get("email"), Some("The email has already been taken."));
        assert_eq!(errors.get("password"), Some("The password confirmation does not match."));
        assert!(errors.get("kind").is_some());

        let mut short = user("Dee", "dee@example.com");
        short.password = Some("short".to_string());
        let Err(Error::Validation { errors }) = create_user(&db, None, &short).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("password"), Some("The password must be at least 8 characters."));
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_password_and_authenticate() -> Result<()> {
        let db = setup_test_db().await?;
        let ana = create_user(&db, None, &user("Ana", "ana@example.com")).await?;
        let session = open_session(&db, ana.id, Utc::now()).await?;

        let mismatch = PasswordReset {
            password: "new-password".to_string(),
            password_confirmation: "other-password".to_string(),
        };
        let Err(Error::Validation { errors }) = reset_password(&db, ana.id, &mismatch).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("password"), Some("The password confirmation does not match."));

        let ok = PasswordReset {
            password: "new-password".to_string(),
            password_confirmation: "new-password".to_string(),
        };
        reset_password(&db, ana.id, &ok).await?;
        assert!(resolve_session(&db, &session.token, Utc::now(), test_settings().app.session_ttl()).await?.is_none());

        assert_eq!(authenticate(&db, "ana@example.com", "new-password").await?.id, ana.id);
        assert!(matches!(
            authenticate(&db, "ana@example.com", "s3cret-pass").await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            authenticate(&db, "nobody@example.com", "new-password").await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_delete_and_self_protection() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_user(&db, None, &UserInput { kind: Some("admin".to_string()), ..user("Root", "root@example.com") }).await?;
        let ana = create_user(&db, None, &user("Ana", "ana@example.com")).await?;
        let ctx = context_at(&admin, Utc::now());

        let toggled = toggle_user_status(&db, &ctx, ana.id).await?;
        assert_eq!(toggled.status, PrincipalStatus::Inactive);
        assert!(matches!(
            authenticate(&db, "ana@example.com", "s3cret-pass").await,
            Err(Error::Validation { .. })
        ));

        assert!(matches!(
            toggle_user_status(&db, &ctx, admin.id).await,
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(
            delete_user(&db, &ctx, admin.id).await,
            Err(Error::InvalidState { .. })
        ));

        let employee = create_test_employee(&db, "Eli Moss", "eli@example.com").await?;
        assert!(matches!(
            delete_user(&db, &ctx, employee.principal_id).await,
            Err(Error::Conflict { .. })
        ));

        delete_user(&db, &ctx, ana.id).await?;
        assert!(matches!(get_user(&db, ana.id).await, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_by_role() -> Result<()> {
        let db = setup_test_db().await?;
        let reference = seed_test_reference(&db).await?;
        let mut recruiter = user("Ana", "ana@example.com");
        recruiter.role_id = Some(reference.recruiter_role_id);
        create_user(&db, None, &recruiter).await?;
        create_user(&db, None, &user("Ben", "ben@example.com")).await?;

        let all = list_users(&db, &UserFilters::default(), PageRequest::default()).await?;
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].name, "Ana");

        let by_role = users_by_role(&db, reference.recruiter_role_id, PageRequest::default()).await?;
        assert_eq!(by_role.users.total, 1);
        assert_eq!(by_role.role.name, "Recruiter");

        assert!(ensure_admin(&db, "Root", "root@example.com", "bootstrap-pass").await?.is_some());
        assert!(ensure_admin(&db, "Root", "root2@example.com", "bootstrap-pass").await?.is_none());
        Ok(())
    }
}
