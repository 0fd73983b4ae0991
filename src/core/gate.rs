//! Identity & status gate.
//!
//! Runs before every authenticated action. An employee whose exit date has
//! passed the configured cutoff hour (local time) loses access on the spot:
//! the principal is deactivated, its sessions are deleted and a fresh CSRF
//! token is issued for the login page.

use crate::{
    core::{context::RequestContext, session},
    entities::{Employee, PrincipalKind, PrincipalModel, PrincipalStatus, employee, principal},
    errors::Result,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Where a revoked principal is sent.
pub const LOGIN_PATH: &str = "/login";

/// Flash shown on the login page after revocation.
pub const EXIT_REVOKED_MESSAGE: &str =
    "Your access has been revoked following your exit from the company.";

/// What the gate decided for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Carry on with the request.
    Pass,
    /// Access revoked; redirect with the message.
    Revoked(Revocation),
}

/// Redirect instructions for a revoked principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revocation {
    pub redirect_to: &'static str,
    pub message: &'static str,
    /// Replaces the CSRF token of the terminated session
    pub csrf_token: String,
}

/// The instant access ends for an exit on `date_of_exit`.
#[must_use]
pub fn exit_cutoff(date_of_exit: NaiveDate, cutoff_hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(cutoff_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    date_of_exit.and_time(time)
}

/// Whether local time `now` is strictly past the exit cutoff.
#[must_use]
pub fn exit_has_elapsed(date_of_exit: NaiveDate, cutoff_hour: u32, now: NaiveDateTime) -> bool {
    now > exit_cutoff(date_of_exit, cutoff_hour)
}

/// Applies the exit rule to the acting principal.
///
/// Non-employees and employees without an exit date always pass. Any
/// datastore failure propagates; the caller must not continue the request.
#[instrument(skip(db, ctx), fields(principal_id = ctx.principal.as_ref().map(|p| p.id)))]
pub async fn check_exit(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    cutoff_hour: u32,
) -> Result<GateOutcome> {
    let Some(principal) = ctx.principal.as_ref() else {
        return Ok(GateOutcome::Pass);
    };
    if principal.kind != PrincipalKind::Employee {
        return Ok(GateOutcome::Pass);
    }

    let record = Employee::find()
        .filter(employee::Column::PrincipalId.eq(principal.id))
        .one(db)
        .await?;
    let Some(date_of_exit) = record.and_then(|e| e.date_of_exit) else {
        return Ok(GateOutcome::Pass);
    };
    if !exit_has_elapsed(date_of_exit, cutoff_hour, ctx.local_now()) {
        return Ok(GateOutcome::Pass);
    }

    revoke(db, principal).await?;
    info!(
        "Revoked access for principal {} after exit on {}",
        principal.id, date_of_exit
    );

    Ok(GateOutcome::Revoked(Revocation {
        redirect_to: LOGIN_PATH,
        message: EXIT_REVOKED_MESSAGE,
        csrf_token: session::new_token(),
    }))
}

async fn revoke(db: &DatabaseConnection, principal: &PrincipalModel) -> Result<()> {
    let txn = db.begin().await?;

    if let Some(current) = principal::Entity::find_by_id(principal.id).one(&txn).await? {
        if current.status != PrincipalStatus::Inactive {
            let mut active: principal::ActiveModel = current.into();
            active.status = Set(PrincipalStatus::Inactive);
            active.updated_at = Set(chrono::Utc::now());
            active.update(&txn).await?;
        }
    }
    session::terminate_all_sessions(&txn, principal.id).await?;

    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{Principal, Session};
    use crate::test_utils::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::PaginatorTrait;

    #[test]
    fn test_cutoff_is_strict() {
        let exit = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let at = |h, m| exit.and_hms_opt(h, m, 0).unwrap();
        assert!(!exit_has_elapsed(exit, 18, at(17, 59)));
        assert!(!exit_has_elapsed(exit, 18, at(18, 0)));
        assert!(exit_has_elapsed(exit, 18, at(18, 1)));
    }

    #[tokio::test]
    async fn test_gate_before_and_after_cutoff() -> Result<()> {
        let db = setup_test_db().await?;
        let employee = create_test_employee(&db, "Omar Haddad", "omar@example.com").await?;
        set_exit_date(&db, &employee, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()).await?;
        let principal = Principal::find_by_id(employee.principal_id).one(&db).await?.unwrap();
        let session = session::open_session(&db, principal.id, Utc::now()).await?;

        let before = context_at(&principal, Utc.with_ymd_and_hms(2026, 1, 10, 17, 59, 0).unwrap());
        assert_eq!(check_exit(&db, &before, 18).await?, GateOutcome::Pass);
        assert!(session::resolve_session(&db, &session.token, Utc::now(), test_settings().app.session_ttl()).await?.is_some());

        let after = context_at(&principal, Utc.with_ymd_and_hms(2026, 1, 10, 18, 1, 0).unwrap());
        let GateOutcome::Revoked(revocation) = check_exit(&db, &after, 18).await? else {
            panic!("expected revocation");
        };
        assert_eq!(revocation.redirect_to, "/login");
        assert_eq!(revocation.message, EXIT_REVOKED_MESSAGE);
        assert_ne!(revocation.csrf_token, session.csrf_token);

        let reloaded = Principal::find_by_id(principal.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.status, PrincipalStatus::Inactive);
        assert_eq!(Session::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_employees_pass() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "Ada Admin", "ada@example.com").await?;
        let ctx = context_at(&user, Utc.with_ymd_and_hms(2030, 1, 1, 23, 0, 0).unwrap());
        assert_eq!(check_exit(&db, &ctx, 18).await?, GateOutcome::Pass);
        Ok(())
    }
}
