//! Request-scoped context handed to core operations.
//!
//! Replaces ambient "current user" and "app settings" lookups: the acting
//! principal, its permissions, branding and the clock all travel explicitly.

use crate::{
    config::Settings,
    entities::{PrincipalKind, PrincipalModel, Role},
    errors::{Error, Result},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use sea_orm::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Permission strings checked at the boundary.
pub mod permissions {
    pub const MANAGE_CANDIDATES: &str = "manage-candidates";
    pub const SEND_OFFERS: &str = "send-offers";
    pub const CONVERT_CANDIDATES: &str = "convert-candidates";
    pub const MANAGE_EMPLOYEES: &str = "manage-employees";
    pub const EDIT_EMPLOYEES: &str = "edit-employees";
    pub const MANAGE_DOCUMENTS: &str = "manage-documents";
    pub const MANAGE_USERS: &str = "manage-users";

    /// Everything an administrator holds.
    pub const ALL: [&str; 7] = [
        MANAGE_CANDIDATES,
        SEND_OFFERS,
        CONVERT_CANDIDATES,
        MANAGE_EMPLOYEES,
        EDIT_EMPLOYEES,
        MANAGE_DOCUMENTS,
        MANAGE_USERS,
    ];
}

/// Installation branding used in mail and letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branding {
    pub app_name: String,
    pub company_name: String,
    pub mail_from: String,
}

/// Everything a core operation may need to know about the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Acting principal; None for system tasks
    pub principal: Option<PrincipalModel>,
    pub permissions: BTreeSet<String>,
    pub locale: String,
    pub branding: Branding,
    pub features: BTreeSet<String>,
    /// The instant the request is evaluated at
    pub now: DateTime<Utc>,
    /// Installation local time offset
    pub utc_offset: FixedOffset,
}

/// Resolves the installation offset: configured minutes, else the host's local offset.
#[must_use]
pub fn resolve_utc_offset(configured_minutes: Option<i32>) -> FixedOffset {
    configured_minutes
        .and_then(|minutes| FixedOffset::east_opt(minutes.saturating_mul(60)))
        .unwrap_or_else(|| *chrono::Local::now().offset())
}

impl RequestContext {
    /// A context without a principal, evaluated at `now`.
    #[must_use]
    pub fn system(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            principal: None,
            permissions: BTreeSet::new(),
            locale: settings.app.default_locale.clone(),
            branding: Branding {
                app_name: settings.app.name.clone(),
                company_name: settings.app.company_name.clone(),
                mail_from: settings.app.mail_from.clone(),
            },
            features: BTreeSet::new(),
            now,
            utc_offset: resolve_utc_offset(settings.app.utc_offset_minutes),
        }
    }

    /// Builds the context for `principal`, loading its role's permissions.
    /// Administrators hold every permission.
    pub async fn for_principal<C>(
        db: &C,
        settings: &Settings,
        principal: PrincipalModel,
        now: DateTime<Utc>,
    ) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let mut permissions = BTreeSet::new();
        if principal.kind == PrincipalKind::Admin {
            permissions.extend(permissions::ALL.iter().map(|p| (*p).to_string()));
        } else if let Some(role_id) = principal.role_id {
            if let Some(role) = Role::find_by_id(role_id).one(db).await? {
                permissions.extend(role.permission_list());
            }
        }

        let mut ctx = Self::system(settings, now);
        ctx.principal = Some(principal);
        ctx.permissions = permissions;
        Ok(ctx)
    }

    /// Replaces the permission set (tests and system tasks).
    #[must_use]
    pub fn with_permissions(mut self, granted: &[&str]) -> Self {
        self.permissions = granted.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Fails with `Forbidden` unless `permission` is held.
    pub fn require(&self, permission: &str) -> Result<()> {
        if self.permissions.contains(permission) {
            Ok(())
        } else {
            Err(Error::Forbidden {
                permission: permission.to_string(),
            })
        }
    }

    /// Wall-clock time at the installation.
    #[must_use]
    pub fn local_now(&self) -> NaiveDateTime {
        self.now.with_timezone(&self.utc_offset).naive_local()
    }

    /// Calendar date at the installation.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    /// Permission list in a stable order for responses.
    #[must_use]
    pub fn permission_list(&self) -> Vec<String> {
        self.permissions.iter().cloned().collect()
    }
}

/// UTC as a `FixedOffset`, for tests and defaults.
#[must_use]
pub fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_today_uses_installation_offset() {
        let mut settings = Settings::default();
        settings.app.utc_offset_minutes = Some(330);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let ctx = RequestContext::system(&settings, now);
        // 20:00 UTC is 01:30 the next day at +05:30
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn test_require_permission() {
        let mut settings = Settings::default();
        settings.app.utc_offset_minutes = Some(0);
        let ctx = RequestContext::system(&settings, Utc::now())
            .with_permissions(&[permissions::MANAGE_CANDIDATES]);
        assert!(ctx.require(permissions::MANAGE_CANDIDATES).is_ok());
        assert!(matches!(
            ctx.require(permissions::MANAGE_USERS),
            Err(Error::Forbidden { .. })
        ));
    }
}
