//! Principal entity - an authenticated account.
//!
//! A principal may be backed by an employee record (kind = employee) or stand
//! alone (administrators, recruiters). Status gates whether it may act at all.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the account may sign in and act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PrincipalStatus {
    /// Account is usable.
    #[sea_orm(string_value = "active")]
    Active,
    /// Account is disabled.
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl PrincipalStatus {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// The opposite status, used by the toggle actions.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

impl fmt::Display for PrincipalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What sort of account this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// Backed by an employee record.
    #[sea_orm(string_value = "employee")]
    Employee,
    /// Installation administrator, holds every permission.
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Recruitment staff.
    #[sea_orm(string_value = "recruiter")]
    Recruiter,
    /// Anything else.
    #[sea_orm(string_value = "other")]
    Other,
}

impl PrincipalKind {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
            Self::Recruiter => "recruiter",
            Self::Other => "other",
        }
    }
}

impl FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            "recruiter" => Ok(Self::Recruiter),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown principal kind: {other}")),
        }
    }
}

/// Principal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "principals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Official email, unique across the installation
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string; None until a password is set
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub status: PrincipalStatus,
    pub kind: PrincipalKind,
    pub role_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id",
        on_delete = "SetNull"
    )]
    Role,
    /// Present only for kind = employee
    #[sea_orm(has_one = "super::employee::Entity")]
    Employee,
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
