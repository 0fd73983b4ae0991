//! Employee entity - the HR record owned 1:1 by a principal of kind employee.
//!
//! The display name and official email live on the owning principal; the
//! employee row carries the employment, personal, statutory and banking data.
//! Documents and lifecycle records hang off the employee and are removed with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Employment state recorded by HR (independent of the principal's login status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum EmploymentStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "probation")]
    Probation,
    #[sea_orm(string_value = "terminated")]
    Terminated,
}

impl FromStr for EmploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "probation" => Ok(Self::Probation),
            "terminated" => Ok(Self::Terminated),
            other => Err(format!("unknown employment status: {other}")),
        }
    }
}

/// Employee database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub principal_id: i64,
    /// Allocated from the installation sequence, never reused
    #[sea_orm(unique)]
    pub employee_id: String,
    /// Mirrors `employee_id`
    pub biometric_emp_id: String,
    pub branch_id: Option<i64>,
    pub department_id: Option<i64>,
    /// Must belong to `department_id`
    pub designation_id: Option<i64>,
    pub employment_status: EmploymentStatus,
    pub shift_id: Option<i64>,
    pub attendance_policy_id: Option<i64>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub date_of_joining: Date,
    /// Access is revoked after 18:00 local on this day
    pub date_of_exit: Option<Date>,
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
    /// IFSC or SWIFT code
    pub bank_identifier_code: Option<String>,
    pub bank_branch: Option<String>,
    pub qualification: Option<String>,
    pub blood_group: Option<String>,
    /// Process or client tag
    pub process: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::principal::Entity",
        from = "Column::PrincipalId",
        to = "super::principal::Column::Id",
        on_delete = "Cascade"
    )]
    Principal,
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id",
        on_delete = "SetNull"
    )]
    Branch,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_delete = "SetNull"
    )]
    Department,
    #[sea_orm(
        belongs_to = "super::designation::Entity",
        from = "Column::DesignationId",
        to = "super::designation::Column::Id",
        on_delete = "SetNull"
    )]
    Designation,
    #[sea_orm(
        belongs_to = "super::shift::Entity",
        from = "Column::ShiftId",
        to = "super::shift::Column::Id",
        on_delete = "SetNull"
    )]
    Shift,
    #[sea_orm(
        belongs_to = "super::attendance_policy::Entity",
        from = "Column::AttendancePolicyId",
        to = "super::attendance_policy::Column::Id",
        on_delete = "SetNull"
    )]
    AttendancePolicy,
    #[sea_orm(has_many = "super::employee_document::Entity")]
    Documents,
}

impl Related<super::principal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Principal.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::designation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Designation.def()
    }
}

impl Related<super::employee_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
