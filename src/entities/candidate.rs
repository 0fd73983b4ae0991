//! Candidate entity - a person moving through the recruitment pipeline.
//!
//! Salary fields are stored exactly as typed ("12 LPA", "$60k/yr") and only
//! parsed when a number is needed. The status column holds one of the
//! [`CandidateStatus`] strings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recruitment pipeline position.
///
/// `New → Screening → Interview → Offer → Offered → Hired`, with `Rejected`
/// reachable from any non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CandidateStatus {
    #[sea_orm(string_value = "New")]
    New,
    #[sea_orm(string_value = "Screening")]
    Screening,
    #[sea_orm(string_value = "Interview")]
    Interview,
    #[sea_orm(string_value = "Offer")]
    Offer,
    #[sea_orm(string_value = "Offered")]
    Offered,
    #[sea_orm(string_value = "Hired")]
    Hired,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
}

impl CandidateStatus {
    /// Every status, in pipeline order.
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::Screening,
        Self::Interview,
        Self::Offer,
        Self::Offered,
        Self::Hired,
        Self::Rejected,
    ];

    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Screening => "Screening",
            Self::Interview => "Interview",
            Self::Offer => "Offer",
            Self::Offered => "Offered",
            Self::Hired => "Hired",
            Self::Rejected => "Rejected",
        }
    }

    /// Hired and Rejected admit no further status edits.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Hired | Self::Rejected)
    }

    /// Whether an offer letter may be sent from this status.
    #[must_use]
    pub const fn accepts_offer(self) -> bool {
        matches!(self, Self::Offer | Self::Offered)
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("The selected status is invalid: {s}"))
    }
}

/// Candidate database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "candidates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_id: Option<i64>,
    pub source_id: Option<i64>,
    /// Employee (primary key) who referred this candidate
    pub referral_employee_id: Option<i64>,
    pub sourced_by: Option<String>,
    pub experience_years: i32,
    pub current_salary: Option<String>,
    pub expected_salary: Option<String>,
    pub final_salary: Option<String>,
    pub notice_period: Option<String>,
    pub languages_known: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<Date>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    /// File store handle
    pub resume_path: Option<String>,
    /// File store handle
    pub cover_letter_path: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cover_letter_message: Option<String>,
    /// JSON object of question → answer
    pub custom_question: Option<Json>,
    pub status: CandidateStatus,
    pub is_archive: bool,
    pub is_employee: bool,
    pub application_date: Date,
    pub rating: i32,
    pub terms_condition_check: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// "First Last", as used in greetings and offer letters.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job_posting::Entity",
        from = "Column::JobId",
        to = "super::job_posting::Column::Id",
        on_delete = "SetNull"
    )]
    JobPosting,
    #[sea_orm(
        belongs_to = "super::source::Entity",
        from = "Column::SourceId",
        to = "super::source::Column::Id",
        on_delete = "SetNull"
    )]
    Source,
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::ReferralEmployeeId",
        to = "super::employee::Column::Id",
        on_delete = "SetNull"
    )]
    Referrer,
    #[sea_orm(has_many = "super::offer::Entity")]
    Offers,
}

impl Related<super::job_posting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobPosting.def()
    }
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl Related<super::offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
