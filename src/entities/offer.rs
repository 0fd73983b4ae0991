//! Offer entity - one sent offer letter. Resending creates a new row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Offer outcome. Only `Sent` is driven by this crate; the rest are set
/// externally when the candidate answers or the offer lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "declined")]
    Declined,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub candidate_id: i64,
    pub offer_template_id: i64,
    pub salary: Decimal,
    pub start_date: Date,
    pub expiration_date: Date,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub status: OfferStatus,
    /// File store handle of the rendered letter
    pub pdf_path: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::candidate::Entity",
        from = "Column::CandidateId",
        to = "super::candidate::Column::Id",
        on_delete = "Cascade"
    )]
    Candidate,
    #[sea_orm(
        belongs_to = "super::offer_template::Entity",
        from = "Column::OfferTemplateId",
        to = "super::offer_template::Column::Id"
    )]
    OfferTemplate,
}

impl Related<super::candidate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidate.def()
    }
}

impl Related<super::offer_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OfferTemplate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
