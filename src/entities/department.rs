//! Department entity - an organisational unit owning a set of designations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::designation::Entity")]
    Designations,
}

impl Related<super::designation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Designations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
