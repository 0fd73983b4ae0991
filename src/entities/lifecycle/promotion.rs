//! Promotion entity - a change of designation, dated by promotion or effective date.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub employee_id: i64,
    pub previous_designation_id: Option<i64>,
    pub new_designation_id: Option<i64>,
    pub promotion_date: Option<Date>,
    pub effective_date: Option<Date>,
    pub reason: Option<String>,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::employee::Entity",
        from = "Column::EmployeeId",
        to = "crate::entities::employee::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,
}

impl Related<crate::entities::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
