//! Counter entity - named monotonic sequences such as the employee id number.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "counters")]
pub struct Model {
    /// Sequence name, e.g. `"employee_id"`
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    /// Last number handed out
    pub last_value: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
