use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One inspected produce container.
///
/// `puc`, `farm_name` and `commodity` are non-empty for every persisted row;
/// `created_at` is stamped once at insert and never updated. Rows are only
/// ever inserted by this service; there is no update or delete path.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub run_number: Option<String>,
    pub puc: String,
    pub farm_name: String,
    pub commodity: String,
    pub variety: Option<String>,
    pub grade_class: Option<String>,
    pub size: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((16, 3)))", nullable)]
    pub weight: Option<Decimal>,

    pub date_received: Date,
    pub inspector_notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
