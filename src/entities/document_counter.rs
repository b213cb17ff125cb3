use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `document_counters` table. One row per (prefix, date) pair holding
/// the last sequence handed out. Rows are locked for update inside the
/// allocating transaction so two writers can never mint the same number.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Document prefix, e.g. `SB` or `PO`.
    pub prefix: String,

    /// Calendar day in `YYYYMMDD` form.
    pub date_key: String,

    pub last_seq: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
