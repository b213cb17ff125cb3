use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bill::PaymentType;

/// The `inventory_session_payments` table. Payments collected while a
/// session runs, reconciled against sold stock at close time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_session_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub session_id: Uuid,

    pub payment_type: PaymentType,

    pub amount: Decimal,

    /// Transaction reference for non-cash instruments.
    pub reference_number: String,

    /// Recording order; the earliest payment fixes the bill's payment
    /// type when the session closes.
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_session::Entity",
        from = "Column::SessionId",
        to = "super::inventory_session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,
}

impl Related<super::inventory_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
