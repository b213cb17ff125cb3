use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bill::{Outlet, PaymentStatus};

/// Enum representing the lifecycle state of an inventory session.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Quantities and payments may still be edited.
    #[sea_orm(string_value = "OPEN")]
    Open,
    /// Reconciled and converted to a bill. Immutable from here on.
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

/// The `inventory_sessions` table. A stock-out/stock-return cycle for an
/// outlet, typically a mobile stall run. Closing a session reconciles
/// payments against sold stock and produces exactly one sales bill.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_sessions")]
pub struct Model {
    /// Primary key: Unique identifier for the session.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Outlet the stock was taken to.
    pub outlet: Outlet,

    /// Optional link to a registered customer.
    pub customer_id: Option<Uuid>,

    /// Customer name as entered.
    pub customer_name: String,

    /// Payment progress at the time of the last edit.
    pub payment_status: PaymentStatus,

    /// Account that opened the session.
    pub created_by: Uuid,

    /// Timestamp when the session was opened.
    pub created_at: DateTime<Utc>,

    /// Lifecycle state.
    pub status: SessionStatus,

    /// Timestamp when the session was closed.
    pub closed_at: Option<DateTime<Utc>>,

    /// Bill produced at close time.
    pub bill_id: Option<Uuid>,
}

/// Define relations for the `inventory_sessions` table.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Stock lines taken out for the session.
    #[sea_orm(has_many = "super::inventory_session_item::Entity")]
    Items,

    /// Payments collected during the session.
    #[sea_orm(has_many = "super::inventory_session_payment::Entity")]
    Payments,

    /// Students who ran the session.
    #[sea_orm(has_many = "super::inventory_session_student::Entity")]
    Students,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    CreatedBy,

    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "SetNull"
    )]
    Customer,
}

impl Related<super::inventory_session_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::inventory_session_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::inventory_session_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True once the session has been converted to a bill.
    pub fn is_closed(&self) -> bool {
        self.status == SessionStatus::Closed
    }
}
