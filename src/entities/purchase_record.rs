use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bill::{PaymentStatus, PaymentType};

/// The `purchase_records` table. One row per purchase order raised against
/// a vendor, numbered like `PO-202405230001`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub vendor_id: Uuid,

    /// Unique purchase order number.
    pub purchase_order_id: String,

    /// Vendor's own bill/invoice reference.
    pub bill_no: String,

    pub description: String,

    pub total_amount: Decimal,

    pub ordered_date: NaiveDate,

    /// Unset until goods arrive.
    pub received_date: Option<NaiveDate>,

    pub payment_type: Option<PaymentType>,

    pub payment_status: PaymentStatus,

    pub payment_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    /// Account that raised the purchase.
    pub purchased_by: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_item::Entity")]
    PurchaseItems,

    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id",
        on_delete = "Restrict"
    )]
    Vendor,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PurchasedBy",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    PurchasedBy,
}

impl Related<super::purchase_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseItems.def()
    }
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
