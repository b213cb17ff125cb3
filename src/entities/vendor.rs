use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `vendors` table. Suppliers referenced by purchase records and
/// vendor payments.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "vendors")]
#[schema(as = Vendor)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Operator-assigned vendor code, unique per table.
    pub vendor_id: String,

    pub name: String,

    /// Bank details used when settling vendor payments.
    pub account_holder_name: String,
    pub bank_name: String,
    pub ac_number: String,
    pub ifsc_code: String,
    pub branch: String,

    pub contact: String,

    pub email: String,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_record::Entity")]
    PurchaseRecords,

    #[sea_orm(has_many = "super::vendor_payment::Entity")]
    VendorPayments,
}

impl Related<super::purchase_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRecords.def()
    }
}

impl Related<super::vendor_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VendorPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
