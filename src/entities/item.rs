use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `items` table. Catalog items sold on bills and tracked through
/// inventory sessions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "items")]
#[schema(as = Item)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Unit price used when a bill line does not override it.
    pub price: Decimal,

    /// Inactive items stay referenced by history but are hidden from entry
    /// screens.
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bill_item::Entity")]
    BillItems,

    #[sea_orm(has_many = "super::inventory_session_item::Entity")]
    InventorySessionItems,
}

impl Related<super::bill_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillItems.def()
    }
}

impl Related<super::inventory_session_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventorySessionItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
