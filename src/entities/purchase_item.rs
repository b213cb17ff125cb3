use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `purchase_items` table. Lines on a purchase record. Purchased goods
/// are free-text; they do not have to exist in the sales catalog.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub purchase_id: Uuid,

    pub item_name: String,

    pub quantity: i32,

    /// Unit price paid.
    pub price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_record::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase_record::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
}

impl Related<super::purchase_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Extended amount for the line.
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
