use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `bill_items` table. One aggregated line per distinct item on a bill.
///
/// A line references either a catalog item or carries a custom name, never
/// both. The unit price is frozen at billing time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub bill_id: Uuid,

    /// Catalog item this line refers to, when not a custom line.
    pub item_id: Option<Uuid>,

    /// Free-text name for off-catalog lines.
    pub custom_item_name: Option<String>,

    pub quantity: i32,

    /// Unit price at billing time.
    pub price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bill::Entity",
        from = "Column::BillId",
        to = "super::bill::Column::Id",
        on_delete = "Cascade"
    )]
    Bill,

    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "SetNull"
    )]
    Item,
}

impl Related<super::bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bill.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Extended amount for the line.
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_multiplies_price_by_quantity() {
        let line = Model {
            id: Uuid::new_v4(),
            bill_id: Uuid::new_v4(),
            item_id: None,
            custom_item_name: Some("Filter coffee".to_string()),
            quantity: 3,
            price: dec!(25.50),
        };

        assert_eq!(line.line_total(), dec!(76.50));
    }
}
