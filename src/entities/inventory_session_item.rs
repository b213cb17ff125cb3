use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `inventory_session_items` table. Stock movement per catalog item
/// within a session: how much went out and how much came back.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_session_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub session_id: Uuid,

    pub item_id: Uuid,

    /// Units taken out at the start of (or during) the session.
    pub quantity_taken: i32,

    /// Units returned unsold.
    pub quantity_returned: i32,
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

    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Restrict"
    )]
    Item,
}

impl Related<super::inventory_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Units sold, clamped at zero when more came back than went out
    /// (damaged stock returns can overshoot).
    pub fn quantity_sold(&self) -> i32 {
        (self.quantity_taken - self.quantity_returned).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(taken: i32, returned: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            quantity_taken: taken,
            quantity_returned: returned,
        }
    }

    #[test]
    fn sold_is_taken_minus_returned() {
        assert_eq!(line(40, 15).quantity_sold(), 25);
    }

    #[test]
    fn sold_clamps_at_zero_when_returns_overshoot() {
        assert_eq!(line(10, 12).quantity_sold(), 0);
    }
}
