use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;

/// The `role_permissions` table. One row per role holding the editable
/// module grants for that role. Absence of a row means the resolver falls
/// back to the built-in defaults for that role.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role_permissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Role this row configures, unique per table.
    pub role: UserRole,

    /// Module name mapped to either a boolean or an action map.
    pub permissions: Json,

    /// Operator-facing note about what this grant set is for.
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
