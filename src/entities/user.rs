use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the role assigned to an account.
///
/// Roles are coarse: fine-grained access comes from the permission
/// resolver, which layers per-user overrides and per-role grants on top.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "SUPERVISOR")]
    Supervisor,
    #[sea_orm(string_value = "ACCOUNTANT")]
    Accountant,
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
    #[sea_orm(string_value = "STUDENT")]
    Student,
}

impl UserRole {
    /// Roles that get back-office staff access by default.
    pub fn grants_staff_access(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Supervisor)
    }
}

/// The `users` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key: Unique identifier for the account.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique login name.
    pub username: String,

    /// Argon2 hash of the account password.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name.
    pub full_name: String,

    /// Optional contact email.
    pub email: Option<String>,

    /// Coarse role for the account.
    pub role: UserRole,

    /// Optional employee code, unique when present.
    pub emp_id: Option<String>,

    /// Free-form employment category (e.g. full-time, part-time).
    pub emp_type: Option<String>,

    /// Optional phone number.
    pub contact_number: Option<String>,

    /// Bank details used by payroll exports.
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub branch: String,

    /// Per-user permission overrides, taking precedence over role grants.
    /// A module key maps to either a boolean or an action map.
    pub module_permissions: Json,

    /// Whether the account may use staff surfaces.
    pub is_staff: bool,

    /// Superusers bypass all permission checks and are never demoted.
    pub is_superuser: bool,

    /// Inactive accounts cannot log in.
    pub is_active: bool,

    /// Timestamp when the account was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the account was last updated.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Define relations for the `users` table.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::activity_log::Entity")]
    ActivityLogs,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,

    #[sea_orm(has_many = "super::work_log::Entity")]
    WorkLogs,
}

impl Related<super::activity_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityLogs.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl Related<super::work_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Staff flag derived from the role. Superusers keep staff access no
    /// matter which role they carry.
    pub fn derived_is_staff(&self) -> bool {
        self.is_superuser || self.role.grants_staff_access()
    }

    /// True when the account bypasses permission checks entirely.
    pub fn bypasses_permission_checks(&self) -> bool {
        self.is_superuser || self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn make_user(role: UserRole) -> Model {
        Model {
            id: Uuid::new_v4(),
            username: "asha".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Asha Verma".to_string(),
            email: None,
            role,
            emp_id: None,
            emp_type: None,
            contact_number: None,
            account_holder_name: String::new(),
            bank_name: String::new(),
            account_number: String::new(),
            ifsc_code: String::new(),
            branch: String::new(),
            module_permissions: json!({}),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn staff_access_follows_role() {
        assert!(make_user(UserRole::Admin).derived_is_staff());
        assert!(make_user(UserRole::Supervisor).derived_is_staff());
        assert!(!make_user(UserRole::Accountant).derived_is_staff());
        assert!(!make_user(UserRole::Employee).derived_is_staff());
        assert!(!make_user(UserRole::Student).derived_is_staff());
    }

    #[test]
    fn superuser_keeps_staff_access_regardless_of_role() {
        let mut user = make_user(UserRole::Student);
        user.is_superuser = true;
        assert!(user.derived_is_staff());
        assert!(user.bypasses_permission_checks());
    }

    #[test]
    fn admin_bypasses_permission_checks() {
        assert!(make_user(UserRole::Admin).bypasses_permission_checks());
        assert!(!make_user(UserRole::Supervisor).bypasses_permission_checks());
    }
}
