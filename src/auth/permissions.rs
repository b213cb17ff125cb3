/*!
 * # Permissions Module
 *
 * Access is expressed as module/action grants. A grants document is a JSON
 * object keyed by module name where each value is either a boolean
 * (decides every action) or an action map (`{"view": true, ...}`).
 *
 * Resolution layers three sources, most specific first:
 *
 * 1. the account's own `module_permissions` overrides,
 * 2. the stored grant row for the account's role,
 * 3. built-in role defaults, for installations that have never edited
 *    role grants.
 *
 * Admins and superusers skip resolution entirely. Within an action map a
 * missing action key is a denial, not a fall-through: an override that
 * names a module takes full ownership of it.
 */

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::entities::user::UserRole;

/// Canonical permission module names.
pub mod modules {
    pub const USERS: &str = "users";
    pub const ITEMS: &str = "items";
    pub const CUSTOMERS: &str = "customers";
    pub const SALES_BILL: &str = "sales_bill";
    pub const OUTER_BILL: &str = "outer_bill";
    pub const INNER_BILL: &str = "inner_bill";
    pub const INVENTORY: &str = "inventory";
    pub const VENDORS: &str = "vendors";
    pub const EMPLOYEES: &str = "employees";
    pub const ATTENDANCE: &str = "attendance";
    pub const WORKLOGS: &str = "worklogs";
    pub const PURCHASES: &str = "purchases";
    pub const VENDOR_PAYMENTS: &str = "vendor_payments";
    pub const PAYROLL: &str = "payroll";
    pub const REPORTS: &str = "reports";

    /// Legacy module names from before billing was split per bill type.
    /// Honored by the fallback defaults so old deployments keep working.
    pub const LEGACY_BILLING: &str = "billing";
    pub const LEGACY_INVOICES: &str = "invoices";

    pub const ALL: [&str; 15] = [
        USERS,
        ITEMS,
        CUSTOMERS,
        SALES_BILL,
        OUTER_BILL,
        INNER_BILL,
        INVENTORY,
        VENDORS,
        EMPLOYEES,
        ATTENDANCE,
        WORKLOGS,
        PURCHASES,
        VENDOR_PAYMENTS,
        PAYROLL,
        REPORTS,
    ];
}

/// Actions a grant can speak to.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// What a grants document says about one module.
#[derive(Clone, Debug, PartialEq)]
pub enum PermissionValue {
    /// Module not mentioned; the next layer decides.
    Absent,
    /// Blanket answer for every action on the module.
    Boolean(bool),
    /// Per-action answers. Actions not listed are denied.
    ActionMap(HashMap<String, bool>),
}

impl PermissionValue {
    /// Reads the value stored for `module` out of a grants document.
    /// Null or malformed entries behave as if the module were not
    /// mentioned at all.
    pub fn from_document(doc: &Value, module: &str) -> Self {
        match doc.get(module) {
            Some(Value::Bool(b)) => PermissionValue::Boolean(*b),
            Some(Value::Object(map)) => PermissionValue::ActionMap(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.as_bool().unwrap_or(false)))
                    .collect(),
            ),
            _ => PermissionValue::Absent,
        }
    }

    /// The answer for one action, or `None` when the next layer decides.
    pub fn decide(&self, action: Action) -> Option<bool> {
        match self {
            PermissionValue::Absent => None,
            PermissionValue::Boolean(b) => Some(*b),
            PermissionValue::ActionMap(map) => {
                Some(map.get(action.as_str()).copied().unwrap_or(false))
            }
        }
    }

    /// Whether any action at all is granted, or `None` when the next
    /// layer decides.
    pub fn decide_any(&self) -> Option<bool> {
        match self {
            PermissionValue::Absent => None,
            PermissionValue::Boolean(b) => Some(*b),
            PermissionValue::ActionMap(map) => Some(map.values().any(|allowed| *allowed)),
        }
    }
}

/// A resolved view over one principal's permission sources.
#[derive(Clone, Copy, Debug)]
pub struct PermissionContext<'a> {
    pub role: UserRole,
    pub is_superuser: bool,
    /// The account's `module_permissions` document.
    pub user_overrides: &'a Value,
    /// The stored grant row for the role, when one exists.
    pub role_grants: Option<&'a Value>,
}

impl PermissionContext<'_> {
    /// Whether this principal may perform `action` on `module`.
    pub fn allows(&self, module: &str, action: Action) -> bool {
        if self.bypasses_checks() {
            return true;
        }

        if let Some(decision) =
            PermissionValue::from_document(self.user_overrides, module).decide(action)
        {
            return decision;
        }

        // A stored role row owns the decision outright. Built-in defaults
        // only apply when no row has ever been saved for the role.
        match self.role_grants {
            Some(grants) => PermissionValue::from_document(grants, module)
                .decide(action)
                .unwrap_or(false),
            None => default_role_allows(self.role, module),
        }
    }

    /// Whether this principal may perform at least one action on
    /// `module`. Used for surfaces that only need "can see the area".
    pub fn allows_any(&self, module: &str) -> bool {
        if self.bypasses_checks() {
            return true;
        }

        if let Some(decision) = PermissionValue::from_document(self.user_overrides, module)
            .decide_any()
        {
            return decision;
        }

        match self.role_grants {
            Some(grants) => PermissionValue::from_document(grants, module)
                .decide_any()
                .unwrap_or(false),
            None => default_role_allows(self.role, module),
        }
    }

    fn bypasses_checks(&self) -> bool {
        self.is_superuser || self.role == UserRole::Admin
    }
}

/// One built-in grant: a module plus the actions the role gets on it.
///
/// The same table drives two different consumers with two different module
/// vocabularies. The pre-row fallback answers with the module names the old
/// deployment used (`billing`, `invoices`), while seeding writes rows with
/// the canonical per-area names. Each grant says which of the two it
/// participates in.
#[derive(Clone, Copy, Debug)]
pub struct ModuleGrant {
    pub module: &'static str,
    pub actions: &'static [Action],
    /// Counts for the no-row fallback (action-insensitive membership).
    pub fallback: bool,
    /// Written into the role's stored row by the seeding routine.
    pub seeded: bool,
}

const FULL: &[Action] = &Action::ALL;

const fn grant(module: &'static str) -> ModuleGrant {
    ModuleGrant {
        module,
        actions: FULL,
        fallback: true,
        seeded: true,
    }
}

const fn seeded_grant(module: &'static str) -> ModuleGrant {
    ModuleGrant {
        module,
        actions: FULL,
        fallback: false,
        seeded: true,
    }
}

const fn fallback_grant(module: &'static str) -> ModuleGrant {
    ModuleGrant {
        module,
        actions: FULL,
        fallback: true,
        seeded: false,
    }
}

lazy_static! {
    /// Built-in grants per role. The fallback resolver matches module
    /// names action-insensitively (old behavior); seeding expands the
    /// seeded entries into stored rows with their action subsets.
    pub static ref DEFAULT_ROLE_POLICY: HashMap<UserRole, Vec<ModuleGrant>> = {
        use modules::*;

        let mut policy = HashMap::new();

        policy.insert(
            UserRole::Supervisor,
            ALL.iter().map(|m| grant(m)).collect::<Vec<_>>(),
        );

        policy.insert(
            UserRole::Accountant,
            vec![
                grant(PURCHASES),
                grant(VENDOR_PAYMENTS),
                grant(PAYROLL),
                grant(WORKLOGS),
                grant(ATTENDANCE),
                seeded_grant(SALES_BILL),
                seeded_grant(OUTER_BILL),
                seeded_grant(INNER_BILL),
                seeded_grant(VENDORS),
                seeded_grant(REPORTS),
                fallback_grant(LEGACY_BILLING),
                fallback_grant(LEGACY_INVOICES),
            ],
        );

        policy.insert(
            UserRole::Employee,
            vec![
                seeded_grant(SALES_BILL),
                seeded_grant(OUTER_BILL),
                seeded_grant(INNER_BILL),
                fallback_grant(LEGACY_BILLING),
                fallback_grant(LEGACY_INVOICES),
            ],
        );

        policy.insert(
            UserRole::Student,
            vec![ModuleGrant {
                module: INVENTORY,
                actions: &[Action::View, Action::Create, Action::Edit],
                fallback: true,
                seeded: true,
            }],
        );

        policy
    };
}

/// Built-in fallback used when no grant row exists for the role.
/// Supervisors get everything; other roles get module membership from the
/// policy table, any action.
pub fn default_role_allows(role: UserRole, module: &str) -> bool {
    match role {
        UserRole::Admin | UserRole::Supervisor => true,
        _ => DEFAULT_ROLE_POLICY
            .get(&role)
            .map(|grants| grants.iter().any(|g| g.fallback && g.module == module))
            .unwrap_or(false),
    }
}

/// Grants document written when seeding a role's permission row. Full
/// grants are stored as booleans, partial grants as action maps.
pub fn seeded_role_grants(role: UserRole) -> Value {
    let mut doc = Map::new();

    if let Some(grants) = DEFAULT_ROLE_POLICY.get(&role) {
        for g in grants.iter().filter(|g| g.seeded) {
            if g.actions.len() == Action::ALL.len() {
                doc.insert(g.module.to_string(), json!(true));
            } else {
                let mut actions = Map::new();
                for action in Action::ALL {
                    actions.insert(
                        action.as_str().to_string(),
                        json!(g.actions.contains(&action)),
                    );
                }
                doc.insert(g.module.to_string(), Value::Object(actions));
            }
        }
    }

    Value::Object(doc)
}

/// Operator-facing description stored alongside seeded grants.
pub fn seeded_role_description(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "Full access; permission checks do not apply",
        UserRole::Supervisor => "Full access to every module",
        UserRole::Accountant => "Billing, purchasing, payroll and workforce records",
        UserRole::Employee => "Bill entry across all bill types",
        UserRole::Student => "Inventory sessions, without deletion",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx<'a>(
        role: UserRole,
        overrides: &'a Value,
        role_grants: Option<&'a Value>,
    ) -> PermissionContext<'a> {
        PermissionContext {
            role,
            is_superuser: false,
            user_overrides: overrides,
            role_grants,
        }
    }

    #[test]
    fn admin_is_always_allowed() {
        let overrides = json!({ "sales_bill": false });
        let c = ctx(UserRole::Admin, &overrides, None);
        assert!(c.allows("sales_bill", Action::Delete));
        assert!(c.allows("anything_at_all", Action::View));
    }

    #[test]
    fn superuser_bypasses_even_with_deny_override() {
        let overrides = json!({ "payroll": false });
        let c = PermissionContext {
            role: UserRole::Student,
            is_superuser: true,
            user_overrides: &overrides,
            role_grants: None,
        };
        assert!(c.allows("payroll", Action::Delete));
    }

    #[test]
    fn boolean_override_decides_both_ways() {
        let allow = json!({ "payroll": true });
        let deny = json!({ "billing": false });

        // Student has no payroll access by default; the override grants it.
        assert!(ctx(UserRole::Student, &allow, None).allows("payroll", Action::Delete));
        // Employee would have billing by default; the override removes it.
        assert!(!ctx(UserRole::Employee, &deny, None).allows("billing", Action::View));
    }

    #[test]
    fn action_map_override_missing_key_denies() {
        // The map takes ownership of the module: "delete" is absent from
        // the map, so it is denied rather than falling back to the role.
        let overrides = json!({ "sales_bill": { "view": true, "create": true } });
        let c = ctx(UserRole::Employee, &overrides, None);

        assert!(c.allows("sales_bill", Action::View));
        assert!(c.allows("sales_bill", Action::Create));
        assert!(!c.allows("sales_bill", Action::Delete));
        assert!(!c.allows("sales_bill", Action::Edit));
    }

    #[test]
    fn unmentioned_module_falls_through_to_role() {
        let overrides = json!({ "sales_bill": { "view": true } });
        // inventory is not in the override, so the employee role decides,
        // and employees have no inventory access.
        let c = ctx(UserRole::Employee, &overrides, None);
        assert!(!c.allows("inventory", Action::View));
    }

    #[test]
    fn role_row_action_map_is_authoritative() {
        let overrides = json!({});
        let grants = json!({ "sales_bill": { "view": true, "create": false } });
        let c = ctx(UserRole::Employee, &overrides, Some(&grants));

        assert!(c.allows("sales_bill", Action::View));
        assert!(!c.allows("sales_bill", Action::Create));
        // Module missing from a stored row is a denial, not a fall-through
        // to the built-in defaults.
        assert!(!c.allows("outer_bill", Action::View));
    }

    #[test]
    fn role_row_boolean_grants_every_action() {
        let overrides = json!({});
        let grants = json!({ "reports": true });
        let c = ctx(UserRole::Student, &overrides, Some(&grants));

        assert!(c.allows("reports", Action::View));
        assert!(c.allows("reports", Action::Delete));
    }

    #[test]
    fn defaults_supervisor_gets_everything() {
        let overrides = json!({});
        let c = ctx(UserRole::Supervisor, &overrides, None);
        assert!(c.allows("payroll", Action::Delete));
        assert!(c.allows("users", Action::Create));
        assert!(c.allows("some_future_module", Action::View));
    }

    #[test]
    fn defaults_accountant_matches_the_legacy_table() {
        let overrides = json!({});
        let c = ctx(UserRole::Accountant, &overrides, None);

        for module in [
            "billing",
            "invoices",
            "payroll",
            "vendor_payments",
            "purchases",
            "worklogs",
            "attendance",
        ] {
            assert!(c.allows(module, Action::View), "accountant lost {}", module);
        }

        // Canonical per-area names only exist in stored rows; the fallback
        // answers with the old vocabulary.
        for module in ["sales_bill", "vendors", "reports", "users", "inventory"] {
            assert!(!c.allows(module, Action::View), "accountant gained {}", module);
        }
    }

    #[test]
    fn defaults_employee_covers_bill_entry_only() {
        let overrides = json!({});
        let c = ctx(UserRole::Employee, &overrides, None);

        assert!(c.allows("billing", Action::Create));
        assert!(c.allows("invoices", Action::View));
        assert!(!c.allows("sales_bill", Action::Create));
        assert!(!c.allows("payroll", Action::View));
        assert!(!c.allows("inventory", Action::View));
    }

    #[test]
    fn fallback_and_seeded_vocabularies_differ() {
        let overrides = json!({});

        // Without a row an accountant reaches vendors through nothing;
        // the seeded row grants the canonical module directly.
        assert!(!ctx(UserRole::Accountant, &overrides, None).allows("vendors", Action::View));

        let grants = seeded_role_grants(UserRole::Accountant);
        let c = ctx(UserRole::Accountant, &overrides, Some(&grants));
        assert!(c.allows("vendors", Action::View));
        assert!(c.allows("sales_bill", Action::Edit));
        // The row does not carry the legacy names.
        assert!(!c.allows("billing", Action::View));
    }

    #[test]
    fn defaults_student_covers_inventory_only() {
        let overrides = json!({});
        let c = ctx(UserRole::Student, &overrides, None);

        // Fallback matching is action-insensitive by design.
        assert!(c.allows("inventory", Action::View));
        assert!(c.allows("inventory", Action::Delete));
        assert!(!c.allows("sales_bill", Action::View));
    }

    #[test]
    fn null_and_malformed_entries_fall_through() {
        let overrides = json!({ "inventory": null, "payroll": "yes" });
        let c = ctx(UserRole::Student, &overrides, None);

        // null: the student default still grants inventory.
        assert!(c.allows("inventory", Action::View));
        // malformed scalar: treated as unmentioned, student default denies.
        assert!(!c.allows("payroll", Action::View));
    }

    #[test]
    fn allows_any_reads_action_maps() {
        let overrides = json!({ "inventory": { "view": false, "create": false } });
        let c = ctx(UserRole::Student, &overrides, None);
        assert!(!c.allows_any("inventory"));

        let overrides = json!({ "inventory": { "view": false, "create": true } });
        let c = ctx(UserRole::Student, &overrides, None);
        assert!(c.allows_any("inventory"));
    }

    #[test]
    fn seeded_student_grants_exclude_delete() {
        let doc = seeded_role_grants(UserRole::Student);
        assert_eq!(
            doc,
            json!({
                "inventory": {
                    "view": true,
                    "create": true,
                    "edit": true,
                    "delete": false,
                }
            })
        );
    }

    #[test]
    fn seeded_supervisor_grants_cover_all_modules() {
        let doc = seeded_role_grants(UserRole::Supervisor);
        let map = doc.as_object().unwrap();
        assert_eq!(map.len(), modules::ALL.len());
        assert!(map.values().all(|v| v == &json!(true)));
    }

    #[test]
    fn seeded_grants_omit_legacy_modules() {
        let doc = seeded_role_grants(UserRole::Accountant);
        let map = doc.as_object().unwrap();
        assert!(!map.contains_key("billing"));
        assert!(!map.contains_key("invoices"));
        assert_eq!(map.len(), 10);
    }

    #[test]
    fn seeded_rows_resolve_like_the_live_resolver() {
        let overrides = json!({});
        let grants = seeded_role_grants(UserRole::Student);
        let c = ctx(UserRole::Student, &overrides, Some(&grants));

        assert!(c.allows("inventory", Action::View));
        assert!(c.allows("inventory", Action::Create));
        assert!(c.allows("inventory", Action::Edit));
        // The seeded row is stricter than the action-insensitive fallback.
        assert!(!c.allows("inventory", Action::Delete));
    }
}
