use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::permissions::{seeded_role_description, seeded_role_grants};
use crate::auth::CurrentUser;
use crate::db::DbPool;
use crate::entities::role_permission::{self, Entity as RolePermissionEntity};
use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::record_activity;
use crate::services::users::validate_permission_document;

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct UpdateRolePermissionsRequest {
    pub permissions: serde_json::Value,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RolePermissionsResponse {
    pub role: UserRole,
    pub permissions: serde_json::Value,
    pub description: String,
    /// False when no row is stored and the built-in defaults apply.
    pub stored: bool,
}

/// Service for the editable per-role permission grants.
///
/// A stored row replaces the built-in defaults for that role entirely, so
/// reads surface the seeded document when no row exists rather than an
/// empty grant set.
#[derive(Clone)]
pub struct RolePermissionService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl RolePermissionService {
    /// Creates a new role permission service
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Lists the grant documents for every role, stored or default.
    pub async fn list_roles(&self) -> Result<Vec<RolePermissionsResponse>, ServiceError> {
        let rows = RolePermissionEntity::find().all(&*self.db_pool).await?;
        Ok(UserRole::iter()
            .map(|role| {
                match rows.iter().find(|row| row.role == role) {
                    Some(row) => RolePermissionsResponse {
                        role,
                        permissions: row.permissions.clone(),
                        description: row.description.clone(),
                        stored: true,
                    },
                    None => RolePermissionsResponse {
                        role,
                        permissions: seeded_role_grants(role),
                        description: seeded_role_description(role).to_string(),
                        stored: false,
                    },
                }
            })
            .collect())
    }

    /// Fetches the grant document for one role.
    pub async fn get_role(&self, role: UserRole) -> Result<RolePermissionsResponse, ServiceError> {
        let row = RolePermissionEntity::find()
            .filter(role_permission::Column::Role.eq(role))
            .one(&*self.db_pool)
            .await?;
        Ok(match row {
            Some(row) => RolePermissionsResponse {
                role,
                permissions: row.permissions,
                description: row.description,
                stored: true,
            },
            None => RolePermissionsResponse {
                role,
                permissions: seeded_role_grants(role),
                description: seeded_role_description(role).to_string(),
                stored: false,
            },
        })
    }

    /// Replaces the stored grants for a role. Admins only; takes effect
    /// on the next request of every account holding the role.
    #[instrument(skip(self, actor, request), fields(role = %role, actor_id = %actor.id()))]
    pub async fn update_role(
        &self,
        actor: &CurrentUser,
        role: UserRole,
        request: UpdateRolePermissionsRequest,
    ) -> Result<RolePermissionsResponse, ServiceError> {
        if !is_admin(actor) {
            return Err(ServiceError::Forbidden(
                "Only admins can edit role permissions".to_string(),
            ));
        }
        let violations = validate_permission_document(&request.permissions);
        if !violations.is_empty() {
            return Err(ServiceError::validation(violations));
        }
        let db = &*self.db_pool;
        let existing = RolePermissionEntity::find()
            .filter(role_permission::Column::Role.eq(role))
            .one(db)
            .await?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let row = match existing {
            Some(row) => {
                let mut active: role_permission::ActiveModel = row.into();
                active.permissions = Set(request.permissions);
                if let Some(description) = request.description {
                    active.description = Set(description);
                }
                active.update(&txn).await?
            }
            None => {
                role_permission::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    role: Set(role),
                    permissions: Set(request.permissions),
                    description: Set(request
                        .description
                        .unwrap_or_else(|| seeded_role_description(role).to_string())),
                }
                .insert(&txn)
                .await?
            }
        };
        record_activity(
            &txn,
            actor.id(),
            format!("Updated permissions for role {}", role),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(role = %role, "role permissions updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::RolePermissionsChanged {
                    role: role.to_string(),
                })
                .await
            {
                warn!("Failed to send role permissions changed event: {}", e);
            }
        }

        Ok(RolePermissionsResponse {
            role,
            permissions: row.permissions,
            description: row.description,
            stored: true,
        })
    }
}

fn is_admin(actor: &CurrentUser) -> bool {
    actor.user.is_superuser || actor.user.role == UserRole::Admin
}

/// Inserts the seeded grant row for any role that has none. Existing
/// rows are left untouched so operator edits survive restarts.
pub async fn seed_default_role_permissions<C: ConnectionTrait>(
    conn: &C,
) -> Result<usize, ServiceError> {
    let existing: Vec<UserRole> = RolePermissionEntity::find()
        .all(conn)
        .await?
        .into_iter()
        .map(|row| row.role)
        .collect();

    let mut seeded = 0;
    for role in UserRole::iter() {
        if existing.contains(&role) {
            continue;
        }
        role_permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            role: Set(role),
            permissions: Set(seeded_role_grants(role)),
            description: Set(seeded_role_description(role).to_string()),
        }
        .insert(conn)
        .await?;
        seeded += 1;
    }
    if seeded > 0 {
        info!(seeded, "seeded default role permissions");
    }
    Ok(seeded)
}
