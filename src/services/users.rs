use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::permissions::{modules, Action};
use crate::auth::{AuthService, CurrentUser, TokenResponse};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::user::{self, Entity as UserEntity, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::record_activity;

lazy_static! {
    static ref LOGINS: IntCounter = register_int_counter!(
        "logins_total",
        "Total number of successful logins"
    )
    .expect("metric can be created");
    static ref USERS_CREATED: IntCounter = register_int_counter!(
        "users_created_total",
        "Total number of user accounts created"
    )
    .expect("metric can be created");
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: String,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    pub role: UserRole,
    pub emp_id: Option<String>,
    pub emp_type: Option<String>,
    pub contact_number: Option<String>,
    #[serde(default)]
    pub account_holder_name: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub ifsc_code: String,
    #[serde(default)]
    pub branch: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub emp_id: Option<String>,
    pub emp_type: Option<String>,
    pub contact_number: Option<String>,
    pub account_holder_name: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub branch: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Replaces a user's per-module overrides wholesale.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct SetModulePermissionsRequest {
    pub module_permissions: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub emp_id: Option<String>,
    pub emp_type: Option<String>,
    pub contact_number: Option<String>,
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub branch: String,
    pub module_permissions: serde_json::Value,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            email: model.email,
            role: model.role,
            emp_id: model.emp_id,
            emp_type: model.emp_type,
            contact_number: model.contact_number,
            account_holder_name: model.account_holder_name,
            bank_name: model.bank_name,
            account_number: model.account_number,
            ifsc_code: model.ifsc_code,
            branch: model.branch,
            module_permissions: model.module_permissions,
            is_staff: model.is_staff,
            is_superuser: model.is_superuser,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct UserListFilter {
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    /// Substring match over username and full name.
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for accounts and login
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
    auth_service: Arc<AuthService>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    /// Creates a new user service
    pub fn new(
        db_pool: Arc<DbPool>,
        config: Arc<AppConfig>,
        auth_service: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            config,
            auth_service,
            event_sender,
        }
    }

    /// Exchanges a username/password pair for a token. Every successful
    /// login leaves an activity row.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        let account = self
            .auth_service
            .authenticate(&request.username, &request.password)
            .await?;
        let TokenResponse {
            access_token,
            token_type,
            expires_in,
        } = self.auth_service.generate_token(&account)?;

        record_activity(&*self.db_pool, account.id, "Login").await?;
        LOGINS.inc();
        info!(username = %account.username, "login successful");

        Ok(LoginResponse {
            access_token,
            token_type,
            expires_in,
            user: account.into(),
        })
    }

    /// Creates an account. Staff access follows from the role; superuser
    /// accounts are never created through the API.
    #[instrument(skip(self, actor, request), fields(username = %request.username, actor_id = %actor.id()))]
    pub async fn create_user(
        &self,
        actor: &CurrentUser,
        request: CreateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let username = request.username.trim().to_string();
        let existing = UserEntity::find()
            .filter(user::Column::Username.eq(username.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username {} is already taken",
                username
            )));
        }
        let password_hash = self.auth_service.hash_password(&request.password)?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.clone()),
            password_hash: Set(password_hash),
            full_name: Set(request.full_name.trim().to_string()),
            email: Set(request.email),
            role: Set(request.role),
            emp_id: Set(request.emp_id),
            emp_type: Set(request.emp_type),
            contact_number: Set(request.contact_number),
            account_holder_name: Set(request.account_holder_name),
            bank_name: Set(request.bank_name),
            account_number: Set(request.account_number),
            ifsc_code: Set(request.ifsc_code),
            branch: Set(request.branch),
            module_permissions: Set(serde_json::json!({})),
            is_staff: Set(request.role.grants_staff_access()),
            is_superuser: Set(false),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;
        record_activity(&txn, actor.id(), format!("Created user {}", username)).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        USERS_CREATED.inc();
        info!(username = %username, role = %account.role, "user created");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::UserCreated(account.id)).await {
                warn!("Failed to send user created event: {}", e);
            }
        }

        Ok(account.into())
    }

    /// Updates account details. A role change re-derives staff access;
    /// superusers keep it regardless of role.
    #[instrument(skip(self, actor, request), fields(user_id = %user_id, actor_id = %actor.id()))]
    pub async fn update_user(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let account = UserEntity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let username = account.username.clone();
        let is_superuser = account.is_superuser;
        let mut active: user::ActiveModel = account.into();
        if let Some(full_name) = request.full_name {
            active.full_name = Set(full_name.trim().to_string());
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(role) = request.role {
            active.role = Set(role);
            active.is_staff = Set(is_superuser || role.grants_staff_access());
        }
        if let Some(emp_id) = request.emp_id {
            active.emp_id = Set(Some(emp_id));
        }
        if let Some(emp_type) = request.emp_type {
            active.emp_type = Set(Some(emp_type));
        }
        if let Some(contact_number) = request.contact_number {
            active.contact_number = Set(Some(contact_number));
        }
        if let Some(account_holder_name) = request.account_holder_name {
            active.account_holder_name = Set(account_holder_name);
        }
        if let Some(bank_name) = request.bank_name {
            active.bank_name = Set(bank_name);
        }
        if let Some(account_number) = request.account_number {
            active.account_number = Set(account_number);
        }
        if let Some(ifsc_code) = request.ifsc_code {
            active.ifsc_code = Set(ifsc_code);
        }
        if let Some(branch) = request.branch {
            active.branch = Set(branch);
        }
        active.updated_at = Set(Some(Utc::now()));
        let account = active.update(&txn).await?;
        record_activity(&txn, actor.id(), format!("Updated user {}", username)).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(username = %username, "user updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::UserUpdated(user_id)).await {
                warn!("Failed to send user updated event: {}", e);
            }
        }

        Ok(account.into())
    }

    /// Disables an account. Accounts are never deleted; history keeps
    /// pointing at them.
    #[instrument(skip(self, actor), fields(user_id = %user_id, actor_id = %actor.id()))]
    pub async fn deactivate_user(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
    ) -> Result<UserResponse, ServiceError> {
        if user_id == actor.id() {
            return Err(ServiceError::InvalidOperation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let account = UserEntity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        if account.is_superuser {
            return Err(ServiceError::InvalidOperation(
                "Superuser accounts cannot be deactivated".to_string(),
            ));
        }
        if !account.is_active {
            return Err(ServiceError::InvalidOperation(
                "Account is already inactive".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let username = account.username.clone();
        let mut active: user::ActiveModel = account.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let account = active.update(&txn).await?;
        record_activity(&txn, actor.id(), format!("Deactivated user {}", username)).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(username = %username, "user deactivated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::UserDeactivated(user_id)).await {
                warn!("Failed to send user deactivated event: {}", e);
            }
        }

        Ok(account.into())
    }

    /// Re-enables a previously deactivated account.
    #[instrument(skip(self, actor), fields(user_id = %user_id, actor_id = %actor.id()))]
    pub async fn reactivate_user(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
    ) -> Result<UserResponse, ServiceError> {
        let db = &*self.db_pool;
        let account = UserEntity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        if account.is_active {
            return Err(ServiceError::InvalidOperation(
                "Account is already active".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let username = account.username.clone();
        let mut active: user::ActiveModel = account.into();
        active.is_active = Set(true);
        active.updated_at = Set(Some(Utc::now()));
        let account = active.update(&txn).await?;
        record_activity(&txn, actor.id(), format!("Reactivated user {}", username)).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(username = %username, "user reactivated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::UserUpdated(user_id)).await {
                warn!("Failed to send user updated event: {}", e);
            }
        }

        Ok(account.into())
    }

    /// Changes the caller's own password after verifying the current one.
    #[instrument(skip_all, fields(actor_id = %actor.id()))]
    pub async fn change_password(
        &self,
        actor: &CurrentUser,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        if !self
            .auth_service
            .verify_password(&request.current_password, &actor.user.password_hash)?
        {
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        let password_hash = self.auth_service.hash_password(&request.new_password)?;
        let db = &*self.db_pool;
        let account = UserEntity::find_by_id(actor.id())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Account no longer exists".to_string()))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;
        record_activity(&txn, actor.id(), "Changed password").await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!("password changed");
        Ok(())
    }

    /// Replaces a user's per-module permission overrides. Admins only;
    /// these overrides outrank the role's stored grants.
    #[instrument(skip(self, actor, request), fields(user_id = %user_id, actor_id = %actor.id()))]
    pub async fn set_module_permissions(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        request: SetModulePermissionsRequest,
    ) -> Result<UserResponse, ServiceError> {
        if !is_admin(actor) {
            return Err(ServiceError::Forbidden(
                "Only admins can edit module permissions".to_string(),
            ));
        }
        let violations = validate_permission_document(&request.module_permissions);
        if !violations.is_empty() {
            return Err(ServiceError::validation(violations));
        }
        let db = &*self.db_pool;
        let account = UserEntity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let username = account.username.clone();
        let mut active: user::ActiveModel = account.into();
        active.module_permissions = Set(request.module_permissions);
        active.updated_at = Set(Some(Utc::now()));
        let account = active.update(&txn).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Updated module permissions for {}", username),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(username = %username, "module permissions updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::UserUpdated(user_id)).await {
                warn!("Failed to send user updated event: {}", e);
            }
        }

        Ok(account.into())
    }

    /// Fetches one account.
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let account = UserEntity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        Ok(account.into())
    }

    /// Lists accounts alphabetically by username.
    pub async fn list_users(
        &self,
        filter: UserListFilter,
    ) -> Result<UserListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = UserEntity::find();
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role));
        }
        if let Some(active) = filter.active {
            query = query.filter(user::Column::IsActive.eq(active));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(user::Column::Username.contains(q))
                    .add(user::Column::FullName.contains(q)),
            );
        }

        let paginator = query
            .order_by_asc(user::Column::Username)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let users = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect();

        Ok(UserListResponse {
            users,
            total,
            page,
            per_page,
        })
    }
}

fn is_admin(actor: &CurrentUser) -> bool {
    actor.user.is_superuser || actor.user.role == UserRole::Admin
}

/// Checks an override document: an object whose keys are known modules
/// and whose values are either a bool or an action map of booleans.
pub(crate) fn validate_permission_document(document: &serde_json::Value) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = document.as_object() else {
        return vec!["Module permissions must be an object".to_string()];
    };
    for (module, value) in map {
        let known = modules::ALL.contains(&module.as_str())
            || module == modules::LEGACY_BILLING
            || module == modules::LEGACY_INVOICES;
        if !known {
            violations.push(format!("Unknown module {}", module));
            continue;
        }
        match value {
            serde_json::Value::Bool(_) => {}
            serde_json::Value::Object(actions) => {
                for (action, flag) in actions {
                    if !Action::ALL.iter().any(|a| a.as_str() == action) {
                        violations.push(format!("{}: unknown action {}", module, action));
                    } else if !flag.is_boolean() {
                        violations.push(format!("{}: action {} must be a boolean", module, action));
                    }
                }
            }
            _ => violations.push(format!(
                "{}: value must be a boolean or an action map",
                module
            )),
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_boolean_and_action_map_overrides() {
        let doc = json!({
            "inventory": true,
            "sales_bill": {"view": true, "create": false},
            "billing": false,
        });
        assert!(validate_permission_document(&doc).is_empty());
    }

    #[test]
    fn rejects_unknown_modules_and_actions() {
        let doc = json!({
            "warehouse": true,
            "inventory": {"view": true, "fly": true},
            "payroll": {"view": "yes"},
        });
        let violations = validate_permission_document(&doc);
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.contains("Unknown module warehouse")));
        assert!(violations.iter().any(|v| v.contains("unknown action fly")));
        assert!(violations.iter().any(|v| v.contains("must be a boolean")));
    }

    #[test]
    fn rejects_non_object_documents() {
        let violations = validate_permission_document(&json!([1, 2, 3]));
        assert_eq!(violations, vec!["Module permissions must be an object".to_string()]);
    }
}
