/*!
 * # Authentication and Authorization Module
 *
 * Authentication is JWT-based: a login exchange issues an HS256 token and
 * every protected request carries it as a Bearer header. The auth
 * middleware validates the token, loads the account and its role's grant
 * row once, and stores the result as a [`CurrentUser`] request extension.
 *
 * Authorization is module/action based and handled by the permission
 * resolver in [`permissions`]: per-user overrides first, then the role's
 * stored grants, then the built-in role defaults.
 */

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{role_permission, user};

pub mod permissions;

pub use permissions::{Action, PermissionContext};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub username: String, // Login name, for log correlation only
    pub role: String,     // Coarse role at issue time
    pub jti: String,      // JWT ID (unique identifier for this token)
    pub iat: i64,         // Issued at time
    pub exp: i64,         // Expiration time
    pub nbf: i64,         // Not valid before time
    pub iss: String,      // Issuer
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Access token lifetime in seconds.
    pub token_expiration_secs: usize,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &crate::config::AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            token_expiration_secs: cfg.jwt_expiration,
        }
    }
}

/// Authentication service that handles password hashing and token
/// issuance/validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Hash a password for storage
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AuthError::InternalError(format!("Stored hash unreadable: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now + ChronoDuration::seconds(self.config.token_expiration_secs as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration_secs as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    /// Check a username/password pair and return the account on success.
    ///
    /// Failures are deliberately indistinguishable: a missing account, a
    /// disabled account and a wrong password all come back as
    /// `InvalidCredentials`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<user::Model, AuthError> {
        let account = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.is_active {
            debug!(username = %username, "Login attempt on inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        if !self.verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }
}

/// Token response returned by the login exchange
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// The authenticated principal for one request.
///
/// Loaded once by the auth middleware so permission checks further down
/// never touch the database again.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: user::Model,
    /// Stored grants for the user's role, when a row exists.
    pub role_grants: Option<serde_json::Value>,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    /// Permission view over this principal.
    pub fn permissions(&self) -> PermissionContext<'_> {
        PermissionContext {
            role: self.user.role,
            is_superuser: self.user.is_superuser,
            user_overrides: &self.user.module_permissions,
            role_grants: self.role_grants.as_ref(),
        }
    }

    /// Shorthand for a single module/action check.
    pub fn allows(&self, module: &str, action: Action) -> bool {
        self.permissions().allows(module, action)
    }

    /// Shorthand for "any action at all on this module".
    pub fn allows_any(&self, module: &str) -> bool {
        self.permissions().allows_any(module)
    }
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_DATABASE_ERROR",
                "Internal error".to_string(),
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Authentication middleware: validates the Bearer token, loads the
/// account and its role grant row, and stores a [`CurrentUser`] extension.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return AuthError::MissingAuth.into_response(),
    };

    let principal = match load_principal(&auth_service, &token).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(principal);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

async fn load_principal(
    auth_service: &AuthService,
    token: &str,
) -> Result<CurrentUser, AuthError> {
    let claims = auth_service.validate_token(token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    let account = user::Entity::find_by_id(user_id)
        .one(&*auth_service.db)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    if !account.is_active {
        return Err(AuthError::InvalidToken);
    }

    let role_grants = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(account.role))
        .one(&*auth_service.db)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .map(|row| row.permissions);

    Ok(CurrentUser {
        user: account,
        role_grants,
    })
}

/// Required module/action pair, used as middleware state.
#[derive(Clone, Debug)]
pub struct ModuleAction {
    pub module: String,
    pub action: Action,
}

/// Permission middleware: resolves the required module/action against the
/// principal loaded by [`auth_middleware`].
pub async fn permission_middleware(
    State(required): State<ModuleAction>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !principal.allows(&required.module, required.action) {
        debug!(
            user = %principal.user.username,
            module = %required.module,
            action = %required.action,
            "Permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to gate routes on a module/action pair
pub trait PermissionRouterExt {
    fn require_module(self, module: &str, action: Action) -> Self;
}

impl<S> PermissionRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn require_module(self, module: &str, action: Action) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            ModuleAction {
                module: module.to_string(),
                action,
            },
            permission_middleware,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::Database;
    use serde_json::json;

    fn test_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "cashier".to_string(),
            password_hash: String::new(),
            full_name: "Cashier One".to_string(),
            email: None,
            role: user::UserRole::Employee,
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

    async fn test_service() -> AuthService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        AuthService::new(
            AuthConfig {
                jwt_secret: "a".repeat(64),
                jwt_issuer: "backoffice-api".to_string(),
                token_expiration_secs: 3600,
            },
            Arc::new(db),
        )
    }

    #[tokio::test]
    async fn token_round_trip_preserves_subject() {
        let service = test_service().await;
        let user = test_user();

        let token = service.generate_token(&user).unwrap();
        let claims = service.validate_token(&token.access_token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "cashier");
        assert_eq!(claims.role, "EMPLOYEE");
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let service = test_service().await;
        let token = service.generate_token(&test_user()).unwrap();

        let mut tampered = token.access_token.clone();
        tampered.push('x');
        assert!(matches!(
            service.validate_token(&tampered),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn password_hash_verifies_and_rejects() {
        let service = test_service().await;
        let hash = service.hash_password("correct horse").unwrap();

        assert!(service.verify_password("correct horse", &hash).unwrap());
        assert!(!service.verify_password("wrong horse", &hash).unwrap());
    }
}
