use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware, Router,
};
use fake::{faker::name::en::Name, Fake};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use backoffice_api::{
    auth::{auth_middleware, AuthConfig, AuthService, CurrentUser},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{customer, item, user, user::UserRole, vendor},
    events::{self, EventSender},
    handlers::AppServices,
    services::roles::seed_default_role_permissions,
    AppState,
};

const TEST_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Helper harness backed by an in-memory SQLite database.
///
/// The pool is pinned to a single connection so the in-memory database
/// survives across queries.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        seed_default_role_permissions(&*db_arc)
            .await
            .expect("failed to seed role permissions");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cfg = Arc::new(cfg);
        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
        ));

        let services = AppServices::new(
            db_arc.clone(),
            cfg.clone(),
            auth_service.clone(),
            Some(event_sender.clone()),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            auth_service: auth_service.clone(),
            event_sender: Some(event_sender),
            services,
        };

        let protected = backoffice_api::api_v1_routes().layer(middleware::from_fn_with_state(
            auth_service.clone(),
            auth_middleware,
        ));

        let router = Router::new()
            .merge(backoffice_api::handlers::health::health_routes())
            .nest("/auth", backoffice_api::handlers::auth::auth_public_routes())
            .nest("/api/v1", protected)
            .with_state(state.clone());

        Self {
            router,
            state,
            auth_service,
            _event_task: event_task,
        }
    }

    /// Insert an account with the given role. Password is always
    /// "correct-horse-battery" so login tests can use it.
    pub async fn seed_user(&self, username: &str, role: UserRole) -> user::Model {
        self.seed_account(username, role, false).await
    }

    /// Insert a superuser account. Superusers bypass permission checks.
    #[allow(dead_code)]
    pub async fn seed_superuser(&self, username: &str) -> user::Model {
        self.seed_account(username, UserRole::Admin, true).await
    }

    async fn seed_account(&self, username: &str, role: UserRole, superuser: bool) -> user::Model {
        let full_name: String = Name().fake();
        let password_hash = self
            .auth_service
            .hash_password("correct-horse-battery")
            .expect("hash test password");

        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            full_name: Set(full_name),
            email: Set(None),
            role: Set(role),
            emp_id: Set(None),
            emp_type: Set(None),
            contact_number: Set(None),
            account_holder_name: Set(String::new()),
            bank_name: Set(String::new()),
            account_number: Set(String::new()),
            ifsc_code: Set(String::new()),
            branch: Set(String::new()),
            module_permissions: Set(serde_json::json!({})),
            is_staff: Set(superuser || role.grants_staff_access()),
            is_superuser: Set(superuser),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user for tests")
    }

    /// Bearer token for an already-seeded account.
    pub fn token_for(&self, account: &user::Model) -> String {
        self.auth_service
            .generate_token(account)
            .expect("generate test token")
            .access_token
    }

    /// Actor wrapper for calling services directly, skipping HTTP.
    pub fn actor(&self, account: &user::Model) -> CurrentUser {
        CurrentUser {
            user: account.clone(),
            role_grants: None,
        }
    }

    pub async fn seed_item(&self, name: &str, price: Decimal) -> item::Model {
        item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            is_active: Set(true),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed item for tests")
    }

    #[allow(dead_code)]
    pub async fn seed_customer(&self, name: &str) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_name: Set(name.to_string()),
            address: Set(String::new()),
            contact_number: Set(String::new()),
            email_id: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed customer for tests")
    }

    #[allow(dead_code)]
    pub async fn seed_vendor(&self, code: &str, name: &str) -> vendor::Model {
        vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(code.to_string()),
            name: Set(name.to_string()),
            account_holder_name: Set(String::new()),
            bank_name: Set(String::new()),
            ac_number: Set(String::new()),
            ifsc_code: Set(String::new()),
            branch: Set(String::new()),
            contact: Set(String::new()),
            email: Set(String::new()),
            is_active: Set(true),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed vendor for tests")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
