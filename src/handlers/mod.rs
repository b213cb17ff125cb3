pub mod attendance;
pub mod auth;
pub mod bills;
pub mod catalog;
pub mod health;
pub mod inventory_sessions;
pub mod payroll;
pub mod purchasing;
pub mod roles;
pub mod users;
pub mod work_logs;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub bills: Arc<crate::services::bills::BillService>,
    pub inventory_sessions: Arc<crate::services::inventory_sessions::InventorySessionService>,
    pub attendance: Arc<crate::services::attendance::AttendanceService>,
    pub work_logs: Arc<crate::services::work_logs::WorkLogService>,
    pub payroll: Arc<crate::services::payroll::PayrollService>,
    pub purchasing: Arc<crate::services::purchasing::PurchasingService>,
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub users: Arc<crate::services::users::UserService>,
    pub roles: Arc<crate::services::roles::RolePermissionService>,
}

impl AppServices {
    /// Builds the full service container.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: Arc<AppConfig>,
        auth_service: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            bills: Arc::new(crate::services::bills::BillService::new(
                db_pool.clone(),
                config.clone(),
                event_sender.clone(),
            )),
            inventory_sessions: Arc::new(
                crate::services::inventory_sessions::InventorySessionService::new(
                    db_pool.clone(),
                    config.clone(),
                    event_sender.clone(),
                ),
            ),
            attendance: Arc::new(crate::services::attendance::AttendanceService::new(
                db_pool.clone(),
                config.clone(),
                event_sender.clone(),
            )),
            work_logs: Arc::new(crate::services::work_logs::WorkLogService::new(
                db_pool.clone(),
                config.clone(),
                event_sender.clone(),
            )),
            payroll: Arc::new(crate::services::payroll::PayrollService::new(
                db_pool.clone(),
                config.clone(),
            )),
            purchasing: Arc::new(crate::services::purchasing::PurchasingService::new(
                db_pool.clone(),
                config.clone(),
                event_sender.clone(),
            )),
            catalog: Arc::new(crate::services::catalog::CatalogService::new(
                db_pool.clone(),
                config.clone(),
            )),
            users: Arc::new(crate::services::users::UserService::new(
                db_pool.clone(),
                config.clone(),
                auth_service,
                event_sender.clone(),
            )),
            roles: Arc::new(crate::services::roles::RolePermissionService::new(
                db_pool,
                event_sender,
            )),
        }
    }
}
