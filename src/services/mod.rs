// Document flows
pub mod aggregation;
pub mod bills;
pub mod inventory_sessions;
pub mod numbering;

use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

use crate::entities::activity_log;
use crate::errors::ServiceError;

/// Writes one activity-log row. Called inside the same transaction as the
/// mutation it describes so the trail never outlives a rollback.
pub(crate) async fn record_activity<C: ConnectionTrait>(
    conn: &C,
    user_id: uuid::Uuid,
    action: impl Into<String>,
) -> Result<(), ServiceError> {
    activity_log::ActiveModel {
        id: Set(uuid::Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.into()),
        timestamp: Set(chrono::Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

// Workforce
pub mod attendance;
pub mod payroll;
pub mod work_logs;

// Procurement
pub mod purchasing;

// Master data and administration
pub mod catalog;
pub mod roles;
pub mod users;
