use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::permissions::modules;
use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::attendance::hours_between;
use crate::entities::user::{self, Entity as UserEntity, UserRole};
use crate::entities::work_log::{self, Entity as WorkLogEntity, WorkLogStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::record_activity;

lazy_static! {
    static ref WORK_LOGS_SUBMITTED: IntCounter = register_int_counter!(
        "work_logs_submitted_total",
        "Total number of work logs submitted for review"
    )
    .expect("metric can be created");
    static ref WORK_LOGS_APPROVED: IntCounter = register_int_counter!(
        "work_logs_approved_total",
        "Total number of work logs approved"
    )
    .expect("metric can be created");
    static ref WORK_LOGS_REJECTED: IntCounter = register_int_counter!(
        "work_logs_rejected_total",
        "Total number of work logs rejected"
    )
    .expect("metric can be created");
}

/// Hours declared at submission, overriding the clocked values.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct SubmitWorkLogRequest {
    pub working_hours: Option<Decimal>,
    pub overtime_hours: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct WorkLogResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub full_name: String,
    pub date: NaiveDate,
    pub entry_time: Option<NaiveTime>,
    pub exit_time: Option<NaiveTime>,
    pub working_hours: Option<Decimal>,
    pub overtime_hours: Decimal,
    pub status: WorkLogStatus,
}

fn to_response(model: work_log::Model, full_name: String) -> WorkLogResponse {
    WorkLogResponse {
        id: model.id,
        student_id: model.student_id,
        full_name,
        date: model.date,
        entry_time: model.entry_time,
        exit_time: model.exit_time,
        working_hours: model.working_hours,
        overtime_hours: model.overtime_hours,
        status: model.status,
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct WorkLogListFilter {
    /// Only honored for principals with broad work-log visibility.
    pub student_id: Option<Uuid>,
    pub status: Option<WorkLogStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct WorkLogListResponse {
    pub work_logs: Vec<WorkLogResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for student work logs
///
/// A log moves strictly forward: opened at the start of a shift,
/// closed at the end, submitted for review, then approved or rejected.
/// Only approved logs count toward payroll.
#[derive(Clone)]
pub struct WorkLogService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
    event_sender: Option<Arc<EventSender>>,
}

impl WorkLogService {
    /// Creates a new work log service
    pub fn new(
        db_pool: Arc<DbPool>,
        config: Arc<AppConfig>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            config,
            event_sender,
        }
    }

    /// Opens today's work log for the calling student.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub async fn open_log(&self, actor: &CurrentUser) -> Result<WorkLogResponse, ServiceError> {
        if actor.user.role != UserRole::Student {
            return Err(ServiceError::Forbidden(
                "Only students keep work logs".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let now = Utc::now();
        let today = now.date_naive();

        let existing = WorkLogEntity::find()
            .filter(work_log::Column::StudentId.eq(actor.id()))
            .filter(work_log::Column::Date.eq(today))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(
                "A work log for today already exists".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let log = work_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(actor.id()),
            date: Set(today),
            entry_time: Set(Some(now.time())),
            exit_time: Set(None),
            working_hours: Set(None),
            overtime_hours: Set(Decimal::ZERO),
            status: Set(WorkLogStatus::Open),
        }
        .insert(&txn)
        .await?;
        record_activity(&txn, actor.id(), "Opened work log").await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(date = %today, "work log opened");
        Ok(to_response(log, actor.user.full_name.clone()))
    }

    /// Records the exit time on the caller's most recent open log and
    /// computes the hours worked.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub async fn close_log(&self, actor: &CurrentUser) -> Result<WorkLogResponse, ServiceError> {
        let db = &*self.db_pool;
        let log = WorkLogEntity::find()
            .filter(work_log::Column::StudentId.eq(actor.id()))
            .filter(work_log::Column::Status.eq(WorkLogStatus::Open))
            .filter(work_log::Column::ExitTime.is_null())
            .order_by_desc(work_log::Column::Date)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation("No open work log to close".to_string())
            })?;
        let Some(entry_time) = log.entry_time else {
            return Err(ServiceError::InvalidOperation(
                "Work log has no entry time".to_string(),
            ));
        };

        let exit_time = Utc::now().time();
        let working_hours = hours_between(entry_time, exit_time);

        let mut active: work_log::ActiveModel = log.into();
        active.exit_time = Set(Some(exit_time));
        active.working_hours = Set(Some(working_hours));
        let log = active.update(db).await?;

        info!(date = %log.date, hours = %working_hours, "work log closed");
        Ok(to_response(log, actor.user.full_name.clone()))
    }

    /// Submits a closed log for review, optionally correcting the
    /// declared hours.
    #[instrument(skip(self, actor, request), fields(work_log_id = %work_log_id, actor_id = %actor.id()))]
    pub async fn submit_log(
        &self,
        actor: &CurrentUser,
        work_log_id: Uuid,
        request: SubmitWorkLogRequest,
    ) -> Result<WorkLogResponse, ServiceError> {
        if let Some(hours) = request.working_hours {
            if hours < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Working hours cannot be negative".to_string(),
                ));
            }
        }
        if let Some(overtime) = request.overtime_hours {
            if overtime < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Overtime hours cannot be negative".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let log = WorkLogEntity::find_by_id(work_log_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work log {} not found", work_log_id)))?;
        if log.student_id != actor.id() {
            return Err(ServiceError::Forbidden(
                "Only the log's owner can submit it".to_string(),
            ));
        }
        ensure_transition(log.status, WorkLogStatus::Pending)?;
        if log.exit_time.is_none() {
            return Err(ServiceError::InvalidOperation(
                "Close the work log before submitting it".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut active: work_log::ActiveModel = log.into();
        active.status = Set(WorkLogStatus::Pending);
        if let Some(hours) = request.working_hours {
            active.working_hours = Set(Some(hours));
        }
        if let Some(overtime) = request.overtime_hours {
            active.overtime_hours = Set(overtime);
        }
        let log = active.update(&txn).await?;
        record_activity(&txn, actor.id(), "Submitted work log").await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        WORK_LOGS_SUBMITTED.inc();
        info!(date = %log.date, "work log submitted");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::WorkLogSubmitted(work_log_id)).await {
                warn!("Failed to send work log submitted event: {}", e);
            }
        }

        Ok(to_response(log, actor.user.full_name.clone()))
    }

    /// Approves a pending log, admitting it to payroll.
    #[instrument(skip(self, actor), fields(work_log_id = %work_log_id, actor_id = %actor.id()))]
    pub async fn approve_log(
        &self,
        actor: &CurrentUser,
        work_log_id: Uuid,
    ) -> Result<WorkLogResponse, ServiceError> {
        let log = self
            .review_log(actor, work_log_id, WorkLogStatus::Approved)
            .await?;
        WORK_LOGS_APPROVED.inc();

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::WorkLogApproved {
                    work_log_id,
                    approved_by: actor.id(),
                })
                .await
            {
                warn!("Failed to send work log approved event: {}", e);
            }
        }
        Ok(log)
    }

    /// Rejects a pending log, keeping it out of payroll.
    #[instrument(skip(self, actor), fields(work_log_id = %work_log_id, actor_id = %actor.id()))]
    pub async fn reject_log(
        &self,
        actor: &CurrentUser,
        work_log_id: Uuid,
    ) -> Result<WorkLogResponse, ServiceError> {
        let log = self
            .review_log(actor, work_log_id, WorkLogStatus::Rejected)
            .await?;
        WORK_LOGS_REJECTED.inc();

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::WorkLogRejected {
                    work_log_id,
                    approved_by: actor.id(),
                })
                .await
            {
                warn!("Failed to send work log rejected event: {}", e);
            }
        }
        Ok(log)
    }

    /// Lists work logs, most recent first.
    ///
    /// Students only ever see their own logs.
    #[instrument(skip(self, actor, filter), fields(actor_id = %actor.id()))]
    pub async fn list_work_logs(
        &self,
        actor: &CurrentUser,
        filter: WorkLogListFilter,
    ) -> Result<WorkLogListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = WorkLogEntity::find();
        if sees_all_work_logs(actor) {
            if let Some(student_id) = filter.student_id {
                query = query.filter(work_log::Column::StudentId.eq(student_id));
            }
        } else {
            query = query.filter(work_log::Column::StudentId.eq(actor.id()));
        }
        if let Some(status) = filter.status {
            query = query.filter(work_log::Column::Status.eq(status));
        }
        if let Some(from) = filter.from {
            query = query.filter(work_log::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(work_log::Column::Date.lte(to));
        }

        let paginator = query
            .order_by_desc(work_log::Column::Date)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let student_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = rows.iter().map(|r| r.student_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let names: HashMap<Uuid, String> = if student_ids.is_empty() {
            HashMap::new()
        } else {
            UserEntity::find()
                .filter(user::Column::Id.is_in(student_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.full_name))
                .collect()
        };

        let work_logs = rows
            .into_iter()
            .map(|row| {
                let full_name = names.get(&row.student_id).cloned().unwrap_or_default();
                to_response(row, full_name)
            })
            .collect();

        Ok(WorkLogListResponse {
            work_logs,
            total,
            page,
            per_page,
        })
    }

    async fn review_log(
        &self,
        actor: &CurrentUser,
        work_log_id: Uuid,
        verdict: WorkLogStatus,
    ) -> Result<WorkLogResponse, ServiceError> {
        if !can_review(actor) {
            return Err(ServiceError::Forbidden(
                "Only accountants, supervisors and admins can review work logs".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let log = WorkLogEntity::find_by_id(work_log_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work log {} not found", work_log_id)))?;
        ensure_transition(log.status, verdict)?;

        let student = UserEntity::find_by_id(log.student_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Account no longer exists".to_string()))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let date = log.date;
        let mut active: work_log::ActiveModel = log.into();
        active.status = Set(verdict);
        let log = active.update(&txn).await?;

        let action = match verdict {
            WorkLogStatus::Approved => "Approved",
            _ => "Rejected",
        };
        record_activity(
            &txn,
            actor.id(),
            format!("{} work log for {} on {}", action, student.full_name, date),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(student = %student.full_name, date = %date, status = %verdict, "work log reviewed");
        Ok(to_response(log, student.full_name))
    }
}

fn ensure_transition(current: WorkLogStatus, next: WorkLogStatus) -> Result<(), ServiceError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "A {} work log cannot move to {}",
            current, next
        )))
    }
}

fn can_review(actor: &CurrentUser) -> bool {
    actor.user.is_superuser
        || matches!(
            actor.user.role,
            UserRole::Accountant | UserRole::Supervisor | UserRole::Admin
        )
}

fn sees_all_work_logs(actor: &CurrentUser) -> bool {
    can_review(actor) || actor.allows_any(modules::WORKLOGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_states_move_strictly_forward() {
        assert!(ensure_transition(WorkLogStatus::Open, WorkLogStatus::Pending).is_ok());
        assert!(ensure_transition(WorkLogStatus::Pending, WorkLogStatus::Approved).is_ok());
        assert!(ensure_transition(WorkLogStatus::Pending, WorkLogStatus::Rejected).is_ok());

        assert!(ensure_transition(WorkLogStatus::Open, WorkLogStatus::Approved).is_err());
        assert!(ensure_transition(WorkLogStatus::Approved, WorkLogStatus::Pending).is_err());
        assert!(ensure_transition(WorkLogStatus::Rejected, WorkLogStatus::Approved).is_err());
        assert!(ensure_transition(WorkLogStatus::Approved, WorkLogStatus::Rejected).is_err());
    }

    #[test]
    fn transition_errors_name_both_states() {
        let err = ensure_transition(WorkLogStatus::Open, WorkLogStatus::Approved).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("OPEN"));
        assert!(message.contains("APPROVED"));
    }
}
