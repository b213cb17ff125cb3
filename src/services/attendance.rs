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
use crate::entities::attendance::{self, hours_between, Entity as AttendanceEntity};
use crate::entities::user::{self, Entity as UserEntity, UserRole};
use crate::entities::work_log::{self, Entity as WorkLogEntity, WorkLogStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::record_activity;

lazy_static! {
    static ref ATTENDANCE_CLOCK_INS: IntCounter = register_int_counter!(
        "attendance_clock_ins_total",
        "Total number of attendance clock-ins"
    )
    .expect("metric can be created");
    static ref ATTENDANCE_CLOCK_OUTS: IntCounter = register_int_counter!(
        "attendance_clock_outs_total",
        "Total number of attendance clock-outs"
    )
    .expect("metric can be created");
    static ref ATTENDANCE_APPROVALS: IntCounter = register_int_counter!(
        "attendance_approvals_total",
        "Total number of attendance records approved"
    )
    .expect("metric can be created");
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct ApproveAttendanceRequest {
    /// Overtime credited at approval time, replacing whatever the
    /// record carried.
    pub overtime_hours: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub date: NaiveDate,
    pub in_time: NaiveTime,
    pub out_time: Option<NaiveTime>,
    pub total_hours: Option<Decimal>,
    pub overtime_hours: Decimal,
    pub is_approved: bool,
}

fn to_response(model: attendance::Model, full_name: String) -> AttendanceResponse {
    AttendanceResponse {
        id: model.id,
        user_id: model.user_id,
        full_name,
        date: model.date,
        in_time: model.in_time,
        out_time: model.out_time,
        total_hours: model.total_hours,
        overtime_hours: model.overtime_hours,
        is_approved: model.is_approved,
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct AttendanceListFilter {
    /// Only honored for principals with broad attendance visibility.
    pub user_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub approved: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for attendance tracking
///
/// Clocking in and out is open to every authenticated account and only
/// ever touches the caller's own records; approval is restricted to
/// accountants, supervisors and admins.
#[derive(Clone)]
pub struct AttendanceService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
    event_sender: Option<Arc<EventSender>>,
}

impl AttendanceService {
    /// Creates a new attendance service
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

    /// Starts today's attendance record for the caller.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub async fn clock_in(&self, actor: &CurrentUser) -> Result<AttendanceResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let today = now.date_naive();

        let open_row = AttendanceEntity::find()
            .filter(attendance::Column::UserId.eq(actor.id()))
            .filter(attendance::Column::OutTime.is_null())
            .one(db)
            .await?;
        if open_row.is_some() {
            return Err(ServiceError::InvalidOperation(
                "An open attendance record already exists; clock out first".to_string(),
            ));
        }
        let today_row = AttendanceEntity::find()
            .filter(attendance::Column::UserId.eq(actor.id()))
            .filter(attendance::Column::Date.eq(today))
            .one(db)
            .await?;
        if today_row.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Attendance for today is already recorded".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let record = attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(actor.id()),
            date: Set(today),
            in_time: Set(now.time()),
            out_time: Set(None),
            total_hours: Set(None),
            overtime_hours: Set(Decimal::ZERO),
            is_approved: Set(false),
        }
        .insert(&txn)
        .await?;
        record_activity(&txn, actor.id(), "Clocked in").await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        ATTENDANCE_CLOCK_INS.inc();
        info!(date = %today, "clocked in");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::AttendanceClockedIn {
                    user_id: actor.id(),
                    date: today,
                })
                .await
            {
                warn!("Failed to send clock-in event: {}", e);
            }
        }

        Ok(to_response(record, actor.user.full_name.clone()))
    }

    /// Closes the caller's open attendance record and fixes its hours.
    ///
    /// Targets the most recent open record rather than today's, so a
    /// shift that started before midnight still closes cleanly.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub async fn clock_out(&self, actor: &CurrentUser) -> Result<AttendanceResponse, ServiceError> {
        let db = &*self.db_pool;
        let open_row = AttendanceEntity::find()
            .filter(attendance::Column::UserId.eq(actor.id()))
            .filter(attendance::Column::OutTime.is_null())
            .order_by_desc(attendance::Column::Date)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation("No open attendance record to clock out of".to_string())
            })?;

        let out_time = Utc::now().time();
        let total_hours = hours_between(open_row.in_time, out_time);
        let date = open_row.date;
        let user_id = open_row.user_id;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut active: attendance::ActiveModel = open_row.into();
        active.out_time = Set(Some(out_time));
        active.total_hours = Set(Some(total_hours));
        let record = active.update(&txn).await?;
        record_activity(&txn, actor.id(), "Clocked out").await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        ATTENDANCE_CLOCK_OUTS.inc();
        info!(date = %date, hours = %total_hours, "clocked out");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::AttendanceClockedOut {
                    user_id,
                    date,
                    total_hours,
                })
                .await
            {
                warn!("Failed to send clock-out event: {}", e);
            }
        }

        Ok(to_response(record, actor.user.full_name.clone()))
    }

    /// Approves a clocked-out attendance record.
    ///
    /// Approving a student's record also files an approved work-log for
    /// the same shift, once, so payroll sees it without a second
    /// review round.
    #[instrument(skip(self, actor, request), fields(attendance_id = %attendance_id, actor_id = %actor.id()))]
    pub async fn approve(
        &self,
        actor: &CurrentUser,
        attendance_id: Uuid,
        request: ApproveAttendanceRequest,
    ) -> Result<AttendanceResponse, ServiceError> {
        if !can_approve(actor) {
            return Err(ServiceError::Forbidden(
                "Only accountants, supervisors and admins can approve attendance".to_string(),
            ));
        }
        if let Some(overtime) = request.overtime_hours {
            if overtime < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Overtime hours cannot be negative".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let record = AttendanceEntity::find_by_id(attendance_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Attendance record {} not found", attendance_id))
            })?;
        if record.is_approved {
            return Err(ServiceError::InvalidOperation(
                "Attendance record is already approved".to_string(),
            ));
        }
        let Some(total_hours) = record.total_hours else {
            return Err(ServiceError::InvalidOperation(
                "Cannot approve an attendance record that is still open".to_string(),
            ));
        };
        let account = UserEntity::find_by_id(record.user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Account no longer exists".to_string()))?;

        let overtime_hours = request.overtime_hours.unwrap_or(record.overtime_hours);

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let date = record.date;
        let in_time = record.in_time;
        let out_time = record.out_time;
        let mut active: attendance::ActiveModel = record.into();
        active.is_approved = Set(true);
        active.overtime_hours = Set(overtime_hours);
        let record = active.update(&txn).await?;

        // A student's approved shift doubles as their approved work-log.
        if account.role == UserRole::Student {
            let existing_log = WorkLogEntity::find()
                .filter(work_log::Column::StudentId.eq(account.id))
                .filter(work_log::Column::Date.eq(date))
                .one(&txn)
                .await?;
            if existing_log.is_none() {
                work_log::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    student_id: Set(account.id),
                    date: Set(date),
                    entry_time: Set(Some(in_time)),
                    exit_time: Set(out_time),
                    working_hours: Set(Some(total_hours)),
                    overtime_hours: Set(overtime_hours),
                    status: Set(WorkLogStatus::Approved),
                }
                .insert(&txn)
                .await?;
            }
        }
        record_activity(
            &txn,
            actor.id(),
            format!("Approved attendance for {} on {}", account.full_name, date),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        ATTENDANCE_APPROVALS.inc();
        info!(user = %account.full_name, date = %date, "attendance approved");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::AttendanceApproved {
                    attendance_id,
                    approved_by: actor.id(),
                })
                .await
            {
                warn!("Failed to send attendance approved event: {}", e);
            }
        }

        Ok(to_response(record, account.full_name))
    }

    /// Lists attendance records, most recent first.
    ///
    /// Principals without broad attendance visibility only ever see
    /// their own records.
    #[instrument(skip(self, actor, filter), fields(actor_id = %actor.id()))]
    pub async fn list_attendance(
        &self,
        actor: &CurrentUser,
        filter: AttendanceListFilter,
    ) -> Result<AttendanceListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = AttendanceEntity::find();
        if sees_all_attendance(actor) {
            if let Some(user_id) = filter.user_id {
                query = query.filter(attendance::Column::UserId.eq(user_id));
            }
        } else {
            query = query.filter(attendance::Column::UserId.eq(actor.id()));
        }
        if let Some(from) = filter.from {
            query = query.filter(attendance::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(attendance::Column::Date.lte(to));
        }
        if let Some(approved) = filter.approved {
            query = query.filter(attendance::Column::IsApproved.eq(approved));
        }

        let paginator = query
            .order_by_desc(attendance::Column::Date)
            .order_by_desc(attendance::Column::InTime)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let user_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let names: HashMap<Uuid, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            UserEntity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.full_name))
                .collect()
        };

        let records = rows
            .into_iter()
            .map(|row| {
                let full_name = names.get(&row.user_id).cloned().unwrap_or_default();
                to_response(row, full_name)
            })
            .collect();

        Ok(AttendanceListResponse {
            records,
            total,
            page,
            per_page,
        })
    }
}

fn can_approve(actor: &CurrentUser) -> bool {
    actor.user.is_superuser
        || matches!(
            actor.user.role,
            UserRole::Accountant | UserRole::Supervisor | UserRole::Admin
        )
}

fn sees_all_attendance(actor: &CurrentUser) -> bool {
    can_approve(actor) || actor.allows_any(modules::ATTENDANCE)
}
