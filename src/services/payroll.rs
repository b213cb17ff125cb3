use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{AppConfig, PayrollConfig};
use crate::db::DbPool;
use crate::entities::attendance::{self, Entity as AttendanceEntity};
use crate::entities::user::{self, Entity as UserEntity, UserRole};
use crate::entities::work_log::{self, Entity as WorkLogEntity, WorkLogStatus};
use crate::errors::ServiceError;

lazy_static! {
    static ref PAYROLL_REPORTS_GENERATED: IntCounter = register_int_counter!(
        "payroll_reports_generated_total",
        "Total number of payroll reports generated"
    )
    .expect("metric can be created");
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct PayrollQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// One principal's pay for the period.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PayrollRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub role: UserRole,
    pub hours: Decimal,
    /// Overtime worked. For non-students this is informational unless
    /// employee overtime pay is enabled.
    pub overtime_hours: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PayrollReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<PayrollRow>,
    pub grand_total: Decimal,
}

#[derive(Default)]
struct Totals {
    hours: Decimal,
    overtime_hours: Decimal,
}

/// Service producing payroll summaries
///
/// Students are paid from approved work-logs; everyone else is paid
/// from attendance records, whether approved or not.
#[derive(Clone)]
pub struct PayrollService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
}

impl PayrollService {
    /// Creates a new payroll service
    pub fn new(db_pool: Arc<DbPool>, config: Arc<AppConfig>) -> Self {
        Self { db_pool, config }
    }

    /// Builds the payroll report for an inclusive date range.
    ///
    /// Rows whose hour and overtime sums are both zero are omitted.
    #[instrument(skip(self), fields(from = %query.from, to = %query.to))]
    pub async fn generate_report(&self, query: PayrollQuery) -> Result<PayrollReport, ServiceError> {
        if query.from > query.to {
            return Err(ServiceError::ValidationError(
                "The start date must not be after the end date".to_string(),
            ));
        }
        let db = &*self.db_pool;

        // Student pay comes from approved work-logs only.
        let logs = WorkLogEntity::find()
            .filter(work_log::Column::Status.eq(WorkLogStatus::Approved))
            .filter(work_log::Column::Date.gte(query.from))
            .filter(work_log::Column::Date.lte(query.to))
            .all(db)
            .await?;
        let mut student_totals: HashMap<Uuid, Totals> = HashMap::new();
        for log in &logs {
            let entry = student_totals.entry(log.student_id).or_default();
            entry.hours += log.working_hours.unwrap_or(Decimal::ZERO);
            entry.overtime_hours += log.overtime_hours;
        }

        // Everyone else is paid from attendance, approved or not.
        let attendance_rows = AttendanceEntity::find()
            .filter(attendance::Column::Date.gte(query.from))
            .filter(attendance::Column::Date.lte(query.to))
            .all(db)
            .await?;
        let mut attendance_totals: HashMap<Uuid, Totals> = HashMap::new();
        for row in &attendance_rows {
            let entry = attendance_totals.entry(row.user_id).or_default();
            entry.hours += row.total_hours.unwrap_or(Decimal::ZERO);
            entry.overtime_hours += row.overtime_hours;
        }

        let mut user_ids: Vec<Uuid> = student_totals.keys().copied().collect();
        user_ids.extend(attendance_totals.keys().copied());
        user_ids.sort();
        user_ids.dedup();
        let accounts: HashMap<Uuid, user::Model> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            UserEntity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };

        let payroll = &self.config.payroll;
        let mut rows: Vec<PayrollRow> = Vec::new();
        for (user_id, totals) in &student_totals {
            let Some(account) = accounts.get(user_id) else {
                continue;
            };
            if account.role != UserRole::Student {
                continue;
            }
            if totals.hours.is_zero() && totals.overtime_hours.is_zero() {
                continue;
            }
            rows.push(PayrollRow {
                user_id: *user_id,
                full_name: account.full_name.clone(),
                role: account.role,
                hours: totals.hours,
                overtime_hours: totals.overtime_hours,
                amount: student_amount(totals.hours, totals.overtime_hours, payroll),
            });
        }
        for (user_id, totals) in &attendance_totals {
            let Some(account) = accounts.get(user_id) else {
                continue;
            };
            // Students with attendance are paid through their work-logs.
            if account.role == UserRole::Student {
                continue;
            }
            if totals.hours.is_zero() && totals.overtime_hours.is_zero() {
                continue;
            }
            rows.push(PayrollRow {
                user_id: *user_id,
                full_name: account.full_name.clone(),
                role: account.role,
                hours: totals.hours,
                overtime_hours: totals.overtime_hours,
                amount: employee_amount(totals.hours, totals.overtime_hours, payroll),
            });
        }

        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.user_id.cmp(&b.user_id)));
        let grand_total: Decimal = rows.iter().map(|r| r.amount).sum();

        PAYROLL_REPORTS_GENERATED.inc();
        info!(rows = rows.len(), %grand_total, "payroll report generated");

        Ok(PayrollReport {
            from: query.from,
            to: query.to,
            rows,
            grand_total,
        })
    }
}

fn student_amount(hours: Decimal, overtime_hours: Decimal, config: &PayrollConfig) -> Decimal {
    hours * config.student_hour_rate + overtime_hours * config.student_overtime_rate
}

/// Attendance overtime is carried in reports but only paid when the
/// payout flag is on.
fn employee_amount(hours: Decimal, overtime_hours: Decimal, config: &PayrollConfig) -> Decimal {
    let base = hours * config.employee_hour_rate;
    if config.employee_overtime_enabled {
        base + overtime_hours * config.employee_overtime_rate
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rates() -> PayrollConfig {
        PayrollConfig::default()
    }

    #[test]
    fn students_are_paid_hours_plus_overtime() {
        let amount = student_amount(dec!(10), dec!(2), &rates());
        // 10 x 50 + 2 x 75
        assert_eq!(amount, dec!(650));
    }

    #[test]
    fn employee_overtime_is_unpaid_by_default() {
        let amount = employee_amount(dec!(8), dec!(3), &rates());
        assert_eq!(amount, dec!(800));
    }

    #[test]
    fn employee_overtime_pays_out_when_enabled() {
        let mut config = rates();
        config.employee_overtime_enabled = true;
        config.employee_overtime_rate = dec!(120);
        let amount = employee_amount(dec!(8), dec!(3), &config);
        assert_eq!(amount, dec!(1160));
    }

    #[test]
    fn fractional_hours_settle_exactly() {
        let amount = student_amount(dec!(7.5), dec!(0.25), &rates());
        assert_eq!(amount, dec!(393.75));
    }
}
