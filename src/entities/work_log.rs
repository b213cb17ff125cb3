use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the review state of a student work log.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkLogStatus {
    /// Shift in progress, exit time not yet recorded.
    #[sea_orm(string_value = "OPEN")]
    Open,
    /// Complete and awaiting supervisor review.
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Counted by payroll.
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Excluded from payroll.
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl WorkLogStatus {
    /// Review states move strictly forward: an open log is submitted, a
    /// pending log is approved or rejected, and decided logs stay decided.
    pub fn can_transition_to(&self, next: WorkLogStatus) -> bool {
        matches!(
            (self, next),
            (WorkLogStatus::Open, WorkLogStatus::Pending)
                | (WorkLogStatus::Pending, WorkLogStatus::Approved)
                | (WorkLogStatus::Pending, WorkLogStatus::Rejected)
        )
    }
}

/// The `work_logs` table. Student shift records feeding payroll.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub student_id: Uuid,

    pub date: NaiveDate,

    pub entry_time: Option<NaiveTime>,

    pub exit_time: Option<NaiveTime>,

    /// Filled in when the exit time is recorded.
    pub working_hours: Option<Decimal>,

    pub overtime_hours: Decimal,

    pub status: WorkLogStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_moves_strictly_forward() {
        assert!(WorkLogStatus::Open.can_transition_to(WorkLogStatus::Pending));
        assert!(WorkLogStatus::Pending.can_transition_to(WorkLogStatus::Approved));
        assert!(WorkLogStatus::Pending.can_transition_to(WorkLogStatus::Rejected));
    }

    #[test]
    fn decided_logs_stay_decided() {
        assert!(!WorkLogStatus::Approved.can_transition_to(WorkLogStatus::Pending));
        assert!(!WorkLogStatus::Rejected.can_transition_to(WorkLogStatus::Pending));
        assert!(!WorkLogStatus::Approved.can_transition_to(WorkLogStatus::Rejected));
    }

    #[test]
    fn open_logs_cannot_skip_review() {
        assert!(!WorkLogStatus::Open.can_transition_to(WorkLogStatus::Approved));
        assert!(!WorkLogStatus::Open.can_transition_to(WorkLogStatus::Rejected));
    }
}
