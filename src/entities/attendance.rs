use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `attendance` table. One row per user per calendar date.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub date: NaiveDate,

    pub in_time: NaiveTime,

    /// Unset until the user clocks out.
    pub out_time: Option<NaiveTime>,

    /// Filled in at clock-out from in/out times.
    pub total_hours: Option<Decimal>,

    pub overtime_hours: Decimal,

    /// Supervisor sign-off. Approval of a student's attendance also
    /// produces an approved work log for the same shift.
    pub is_approved: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Hours between two wall-clock times, rounded to two decimals. A shift
/// crossing midnight wraps rather than going negative.
pub fn hours_between(in_time: NaiveTime, out_time: NaiveTime) -> Decimal {
    let mut seconds = (out_time - in_time).num_seconds();
    if seconds < 0 {
        seconds += 24 * 3600;
    }
    (Decimal::from(seconds) / dec!(3600)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn whole_and_fractional_hours() {
        assert_eq!(hours_between(t(9, 0), t(17, 0)), dec!(8.00));
        assert_eq!(hours_between(t(9, 0), t(13, 30)), dec!(4.50));
        assert_eq!(hours_between(t(9, 0), t(9, 20)), dec!(0.33));
    }

    #[test]
    fn overnight_shift_wraps() {
        assert_eq!(hours_between(t(22, 0), t(2, 0)), dec!(4.00));
    }

    #[test]
    fn zero_length_shift() {
        assert_eq!(hours_between(t(9, 0), t(9, 0)), dec!(0.00));
    }
}
