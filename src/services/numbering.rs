//! Sequential document number allocation.
//!
//! Numbers look like `SB-202405230004`: a kind prefix, the date, and a
//! four digit daily sequence. Allocation goes through a per
//! (prefix, date) counter row that is read under an exclusive row lock
//! inside the caller's transaction, so two concurrent inserts can never
//! compute the same sequence. The unique index on the number columns
//! stays as the last-resort safety net.
//!
//! Installations that predate the counter table seed it lazily: the
//! first allocation of a day scans for the lexicographically last
//! existing number with that prefix and date and continues from its
//! trailing four digits.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    entities::bill::{self, BillType, Entity as BillEntity},
    entities::document_counter::{self, Entity as CounterEntity},
    entities::purchase_record::{self, Entity as PurchaseRecordEntity},
    errors::ServiceError,
};

/// Prefix used for purchase order numbers.
pub const PURCHASE_ORDER_PREFIX: &str = "PO";

lazy_static! {
    static ref DOCUMENTS_NUMBERED: IntCounterVec = register_int_counter_vec!(
        "documents_numbered_total",
        "Total number of document numbers allocated",
        &["prefix"]
    )
    .expect("metric can be created");
}

/// Renders a document number from its parts.
pub fn format_number(prefix: &str, date: NaiveDate, seq: u32) -> String {
    format!("{}-{}{:04}", prefix, date.format("%Y%m%d"), seq)
}

/// Parses the trailing four digit sequence out of an existing number.
/// Anything unparsable counts as zero, which restarts the sequence.
pub fn trailing_sequence(number: &str) -> i32 {
    let start = number.len().saturating_sub(4);
    number
        .get(start..)
        .and_then(|tail| tail.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Allocates the next invoice number for a bill of the given kind.
///
/// Must run inside the same transaction as the bill insert.
pub async fn next_invoice_number<C: ConnectionTrait>(
    conn: &C,
    bill_type: BillType,
    today: NaiveDate,
) -> Result<String, ServiceError> {
    allocate(conn, bill_type.prefix(), today).await
}

/// Allocates the next purchase order id.
///
/// Must run inside the same transaction as the purchase record insert.
pub async fn next_purchase_order_id<C: ConnectionTrait>(
    conn: &C,
    today: NaiveDate,
) -> Result<String, ServiceError> {
    allocate(conn, PURCHASE_ORDER_PREFIX, today).await
}

#[instrument(skip(conn), fields(prefix = %prefix, date = %today))]
async fn allocate<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    today: NaiveDate,
) -> Result<String, ServiceError> {
    let date_key = today.format("%Y%m%d").to_string();

    // FOR UPDATE on backends that support it; SQLite serializes writers
    // anyway.
    let counter = CounterEntity::find()
        .filter(document_counter::Column::Prefix.eq(prefix))
        .filter(document_counter::Column::DateKey.eq(date_key.as_str()))
        .lock_exclusive()
        .one(conn)
        .await?;

    let next_seq = match counter {
        Some(row) => {
            let next = row.last_seq + 1;
            let mut active: document_counter::ActiveModel = row.into();
            active.last_seq = Set(next);
            active.update(conn).await?;
            next
        }
        None => {
            let next = last_issued_sequence(conn, prefix, &date_key).await? + 1;
            document_counter::ActiveModel {
                id: Set(Uuid::new_v4()),
                prefix: Set(prefix.to_string()),
                date_key: Set(date_key),
                last_seq: Set(next),
            }
            .insert(conn)
            .await?;
            next
        }
    };

    DOCUMENTS_NUMBERED.with_label_values(&[prefix]).inc();
    debug!(seq = next_seq, "allocated document sequence");

    Ok(format_number(prefix, today, next_seq as u32))
}

/// Highest sequence already issued for this prefix and date, read from
/// the documents themselves. String ordering works because the numbers
/// share a fixed-width layout.
async fn last_issued_sequence<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    date_key: &str,
) -> Result<i32, ServiceError> {
    let base = format!("{}-{}", prefix, date_key);

    let last_number = if prefix == PURCHASE_ORDER_PREFIX {
        PurchaseRecordEntity::find()
            .filter(purchase_record::Column::PurchaseOrderId.starts_with(base.as_str()))
            .order_by_desc(purchase_record::Column::PurchaseOrderId)
            .one(conn)
            .await?
            .map(|record| record.purchase_order_id)
    } else {
        BillEntity::find()
            .filter(bill::Column::InvoiceNumber.starts_with(base.as_str()))
            .order_by_desc(bill::Column::InvoiceNumber)
            .one(conn)
            .await?
            .map(|found| found.invoice_number)
    };

    Ok(last_number.map(|n| trailing_sequence(&n)).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn format_pads_sequence_to_four_digits() {
        assert_eq!(
            format_number("SB", date(2024, 5, 23), 4),
            "SB-202405230004"
        );
        assert_eq!(
            format_number("PO", date(2024, 12, 1), 1234),
            "PO-202412011234"
        );
    }

    #[test]
    fn format_survives_sequence_overflow_past_four_digits() {
        // Beyond 9999 the number just grows; ordering within the day is
        // no longer lexicographic but uniqueness still holds.
        assert_eq!(
            format_number("IB", date(2024, 1, 2), 10001),
            "IB-2024010210001"
        );
    }

    #[test_case("SB-202405230003", 3 ; "plain sequence")]
    #[test_case("SB-202405239999", 9999 ; "last of the day")]
    #[test_case("SB-20240523XYZW", 0 ; "unparsable tail restarts")]
    #[test_case("BAD", 0 ; "too short to carry a sequence")]
    #[test_case("", 0 ; "empty")]
    fn trailing_sequence_parses_the_last_four_digits(number: &str, expected: i32) {
        assert_eq!(trailing_sequence(number), expected);
    }

    #[test]
    fn formatted_numbers_round_trip_their_sequence() {
        for seq in [1u32, 42, 999, 9999] {
            let number = format_number("OB", date(2024, 5, 23), seq);
            assert_eq!(trailing_sequence(&number), seq as i32);
        }
    }
}
