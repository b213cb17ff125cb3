use sea_orm_migration::prelude::*;

use super::m20250301_000004_create_bills_tables::{BillItems, BillPayments, Bills};
use super::m20250301_000005_create_inventory_session_tables::{
    InventorySessionItems, InventorySessions,
};
use super::m20250301_000007_create_purchasing_tables::{PurchaseRecords, VendorPayments};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Bill list screens filter by type and status, newest first.
        manager
            .create_index(
                Index::create()
                    .name("idx_bills_type_status")
                    .table(Bills::Table)
                    .col(Bills::BillType)
                    .col(Bills::PaymentStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bills_created_at")
                    .table(Bills::Table)
                    .col((Bills::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bill_items_bill_id")
                    .table(BillItems::Table)
                    .col(BillItems::BillId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bill_payments_bill_id")
                    .table(BillPayments::Table)
                    .col(BillPayments::BillId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_sessions_status")
                    .table(InventorySessions::Table)
                    .col(InventorySessions::Status)
                    .col((InventorySessions::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_session_items_session_id")
                    .table(InventorySessionItems::Table)
                    .col(InventorySessionItems::SessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_records_ordered_date")
                    .table(PurchaseRecords::Table)
                    .col((PurchaseRecords::OrderedDate, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vendor_payments_vendor_id")
                    .table(VendorPayments::Table)
                    .col(VendorPayments::VendorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_vendor_payments_vendor_id",
            "idx_purchase_records_ordered_date",
            "idx_inventory_session_items_session_id",
            "idx_inventory_sessions_status",
            "idx_bill_payments_bill_id",
            "idx_bill_items_bill_id",
            "idx_bills_created_at",
            "idx_bills_type_status",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}
