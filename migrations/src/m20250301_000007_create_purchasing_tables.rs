use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users_table::Users;
use super::m20250301_000003_create_catalog_tables::Vendors;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseRecords::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseRecords::VendorId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseRecords::PurchaseOrderId)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::BillNo)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(PurchaseRecords::Description).text().not_null())
                    .col(
                        ColumnDef::new(PurchaseRecords::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseRecords::OrderedDate).date().not_null())
                    .col(ColumnDef::new(PurchaseRecords::ReceivedDate).date().null())
                    .col(
                        ColumnDef::new(PurchaseRecords::PaymentType)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::PaymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(PurchaseRecords::PaymentDate).date().null())
                    .col(
                        ColumnDef::new(PurchaseRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::PurchasedBy)
                            .uuid()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_records_vendor_id")
                            .from(PurchaseRecords::Table, PurchaseRecords::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_records_purchased_by")
                            .from(PurchaseRecords::Table, PurchaseRecords::PurchasedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseItems::PurchaseId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseItems::ItemName).string().not_null())
                    .col(ColumnDef::new(PurchaseItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(PurchaseItems::Price)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_items_purchase_id")
                            .from(PurchaseItems::Table, PurchaseItems::PurchaseId)
                            .to(PurchaseRecords::Table, PurchaseRecords::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VendorPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorPayments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorPayments::VendorId).uuid().not_null())
                    .col(
                        ColumnDef::new(VendorPayments::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorPayments::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorPayments::Status)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(VendorPayments::ApprovalStatus)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(VendorPayments::Details)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendor_payments_vendor_id")
                            .from(VendorPayments::Table, VendorPayments::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VendorPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PurchaseRecords {
    Table,
    Id,
    VendorId,
    PurchaseOrderId,
    BillNo,
    Description,
    TotalAmount,
    OrderedDate,
    ReceivedDate,
    PaymentType,
    PaymentStatus,
    PaymentDate,
    CreatedAt,
    PurchasedBy,
}

#[derive(DeriveIden)]
pub enum PurchaseItems {
    Table,
    Id,
    PurchaseId,
    ItemName,
    Quantity,
    Price,
}

#[derive(DeriveIden)]
pub enum VendorPayments {
    Table,
    Id,
    VendorId,
    Amount,
    Date,
    Status,
    ApprovalStatus,
    Details,
}
