use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users_table::Users;
use super::m20250301_000003_create_catalog_tables::{Customers, Items};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bills::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bills::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Bills::InvoiceNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Bills::BillType).string_len(10).not_null())
                    .col(
                        ColumnDef::new(Bills::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bills::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Bills::CustomerId).uuid().null())
                    .col(
                        ColumnDef::new(Bills::CustomerName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Bills::CustomerAddress)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Bills::Outlet).string_len(50).null())
                    .col(
                        ColumnDef::new(Bills::PaymentType)
                            .string_len(20)
                            .not_null()
                            .default("CASH"),
                    )
                    .col(
                        ColumnDef::new(Bills::AdvancePayment)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Bills::AdvancePaymentType)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Bills::PaymentStatus)
                            .string_len(10)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Bills::Remarks).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Bills::TotalAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Bills::DeliveryDate).date().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bills_created_by")
                            .from(Bills::Table, Bills::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bills_customer_id")
                            .from(Bills::Table, Bills::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BillItems::BillId).uuid().not_null())
                    .col(ColumnDef::new(BillItems::ItemId).uuid().null())
                    .col(ColumnDef::new(BillItems::CustomItemName).string().null())
                    .col(
                        ColumnDef::new(BillItems::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(BillItems::Price)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_items_bill_id")
                            .from(BillItems::Table, BillItems::BillId)
                            .to(Bills::Table, Bills::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_items_item_id")
                            .from(BillItems::Table, BillItems::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillPayments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BillPayments::BillId).uuid().not_null())
                    .col(
                        ColumnDef::new(BillPayments::PaymentType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillPayments::Amount)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillPayments::ReferenceNumber)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_payments_bill_id")
                            .from(BillPayments::Table, BillPayments::BillId)
                            .to(Bills::Table, Bills::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillStudents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BillStudents::BillId).uuid().not_null())
                    .col(ColumnDef::new(BillStudents::UserId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(BillStudents::BillId)
                            .col(BillStudents::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_students_bill_id")
                            .from(BillStudents::Table, BillStudents::BillId)
                            .to(Bills::Table, Bills::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_students_user_id")
                            .from(BillStudents::Table, BillStudents::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BillStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BillPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BillItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bills::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Bills {
    Table,
    Id,
    InvoiceNumber,
    BillType,
    CreatedAt,
    CreatedBy,
    CustomerId,
    CustomerName,
    CustomerAddress,
    Outlet,
    PaymentType,
    AdvancePayment,
    AdvancePaymentType,
    PaymentStatus,
    Remarks,
    TotalAmount,
    DeliveryDate,
}

#[derive(DeriveIden)]
pub enum BillItems {
    Table,
    Id,
    BillId,
    ItemId,
    CustomItemName,
    Quantity,
    Price,
}

#[derive(DeriveIden)]
pub enum BillPayments {
    Table,
    Id,
    BillId,
    PaymentType,
    Amount,
    ReferenceNumber,
}

#[derive(DeriveIden)]
pub enum BillStudents {
    Table,
    BillId,
    UserId,
}
