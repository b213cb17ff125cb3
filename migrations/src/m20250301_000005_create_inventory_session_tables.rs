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
                    .table(InventorySessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventorySessions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessions::Outlet)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventorySessions::CustomerId).uuid().null())
                    .col(
                        ColumnDef::new(InventorySessions::CustomerName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(InventorySessions::PaymentStatus)
                            .string_len(10)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(InventorySessions::CreatedBy)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessions::Status)
                            .string_len(10)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(ColumnDef::new(InventorySessions::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(InventorySessions::BillId).uuid().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_sessions_created_by")
                            .from(InventorySessions::Table, InventorySessions::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_sessions_customer_id")
                            .from(InventorySessions::Table, InventorySessions::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventorySessionItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventorySessionItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionItems::SessionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionItems::ItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionItems::QuantityTaken)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventorySessionItems::QuantityReturned)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_session_items_session_id")
                            .from(
                                InventorySessionItems::Table,
                                InventorySessionItems::SessionId,
                            )
                            .to(InventorySessions::Table, InventorySessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_session_items_item_id")
                            .from(InventorySessionItems::Table, InventorySessionItems::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventorySessionPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventorySessionPayments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionPayments::SessionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionPayments::PaymentType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionPayments::Amount)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionPayments::ReferenceNumber)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(InventorySessionPayments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_session_payments_session_id")
                            .from(
                                InventorySessionPayments::Table,
                                InventorySessionPayments::SessionId,
                            )
                            .to(InventorySessions::Table, InventorySessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventorySessionStudents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventorySessionStudents::SessionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventorySessionStudents::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(InventorySessionStudents::SessionId)
                            .col(InventorySessionStudents::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_session_students_session_id")
                            .from(
                                InventorySessionStudents::Table,
                                InventorySessionStudents::SessionId,
                            )
                            .to(InventorySessions::Table, InventorySessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_session_students_user_id")
                            .from(
                                InventorySessionStudents::Table,
                                InventorySessionStudents::UserId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventorySessionStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventorySessionPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventorySessionItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventorySessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum InventorySessions {
    Table,
    Id,
    Outlet,
    CustomerId,
    CustomerName,
    PaymentStatus,
    CreatedBy,
    CreatedAt,
    Status,
    ClosedAt,
    BillId,
}

#[derive(DeriveIden)]
pub enum InventorySessionItems {
    Table,
    Id,
    SessionId,
    ItemId,
    QuantityTaken,
    QuantityReturned,
}

#[derive(DeriveIden)]
pub enum InventorySessionPayments {
    Table,
    Id,
    SessionId,
    PaymentType,
    Amount,
    ReferenceNumber,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum InventorySessionStudents {
    Table,
    SessionId,
    UserId,
}
