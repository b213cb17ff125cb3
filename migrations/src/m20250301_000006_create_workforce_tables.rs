use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attendance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attendance::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attendance::UserId).uuid().not_null())
                    .col(ColumnDef::new(Attendance::Date).date().not_null())
                    .col(ColumnDef::new(Attendance::InTime).time().not_null())
                    .col(ColumnDef::new(Attendance::OutTime).time().null())
                    .col(
                        ColumnDef::new(Attendance::TotalHours)
                            .decimal_len(5, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Attendance::OvertimeHours)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Attendance::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_user_id")
                            .from(Attendance::Table, Attendance::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_user_date")
                    .table(Attendance::Table)
                    .col(Attendance::UserId)
                    .col(Attendance::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkLogs::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(WorkLogs::StudentId).uuid().not_null())
                    .col(ColumnDef::new(WorkLogs::Date).date().not_null())
                    .col(ColumnDef::new(WorkLogs::EntryTime).time().null())
                    .col(ColumnDef::new(WorkLogs::ExitTime).time().null())
                    .col(
                        ColumnDef::new(WorkLogs::WorkingHours)
                            .decimal_len(5, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkLogs::OvertimeHours)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(WorkLogs::Status)
                            .string_len(20)
                            .not_null()
                            .default("OPEN"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_logs_student_id")
                            .from(WorkLogs::Table, WorkLogs::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_logs_student_date")
                    .table(WorkLogs::Table)
                    .col(WorkLogs::StudentId)
                    .col(WorkLogs::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attendance::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Attendance {
    Table,
    Id,
    UserId,
    Date,
    InTime,
    OutTime,
    TotalHours,
    OvertimeHours,
    IsApproved,
}

#[derive(DeriveIden)]
pub enum WorkLogs {
    Table,
    Id,
    StudentId,
    Date,
    EntryTime,
    ExitTime,
    WorkingHours,
    OvertimeHours,
    Status,
}
