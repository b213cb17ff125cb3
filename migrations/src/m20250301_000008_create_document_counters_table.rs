use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DocumentCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentCounters::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentCounters::Prefix)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentCounters::DateKey)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentCounters::LastSeq)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_document_counters_prefix_date")
                    .table(DocumentCounters::Table)
                    .col(DocumentCounters::Prefix)
                    .col(DocumentCounters::DateKey)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DocumentCounters {
    Table,
    Id,
    Prefix,
    DateKey,
    LastSeq,
}
