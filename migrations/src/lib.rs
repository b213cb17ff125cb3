pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_permission_tables;
mod m20250301_000003_create_catalog_tables;
mod m20250301_000004_create_bills_tables;
mod m20250301_000005_create_inventory_session_tables;
mod m20250301_000006_create_workforce_tables;
mod m20250301_000007_create_purchasing_tables;
mod m20250301_000008_create_document_counters_table;
mod m20250412_000009_add_list_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_permission_tables::Migration),
            Box::new(m20250301_000003_create_catalog_tables::Migration),
            Box::new(m20250301_000004_create_bills_tables::Migration),
            Box::new(m20250301_000005_create_inventory_session_tables::Migration),
            Box::new(m20250301_000006_create_workforce_tables::Migration),
            Box::new(m20250301_000007_create_purchasing_tables::Migration),
            Box::new(m20250301_000008_create_document_counters_table::Migration),
            Box::new(m20250412_000009_add_list_indexes::Migration),
        ]
    }
}
