pub mod mem_catalog;
pub mod table_schema;

use std::sync::Arc;

pub use mem_catalog::MemCatalog;
pub use table_schema::{ColumnInfo, IndexColumn, IndexInfo, SchemaState, TableInfo};

/// Read-only view of schema metadata used during translation.
pub trait Catalog: Send + Sync {
    fn table_by_name(&self, db: &str, table: &str) -> Option<Arc<TableInfo>>;

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>>;

    fn has_schema(&self, db: &str) -> bool;
}
