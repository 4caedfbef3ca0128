use std::collections::HashMap;
use std::sync::Arc;

use linked_hash_map::LinkedHashMap;
use tracing::debug;

use crate::common::{PlanError, PlanResult};

use super::table_schema::TableInfo;
use super::Catalog;

/// Catalog kept entirely in memory. It is filled once and read-only afterwards,
/// so one instance can serve concurrent translations.
#[derive(Debug, Default)]
pub struct MemCatalog {
    /// Tables per schema in registration order.
    schemas: HashMap<String, LinkedHashMap<String, Arc<TableInfo>>>,
    by_id: HashMap<i64, Arc<TableInfo>>,
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, db: &str) {
        self.schemas.entry(db.to_lowercase()).or_default();
    }

    pub fn add_table(&mut self, db: &str, table: TableInfo) -> PlanResult<()> {
        table.validate()?;
        if self.by_id.contains_key(&table.id) {
            return Err(PlanError::Catalog(format!("Duplicate table id {}", table.id)));
        }
        let tables = self.schemas.entry(db.to_lowercase()).or_default();
        if tables.contains_key(table.name.l.as_str()) {
            return Err(PlanError::Catalog(format!("Table {}.{} already exists", db, table.name)));
        }
        debug!("catalog: register table {}.{} (id {})", db, table.name, table.id);
        let table = Arc::new(table);
        tables.insert(table.name.l.clone(), table.clone());
        self.by_id.insert(table.id, table);
        Ok(())
    }

    /// Removes a table from the by-id index only, leaving the by-name entry.
    /// Mirrors a catalog whose id index is momentarily behind.
    pub fn forget_table_id(&mut self, id: i64) {
        self.by_id.remove(&id);
    }

    pub fn table_names(&self, db: &str) -> Vec<&str> {
        self.schemas
            .get(&db.to_lowercase())
            .map(|tables| tables.values().map(|t| t.name.o.as_str()).collect())
            .unwrap_or_default()
    }
}

impl Catalog for MemCatalog {
    fn table_by_name(&self, db: &str, table: &str) -> Option<Arc<TableInfo>> {
        self.schemas
            .get(&db.to_lowercase())
            .and_then(|tables| tables.get(table.to_lowercase().as_str()))
            .cloned()
    }

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>> {
        self.by_id.get(&id).cloned()
    }

    fn has_schema(&self, db: &str) -> bool {
        self.schemas.contains_key(&db.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FieldType, TypeCode};

    fn users() -> TableInfo {
        TableInfo::new(10, "Users")
            .column("id", FieldType::new(TypeCode::LongLong))
            .handle_pk("id")
    }

    #[test]
    fn test_lookup_by_name_and_id() {
        let mut catalog = MemCatalog::new();
        catalog.add_table("Test", users()).unwrap();
        assert!(catalog.has_schema("test"));
        let by_name = catalog.table_by_name("TEST", "users").unwrap();
        let by_id = catalog.table_by_id(10).unwrap();
        assert!(Arc::ptr_eq(&by_name, &by_id));
        assert!(catalog.table_by_name("test", "nope").is_none());
        assert!(catalog.table_by_name("other", "users").is_none());
    }

    #[test]
    fn test_duplicate_table() {
        let mut catalog = MemCatalog::new();
        catalog.add_table("test", users()).unwrap();
        assert!(catalog.add_table("test", users()).is_err());
    }

    #[test]
    fn test_table_names_keep_order() {
        let mut catalog = MemCatalog::new();
        catalog.add_table("test", TableInfo::new(2, "Zeta").column("a", FieldType::new(TypeCode::Long))).unwrap();
        catalog.add_table("test", users()).unwrap();
        assert_eq!(catalog.table_names("TEST"), vec!["Zeta", "Users"]);
        assert!(catalog.table_names("other").is_empty());
    }

    #[test]
    fn test_forget_table_id() {
        let mut catalog = MemCatalog::new();
        catalog.add_table("test", users()).unwrap();
        catalog.forget_table_id(10);
        assert!(catalog.table_by_name("test", "users").is_some());
        assert!(catalog.table_by_id(10).is_none());
    }
}
