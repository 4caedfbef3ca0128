use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::common::{Datum, FieldType, Name, PlanError, PlanResult};

/// Lifecycle state of a schema object while DDL is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaState {
    None,
    DeleteOnly,
    WriteOnly,
    WriteReorganization,
    DeleteReorganization,
    Public,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub id: i64,
    pub name: Name,
    pub offset: usize,
    pub field_type: FieldType,
    pub default_value: Option<Datum>,
    pub state: SchemaState,
}

impl ColumnInfo {
    pub fn is_pk(&self) -> bool {
        self.field_type.primary_key
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: Name,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub id: i64,
    pub name: Name,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub primary: bool,
    pub state: SchemaState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: i64,
    pub name: Name,
    pub columns: Vec<ColumnInfo>,
    pub indices: Vec<IndexInfo>,
    /// The integer primary key is the row handle rather than a separate index.
    pub pk_is_handle: bool,
}

impl TableInfo {
    pub fn new(id: i64, name: &str) -> Self {
        TableInfo {
            id,
            name: Name::new(name),
            columns: vec![],
            indices: vec![],
            pk_is_handle: false,
        }
    }

    pub fn column(self, name: &str, field_type: FieldType) -> Self {
        self.push_column(name, field_type, None)
    }

    pub fn column_with_default(self, name: &str, field_type: FieldType, default: Datum) -> Self {
        self.push_column(name, field_type, Some(default))
    }

    fn push_column(mut self, name: &str, field_type: FieldType, default_value: Option<Datum>) -> Self {
        let offset = self.columns.len();
        self.columns.push(ColumnInfo {
            id: offset as i64 + 1,
            name: Name::new(name),
            offset,
            field_type,
            default_value,
            state: SchemaState::Public,
        });
        self
    }

    /// Marks `name` as the integer primary key stored as the row handle.
    pub fn handle_pk(mut self, name: &str) -> Self {
        if let Some(col) = self.columns.iter_mut().find(|c| c.name.eq_str(name)) {
            col.field_type.primary_key = true;
            col.field_type.not_null = true;
            self.pk_is_handle = true;
        }
        self
    }

    pub fn index(self, name: &str, cols: &[&str], unique: bool) -> Self {
        self.index_in_state(name, cols, unique, SchemaState::Public)
    }

    pub fn index_in_state(mut self, name: &str, cols: &[&str], unique: bool, state: SchemaState) -> Self {
        let columns = cols
            .iter()
            .map(|c| IndexColumn {
                name: Name::new(c),
                offset: self
                    .columns
                    .iter()
                    .position(|col| col.name.eq_str(c))
                    .unwrap_or(usize::MAX),
            })
            .collect();
        let id = self.indices.len() as i64 + 1;
        self.indices.push(IndexInfo {
            id,
            name: Name::new(name),
            columns,
            unique,
            primary: false,
            state,
        });
        self
    }

    pub fn find_column(&self, name: &Name) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| &c.name == name)
    }

    pub fn public_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.state == SchemaState::Public)
    }

    pub fn validate(&self) -> PlanResult<()> {
        let mut names = HashSet::new();
        for col in &self.columns {
            if !names.insert(col.name.l.clone()) {
                return Err(PlanError::Catalog(format!("Duplicate column name {}", col.name)));
            }
        }
        for idx in &self.indices {
            for ic in &idx.columns {
                if ic.offset >= self.columns.len() {
                    return Err(PlanError::Catalog(format!(
                        "Index {} references unknown column {}",
                        idx.name, ic.name
                    )));
                }
            }
        }
        if self.pk_is_handle {
            let pk_count = self.columns.iter().filter(|c| c.is_pk()).count();
            if pk_count != 1 {
                return Err(PlanError::Catalog(format!(
                    "Table {} uses the primary key as handle but has {} primary key columns",
                    self.name, pk_count
                )));
            }
            if self.columns.iter().any(|c| c.is_pk() && !c.field_type.is_integer()) {
                return Err(PlanError::Catalog(format!(
                    "Handle primary key of table {} must be an integer column",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TypeCode;

    #[test]
    fn test_build_table() {
        let t = TableInfo::new(1, "T")
            .column("id", FieldType::new(TypeCode::LongLong))
            .column("name", FieldType::new(TypeCode::Varchar).with_len(64))
            .handle_pk("ID")
            .index("idx_name", &["name"], false);
        assert!(t.validate().is_ok());
        assert!(t.pk_is_handle);
        assert_eq!(t.indices[0].columns[0].offset, 1);
        assert!(t.find_column(&Name::new("NAME")).is_some());
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let t = TableInfo::new(1, "t")
            .column("id", FieldType::new(TypeCode::LongLong))
            .index("idx_x", &["x"], false);
        assert!(matches!(t.validate(), Err(PlanError::Catalog(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_column() {
        let t = TableInfo::new(1, "t")
            .column("id", FieldType::new(TypeCode::LongLong))
            .column("ID", FieldType::new(TypeCode::LongLong));
        assert!(t.validate().is_err());
    }
}
