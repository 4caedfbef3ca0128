/// Output schemas of plan nodes.

use serde::Serialize;

use crate::catalog::TableInfo;
use crate::common::{FieldType, Name};
use crate::sql::ast::ColumnName;

/// One output column of a plan node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: Name,
    pub table: Name,
    pub db: Name,
    pub ret_type: FieldType,
    pub position: usize,
}

impl Column {
    pub fn new(db: &str, table: &str, name: &str, ret_type: FieldType) -> Self {
        Column {
            name: Name::new(name),
            table: Name::new(table),
            db: Name::new(db),
            ret_type,
            position: 0,
        }
    }

    /// `[db.][table.]name` matches when every qualifier given agrees.
    pub fn matches(&self, col: &ColumnName) -> bool {
        if self.name.l != col.name.l {
            return false;
        }
        if let Some(table) = &col.table {
            if self.table.l != table.l {
                return false;
            }
        }
        match &col.schema {
            Some(db) => self.db.l == db.l,
            None => true,
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.table.is_empty() {
            self.name.o.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }
}

/// Lookup failure inside one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLookupError {
    Ambiguous,
}

/// Ordered columns of a plan node's output. `columns[i].position == i` holds
/// after every constructor and mutator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut schema = Schema { columns };
        schema.reset_positions();
        schema
    }

    pub fn empty() -> Self {
        Schema::default()
    }

    /// Public columns of a catalog table, named after `table_name` (the alias when one is given).
    pub fn from_table(db: &str, table_name: &str, info: &TableInfo) -> Self {
        let columns = info
            .public_columns()
            .map(|c| Column::new(db, table_name, &c.name.o, c.field_type.clone()))
            .collect();
        Schema::new(columns)
    }

    /// Columns of `left` followed by columns of `right`.
    pub fn merge(left: &Schema, right: &Schema) -> Self {
        let columns = left.columns.iter().chain(right.columns.iter()).cloned().collect();
        Schema::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn append(&mut self, col: Column) {
        self.columns.push(col);
        self.reset_positions();
    }

    pub fn truncate(&mut self, len: usize) {
        self.columns.truncate(len);
        self.reset_positions();
    }

    /// Copy of this schema with every column moved under `table`.
    pub fn with_table_name(&self, table: &str) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column { table: Name::new(table), db: Name::default(), ..c.clone() })
            .collect();
        Schema::new(columns)
    }

    pub fn find_index(&self, col: &ColumnName) -> Result<Option<usize>, SchemaLookupError> {
        let mut found = None;
        for (i, c) in self.columns.iter().enumerate() {
            if c.matches(col) {
                if found.is_some() {
                    return Err(SchemaLookupError::Ambiguous);
                }
                found = Some(i);
            }
        }
        Ok(found)
    }

    pub fn find_column(&self, col: &ColumnName) -> Result<Option<&Column>, SchemaLookupError> {
        Ok(self.find_index(col)?.map(|i| &self.columns[i]))
    }

    fn reset_positions(&mut self) {
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.position = i;
        }
    }

    pub fn positions_consistent(&self) -> bool {
        self.columns.iter().enumerate().all(|(i, c)| c.position == i)
    }
}
