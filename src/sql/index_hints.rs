/// Index hint resolution and column classification for statistics collection.

use serde::Serialize;
use tracing::debug;

use crate::catalog::{IndexInfo, SchemaState, TableInfo};
use crate::common::Name;
use crate::sql::ast::{IndexHint, IndexHintScope, IndexHintType};

/// Indices a scan of `table` may use under `hints`, and whether a full table
/// scan stays admissible.
pub fn available_indices<'t>(hints: &[IndexHint], table: &'t TableInfo) -> (Vec<&'t IndexInfo>, bool) {
    let usable_hints: Vec<&IndexHint> = hints
        .iter()
        .filter(|h| h.hint_scope == IndexHintScope::Scan)
        .collect();
    let public_indices: Vec<&IndexInfo> = table
        .indices
        .iter()
        .filter(|idx| idx.state == SchemaState::Public)
        .collect();
    if usable_hints.is_empty() {
        return (public_indices, true);
    }

    let mut has_use = false;
    let mut indices = Vec::new();
    let mut ignores = Vec::new();
    for hint in usable_hints {
        let target = match hint.hint_type {
            // USE and FORCE are not told apart yet.
            IndexHintType::Use | IndexHintType::Force => {
                has_use = true;
                &mut indices
            }
            IndexHintType::Ignore => &mut ignores,
        };
        for name in &hint.index_names {
            match find_index_by_name(&public_indices, name) {
                Some(idx) => target.push(idx),
                None => debug!("index hint names unknown index {} on table {}", name, table.name),
            }
        }
    }

    let indices = remove_ignores(indices, &ignores);
    if !indices.is_empty() {
        return (indices, false);
    }
    if has_use {
        // An empty USE list means no index at all.
        return (Vec::new(), true);
    }
    (remove_ignores(public_indices, &ignores), true)
}

fn remove_ignores<'t>(indices: Vec<&'t IndexInfo>, ignores: &[&IndexInfo]) -> Vec<&'t IndexInfo> {
    if ignores.is_empty() {
        return indices;
    }
    indices
        .into_iter()
        .filter(|idx| find_index_by_name(ignores, &idx.name).is_none())
        .collect()
}

fn find_index_by_name<'t>(indices: &[&'t IndexInfo], name: &Name) -> Option<&'t IndexInfo> {
    indices.iter().find(|idx| idx.name.l == name.l).copied()
}

/// Column layout of one table for ANALYZE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnOffsets {
    /// Positions in `table.indices` of the admissible indices.
    pub index_offsets: Vec<usize>,
    /// Columns covered by a single-column index, excluding the handle primary key.
    pub indexed_column_offsets: Vec<usize>,
    /// Columns with no index coverage.
    pub plain_column_offsets: Vec<usize>,
    /// The integer primary key stored as the row handle.
    pub pk_offset: Option<usize>,
}

pub fn column_offsets(table: &TableInfo, hints: &[IndexHint]) -> ColumnOffsets {
    let mut offsets = ColumnOffsets::default();
    let mut covered: Vec<&str> = Vec::new();
    if table.pk_is_handle {
        for (i, col) in table.columns.iter().enumerate() {
            if col.is_pk() {
                covered.push(&col.name.l);
                offsets.pk_offset = Some(i);
            }
        }
    }

    let (indices, _) = available_indices(hints, table);
    for index in indices {
        if let Some(pos) = table.indices.iter().position(|idx| idx.name.l == index.name.l) {
            offsets.index_offsets.push(pos);
        }
        // Composite indices do not cover their member columns.
        if let [only] = index.columns.as_slice() {
            covered.push(&only.name.l);
        }
    }

    for (i, col) in table.columns.iter().enumerate() {
        if !covered.contains(&col.name.l.as_str()) {
            offsets.plain_column_offsets.push(i);
        } else if offsets.pk_offset != Some(i) {
            offsets.indexed_column_offsets.push(i);
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FieldType, TypeCode};

    fn table() -> TableInfo {
        TableInfo::new(1, "t")
            .column("id", FieldType::new(TypeCode::LongLong))
            .column("name", FieldType::new(TypeCode::Varchar).with_len(64))
            .column("note", FieldType::new(TypeCode::Varchar).with_len(255))
            .column("a", FieldType::new(TypeCode::Long))
            .handle_pk("id")
            .index("ix1", &["name"], false)
            .index("ix2", &["a", "note"], false)
            .index_in_state("ix_new", &["a"], false, SchemaState::WriteOnly)
    }

    fn names(indices: &[&IndexInfo]) -> Vec<String> {
        indices.iter().map(|i| i.name.l.clone()).collect()
    }

    #[test]
    fn test_no_hints() {
        let t = table();
        let (indices, scan) = available_indices(&[], &t);
        assert_eq!(names(&indices), vec!["ix1", "ix2"]);
        assert!(scan);
    }

    #[test]
    fn test_use_index() {
        let t = table();
        let (indices, scan) = available_indices(&[IndexHint::new(IndexHintType::Use, &["IX1"])], &t);
        assert_eq!(names(&indices), vec!["ix1"]);
        assert!(!scan);
        let (indices, scan) = available_indices(&[IndexHint::new(IndexHintType::Force, &["ix2"])], &t);
        assert_eq!(names(&indices), vec!["ix2"]);
        assert!(!scan);
    }

    #[test]
    fn test_empty_use_index() {
        let t = table();
        let (indices, scan) = available_indices(&[IndexHint::new(IndexHintType::Use, &[])], &t);
        assert!(indices.is_empty());
        assert!(scan);
    }

    #[test]
    fn test_ignore_index() {
        let t = table();
        let (indices, scan) = available_indices(&[IndexHint::new(IndexHintType::Ignore, &["ix1"])], &t);
        assert_eq!(names(&indices), vec!["ix2"]);
        assert!(scan);
    }

    #[test]
    fn test_use_and_ignore_same_index() {
        let t = table();
        let hints = [IndexHint::new(IndexHintType::Use, &["ix1"]), IndexHint::new(IndexHintType::Ignore, &["ix1"])];
        let (indices, scan) = available_indices(&hints, &t);
        assert!(indices.is_empty());
        assert!(scan);
    }

    #[test]
    fn test_unknown_and_non_public_names_dropped() {
        let t = table();
        let (indices, scan) = available_indices(&[IndexHint::new(IndexHintType::Use, &["nope", "ix_new"])], &t);
        assert!(indices.is_empty());
        assert!(scan);
    }

    #[test]
    fn test_join_scope_hints_ignored() {
        let t = table();
        let hint = IndexHint::new(IndexHintType::Use, &["ix1"]).with_scope(IndexHintScope::Join);
        let (indices, scan) = available_indices(&[hint], &t);
        assert_eq!(indices.len(), 2);
        assert!(scan);
    }

    #[test]
    fn test_column_offsets() {
        let t = TableInfo::new(2, "t")
            .column("id", FieldType::new(TypeCode::LongLong))
            .column("name", FieldType::new(TypeCode::Varchar).with_len(64))
            .column("note", FieldType::new(TypeCode::Varchar).with_len(255))
            .handle_pk("id")
            .index("idx_name", &["name"], false);
        let offsets = column_offsets(&t, &[]);
        assert_eq!(offsets.indexed_column_offsets, vec![1]);
        assert_eq!(offsets.pk_offset, Some(0));
        assert_eq!(offsets.plain_column_offsets, vec![2]);
        assert_eq!(offsets.index_offsets, vec![0]);
    }

    #[test]
    fn test_column_offsets_composite_and_hints() {
        let t = table();
        let offsets = column_offsets(&t, &[]);
        // ix2 is composite, ix_new is not public
        assert_eq!(offsets.indexed_column_offsets, vec![1]);
        assert_eq!(offsets.plain_column_offsets, vec![2, 3]);
        assert_eq!(offsets.index_offsets, vec![0, 1]);

        let offsets = column_offsets(&t, &[IndexHint::new(IndexHintType::Ignore, &["ix1"])]);
        assert!(offsets.indexed_column_offsets.is_empty());
        assert_eq!(offsets.plain_column_offsets, vec![1, 2, 3]);
        assert_eq!(offsets.pk_offset, Some(0));
    }

    #[test]
    fn test_column_offsets_without_handle() {
        let t = TableInfo::new(3, "t")
            .column("code", FieldType::new(TypeCode::Varchar).with_len(8))
            .column("v", FieldType::new(TypeCode::Long));
        let offsets = column_offsets(&t, &[]);
        assert_eq!(offsets.pk_offset, None);
        assert_eq!(offsets.plain_column_offsets, vec![0, 1]);
    }
}
