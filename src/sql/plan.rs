/// Definitions for logical query plans.
/// This module defines the PlanNode tree built by the planner, the node kinds
/// it can hold and the helpers that render it.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::catalog::IndexInfo;
use crate::common::{Name, PlanError, PlanResult};
use crate::sql::ast::{
    ColumnName,
    DdlStmt,
    FieldsClause,
    JoinType,
    LinesClause,
    Priority,
    SelectLockType,
    ShowType,
    SimpleStmt,
    TableName,
    UserIdentity,
};
use crate::sql::expression::{Assignment, Expression, VarAssignment};
use crate::sql::index_hints::ColumnOffsets;
use crate::sql::schema::Schema;

/// Monotonic id source, one per translation.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> usize {
        self.next += 1;
        self.next
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ByItem {
    pub expr: Expression,
    pub desc: bool,
}

/// Target table of a write.
#[derive(Debug, Clone, Serialize)]
pub struct TableRef {
    pub db: String,
    pub table: Name,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeTask {
    pub db: String,
    pub table: Name,
    pub offsets: ColumnOffsets,
}

/// Node kinds of the logical plan.
#[derive(Debug, Clone)]
pub enum PlanKind {
    /// Scan of one catalog table.
    DataSource {
        db: String,
        table: Name,
        table_id: i64,
        alias: Option<Name>,
        indices: Vec<IndexInfo>,
        table_scan_allowed: bool,
    },
    TableDual,
    Join {
        join_type: JoinType,
        conditions: Vec<Expression>,
        prefer_merge_join: bool,
    },
    Selection {
        conditions: Vec<Expression>,
    },
    Aggregation {
        agg_funcs: Vec<Expression>,
        group_by: Vec<Expression>,
    },
    Projection {
        exprs: Vec<Expression>,
    },
    Sort {
        by_items: Vec<ByItem>,
    },
    Limit {
        offset: u64,
        count: u64,
    },
    Union {
        all: bool,
    },
    SelectLock {
        lock: SelectLockType,
    },
    Insert {
        table: TableRef,
        columns: Vec<Name>,
        lists: Vec<Vec<Expression>>,
        setlist: Vec<Assignment>,
        on_duplicate: Vec<Assignment>,
        is_replace: bool,
        ignore: bool,
        priority: Priority,
    },
    Update {
        ordered_list: Vec<Assignment>,
        ignore: bool,
    },
    Delete {
        tables: Vec<TableRef>,
        is_multi_table: bool,
    },
    Show {
        tp: ShowType,
        db_name: String,
        table: Option<TableName>,
        full: bool,
        global: bool,
        user: Option<UserIdentity>,
    },
    Ddl {
        statement: DdlStmt,
    },
    Simple {
        statement: SimpleStmt,
    },
    Explain {
        rows: Vec<ExplainRow>,
    },
    Analyze,
    AnalyzeTable {
        task: AnalyzeTask,
    },
    LoadData {
        is_local: bool,
        path: String,
        table: TableName,
        columns: Vec<ColumnName>,
        fields_info: FieldsClause,
        lines_info: LinesClause,
    },
    Execute {
        name: String,
        using_vars: Vec<Expression>,
    },
    Prepare {
        name: String,
        sql_text: String,
    },
    Deallocate {
        name: String,
    },
    Set {
        var_assigns: Vec<VarAssignment>,
    },
    CheckTable {
        tables: Vec<TableName>,
    },
    ShowDdl,
}

impl PlanKind {
    pub fn name(&self) -> &'static str {
        match self {
            PlanKind::DataSource { .. } => "DataScan",
            PlanKind::TableDual => "TableDual",
            PlanKind::Join { .. } => "Join",
            PlanKind::Selection { .. } => "Selection",
            PlanKind::Aggregation { .. } => "Aggregation",
            PlanKind::Projection { .. } => "Projection",
            PlanKind::Sort { .. } => "Sort",
            PlanKind::Limit { .. } => "Limit",
            PlanKind::Union { .. } => "Union",
            PlanKind::SelectLock { .. } => "SelectLock",
            PlanKind::Insert { .. } => "Insert",
            PlanKind::Update { .. } => "Update",
            PlanKind::Delete { .. } => "Delete",
            PlanKind::Show { .. } => "Show",
            PlanKind::Ddl { .. } => "DDL",
            PlanKind::Simple { .. } => "Simple",
            PlanKind::Explain { .. } => "Explain",
            PlanKind::Analyze => "Analyze",
            PlanKind::AnalyzeTable { .. } => "AnalyzeTable",
            PlanKind::LoadData { .. } => "LoadData",
            PlanKind::Execute { .. } => "Execute",
            PlanKind::Prepare { .. } => "Prepare",
            PlanKind::Deallocate { .. } => "Deallocate",
            PlanKind::Set { .. } => "Set",
            PlanKind::CheckTable { .. } => "CheckTable",
            PlanKind::ShowDdl => "ShowDDL",
        }
    }

    /// One-line description used by the tree printer and EXPLAIN.
    fn label(&self) -> String {
        match self {
            PlanKind::DataSource { db, table, alias, indices, table_scan_allowed, .. } => {
                let idx = indices.iter().map(|i| i.name.o.clone()).collect::<Vec<_>>().join(", ");
                let alias = alias.as_ref().map(|a| format!(" AS {}", a)).unwrap_or_default();
                format!("[{}.{}{}] indices=[{}] table_scan={}", db, table, alias, idx, table_scan_allowed)
            }
            PlanKind::Join { join_type, conditions, prefer_merge_join } => {
                format!("[{:?}, on: {}, merge_join: {}]", join_type, fmt_exprs(conditions), prefer_merge_join)
            }
            PlanKind::Selection { conditions } => format!("[{}]", fmt_exprs(conditions)),
            PlanKind::Aggregation { agg_funcs, group_by } => {
                format!("[group_by: {}, aggr: {}]", fmt_exprs(group_by), fmt_exprs(agg_funcs))
            }
            PlanKind::Projection { exprs } => format!("[{}]", fmt_exprs(exprs)),
            PlanKind::Sort { by_items } => {
                let items = by_items
                    .iter()
                    .map(|b| format!("{} {}", b.expr, if b.desc { "DESC" } else { "ASC" }))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}]", items)
            }
            PlanKind::Limit { offset, count } => format!("[offset: {}, count: {}]", offset, count),
            PlanKind::Union { all } => format!("[all: {}]", all),
            PlanKind::SelectLock { lock } => format!("[{:?}]", lock),
            PlanKind::Insert { table, lists, setlist, on_duplicate, .. } => format!(
                "[{}.{}] rows={} set={} on_duplicate={}",
                table.db,
                table.table,
                lists.len(),
                setlist.len(),
                on_duplicate.len()
            ),
            PlanKind::Update { ordered_list, .. } => format!("[assigns={}]", ordered_list.len()),
            PlanKind::Delete { tables, .. } => {
                let names = tables.iter().map(|t| format!("{}.{}", t.db, t.table)).collect::<Vec<_>>().join(", ");
                format!("[{}]", names)
            }
            PlanKind::Show { tp, .. } => format!("[{:?}]", tp),
            PlanKind::AnalyzeTable { task } => format!("[{}.{}]", task.db, task.table),
            PlanKind::Execute { name, .. } | PlanKind::Prepare { name, .. } | PlanKind::Deallocate { name } => {
                format!("[{}]", name)
            }
            PlanKind::CheckTable { tables } => {
                format!("[{}]", tables.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", "))
            }
            _ => String::new(),
        }
    }
}

fn fmt_exprs(exprs: &[Expression]) -> String {
    exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// A node of the logical plan tree. Children are owned; the schema may be
/// shared read-only with the parent when it passes through unchanged.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub id: usize,
    pub kind: PlanKind,
    pub children: Vec<PlanNode>,
    pub schema: Arc<Schema>,
}

impl PlanNode {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn child(&self, i: usize) -> PlanResult<&PlanNode> {
        self.children
            .get(i)
            .ok_or_else(|| PlanError::Internal(format!("{} has no child {}", self.explain_id(), i)))
    }

    pub fn explain_id(&self) -> String {
        format!("{}_{}", self.kind.name(), self.id)
    }

    /// Node count of the tree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Kind names in pre-order; two trees of the same shape produce the same list.
    pub fn shape(&self) -> Vec<&'static str> {
        let mut out = vec![self.kind.name()];
        for child in &self.children {
            out.extend(child.shape());
        }
        out
    }

    /// Renders the tree one node per line.
    pub fn format_tree(&self) -> String {
        fn inner(plan: &PlanNode, prefix: &str, is_last: bool, out: &mut String) {
            let branch = if is_last { "└── " } else { "├── " };
            out.push_str(&format!("{}{}{} {}\n", prefix, branch, plan.explain_id(), plan.kind.label()));

            let new_prefix = if is_last { format!("{}    ", prefix) } else { format!("{}│   ", prefix) };
            for (i, child) in plan.children.iter().enumerate() {
                inner(child, &new_prefix, i + 1 == plan.children.len(), out);
            }
        }
        let mut out = String::new();
        inner(self, "", true, &mut out);
        out
    }
}

/// One row of EXPLAIN output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainRow {
    pub id: String,
    pub json: String,
    pub parent_id: String,
}

/// EXPLAIN rows of `plan` in pre-order.
pub fn explain_rows(plan: &PlanNode) -> Vec<ExplainRow> {
    fn visit(plan: &PlanNode, parent_id: &str, rows: &mut Vec<ExplainRow>) {
        let id = plan.explain_id();
        let columns: Vec<String> = plan.schema.columns().iter().map(|c| c.qualified_name()).collect();
        let info = json!({
            "type": plan.kind.name(),
            "detail": plan.kind.label(),
            "columns": columns,
        });
        rows.push(ExplainRow { id: id.clone(), json: info.to_string(), parent_id: parent_id.to_string() });
        for child in &plan.children {
            visit(child, &id, rows);
        }
    }
    let mut rows = Vec::new();
    visit(plan, "", &mut rows);
    rows
}

/// Logical rewrite passes a statement asks the optimizer for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptFlags {
    pub prune_columns: bool,
    pub push_down_predicates: bool,
    pub eliminate_aggregation: bool,
    pub decorrelate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FieldType, TypeCode};
    use crate::sql::schema::Column;

    fn node(id: usize, kind: PlanKind, children: Vec<PlanNode>) -> PlanNode {
        let schema = Arc::new(Schema::new(vec![Column::new("test", "t", "a", FieldType::new(TypeCode::Long))]));
        PlanNode { id, kind, children, schema }
    }

    #[test]
    fn test_id_allocator() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc(), 1);
        assert_eq!(alloc.alloc(), 2);
        let mut fresh = IdAllocator::new();
        assert_eq!(fresh.alloc(), 1);
    }

    #[test]
    fn test_format_tree_and_explain() {
        let scan = node(
            1,
            PlanKind::DataSource {
                db: "test".to_string(),
                table: Name::new("t"),
                table_id: 1,
                alias: None,
                indices: vec![],
                table_scan_allowed: true,
            },
            vec![],
        );
        let limit = node(2, PlanKind::Limit { offset: 0, count: 10 }, vec![scan]);
        let tree = limit.format_tree();
        assert!(tree.starts_with("└── Limit_2 [offset: 0, count: 10]\n"));
        assert!(tree.contains("    └── DataScan_1 [test.t]"));
        assert_eq!(limit.shape(), vec!["Limit", "DataScan"]);
        assert_eq!(limit.node_count(), 2);

        let rows = explain_rows(&limit);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].parent_id, "");
        assert_eq!(rows[1].parent_id, "Limit_2");
        let parsed: serde_json::Value = serde_json::from_str(&rows[1].json).unwrap();
        assert_eq!(parsed["type"], "DataScan");
        assert_eq!(parsed["columns"][0], "t.a");
    }

    #[test]
    fn test_missing_child() {
        let dual = node(1, PlanKind::TableDual, vec![]);
        assert!(matches!(dual.child(0), Err(PlanError::Internal(_))));
    }
}
