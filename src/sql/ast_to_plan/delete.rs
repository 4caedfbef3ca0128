use std::sync::Arc;

use crate::common::{Clause, PlanError, PlanResult};
use crate::sql::ast::DeleteStmt;
use crate::sql::plan::{PlanKind, PlanNode, TableRef};
use crate::sql::privilege::Privilege;
use crate::sql::schema::Schema;

use super::select::source_tables;
use super::PlanBuilder;

impl<'a> PlanBuilder<'a> {
    pub(crate) fn build_delete(&mut self, delete: &DeleteStmt) -> PlanResult<PlanNode> {
        let mut p = self.build_result_set_node(&delete.table_refs)?;
        if let Some(cond) = &delete.where_clause {
            p = self.build_selection(p, cond, None, Clause::Where)?;
        }
        if !delete.order_by.is_empty() {
            p = self.build_sort(p, &delete.order_by)?;
        }
        if let Some(limit) = delete.limit {
            p = self.build_limit(p, limit);
        }

        let sources = source_tables(&p);
        let mut tables = Vec::new();
        if delete.is_multi_table {
            let current_db = self.session.current_db();
            for tn in &delete.tables {
                let source = sources.iter().find(|s| {
                    s.name.l == tn.name.l && tn.schema.as_ref().is_none_or(|db| db.l == s.db)
                });
                match source {
                    Some(s) => tables.push(TableRef { db: s.db.to_string(), table: s.table.clone(), id: s.id }),
                    None => {
                        return Err(PlanError::UnknownTable { db: tn.db_or(current_db), table: tn.name.o.clone() });
                    }
                }
            }
        } else {
            tables.extend(sources.iter().map(|s| TableRef { db: s.db.to_string(), table: s.table.clone(), id: s.id }));
        }

        for t in &tables {
            self.add_visit_info(Privilege::Delete, &t.db, &t.table.l, "");
        }
        let kind = PlanKind::Delete { tables, is_multi_table: delete.is_multi_table };
        Ok(self.new_node(kind, vec![p], Arc::new(Schema::empty())))
    }
}
