use std::sync::Arc;

use crate::common::{Clause, FirstError, PlanError, PlanResult};
use crate::sql::ast::UpdateStmt;
use crate::sql::expression::Assignment;
use crate::sql::plan::{PlanKind, PlanNode};
use crate::sql::privilege::Privilege;
use crate::sql::schema::Schema;

use super::select::source_tables;
use super::PlanBuilder;

const FIELD_LIST: &str = "field list";

impl<'a> PlanBuilder<'a> {
    pub(crate) fn build_update(&mut self, update: &UpdateStmt) -> PlanResult<PlanNode> {
        let mut p = self.build_result_set_node(&update.table_refs)?;
        if let Some(cond) = &update.where_clause {
            p = self.build_selection(p, cond, None, Clause::Where)?;
        }
        if !update.order_by.is_empty() {
            p = self.build_sort(p, &update.order_by)?;
        }
        if let Some(limit) = update.limit {
            p = self.build_limit(p, limit);
        }

        let mut first = FirstError::new();
        let mut ordered_list = Vec::with_capacity(update.list.len());
        // (db, table) per assigned table, in first-assignment order.
        let mut targets: Vec<(String, String)> = Vec::new();
        for assign in &update.list {
            let column = match p.schema.find_column(&assign.column) {
                Ok(Some(col)) => col.clone(),
                Ok(None) => {
                    first.record(PlanError::UnknownColumn { name: assign.column.to_string(), context: FIELD_LIST.to_string() });
                    continue;
                }
                Err(_) => {
                    first.record(PlanError::AmbiguousColumn { name: assign.column.to_string(), context: FIELD_LIST.to_string() });
                    continue;
                }
            };
            let target = source_tables(&p)
                .into_iter()
                .find(|s| s.name.l == column.table.l)
                .map(|s| (s.db.to_string(), s.table.l.clone()));
            match target {
                Some(target) if !targets.contains(&target) => targets.push(target),
                Some(_) => {}
                None => first.record(PlanError::UnknownTable { db: column.db.o.clone(), table: column.table.o.clone() }),
            }
            if let Some((expr, _)) = first.absorb(self.rewrite(&assign.expr, Some(&p), None, false, Clause::SetList)) {
                ordered_list.push(Assignment { column, expr });
            }
        }
        for (db, table) in &targets {
            self.add_visit_info(Privilege::Update, db, table, "");
        }
        let ordered_list = first.finish(ordered_list)?;

        let kind = PlanKind::Update { ordered_list, ignore: update.ignore };
        Ok(self.new_node(kind, vec![p], Arc::new(Schema::empty())))
    }
}
