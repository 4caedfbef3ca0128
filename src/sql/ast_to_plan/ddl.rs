use crate::common::PlanResult;
use crate::sql::ast::{DdlStmt, SimpleStmt};
use crate::sql::plan::{PlanKind, PlanNode};
use crate::sql::privilege::{collect_ddl, collect_simple};

use super::PlanBuilder;

impl<'a> PlanBuilder<'a> {
    pub(crate) fn build_ddl(&mut self, stmt: &DdlStmt) -> PlanResult<PlanNode> {
        collect_ddl(&mut self.state.visit_info, stmt, self.session.current_db());
        Ok(self.empty_node(PlanKind::Ddl { statement: stmt.clone() }))
    }

    pub(crate) fn build_simple(&mut self, stmt: &SimpleStmt) -> PlanResult<PlanNode> {
        collect_simple(&mut self.state.visit_info, stmt, self.session.current_db());
        Ok(self.empty_node(PlanKind::Simple { statement: stmt.clone() }))
    }
}
