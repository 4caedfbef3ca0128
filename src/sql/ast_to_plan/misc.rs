use std::sync::Arc;

use crate::common::{Clause, FirstError, PlanError, PlanResult};
use crate::sql::ast::{ExecuteStmt, ExprNode, LoadDataStmt, PrepareStmt, TableName, VariableAssignment};
use crate::sql::expression::{Constant, VarAssignment};
use crate::sql::index_hints::column_offsets;
use crate::sql::plan::{AnalyzeTask, PlanKind, PlanNode};
use crate::sql::privilege::Privilege;
use crate::sql::schema::Schema;

use super::PlanBuilder;

impl<'a> PlanBuilder<'a> {
    pub(crate) fn build_prepare(&mut self, prepare: &PrepareStmt) -> PlanResult<PlanNode> {
        let sql_text = match &prepare.sql_var {
            Some(var) => self
                .session
                .user_var(&var.name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            None => prepare.sql_text.clone(),
        };
        Ok(self.empty_node(PlanKind::Prepare { name: prepare.name.clone(), sql_text }))
    }

    pub(crate) fn build_execute(&mut self, execute: &ExecuteStmt) -> PlanResult<PlanNode> {
        let param_count = self
            .session
            .prepared_param_count(&execute.name)
            .ok_or_else(|| PlanError::UnknownPreparedStatement(execute.name.clone()))?;
        if param_count != execute.using_vars.len() {
            return Err(PlanError::WrongArguments);
        }

        let mut first = FirstError::new();
        let mut using_vars = Vec::with_capacity(execute.using_vars.len());
        for var in &execute.using_vars {
            if let Some((expr, _)) = first.absorb(self.rewrite(var, None, None, false, Clause::ExecuteUsing)) {
                using_vars.push(expr);
            }
        }
        let using_vars = first.finish(using_vars)?;
        Ok(self.empty_node(PlanKind::Execute { name: execute.name.clone(), using_vars }))
    }

    /// DO evaluates its expressions over a one-row dual table and returns nothing.
    pub(crate) fn build_do(&mut self, exprs: &[ExprNode]) -> PlanResult<PlanNode> {
        let dual = self.empty_node(PlanKind::TableDual);
        let mut rewritten = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let (expr, _) = self.rewrite(expr, Some(&dual), None, false, Clause::Do)?;
            rewritten.push(expr);
        }
        Ok(self.new_node(PlanKind::Projection { exprs: rewritten }, vec![dual], Arc::new(Schema::empty())))
    }

    pub(crate) fn build_set(&mut self, vars: &[VariableAssignment]) -> PlanResult<PlanNode> {
        let mut var_assigns = Vec::with_capacity(vars.len());
        for var in vars {
            let (expr, is_default) = match &var.value {
                ExprNode::Default(None) => (None, true),
                value => {
                    let (expr, _) = self.rewrite(value, None, None, false, Clause::SetVariable)?;
                    (Some(expr), false)
                }
            };
            let extend_value = var
                .extend_value
                .as_ref()
                .map(|d| Constant { value: d.clone(), ret_type: d.literal_type() });
            var_assigns.push(VarAssignment {
                name: var.name.clone(),
                expr,
                is_default,
                is_global: var.is_global,
                is_system: var.is_system,
                extend_value,
            });
        }
        Ok(self.empty_node(PlanKind::Set { var_assigns }))
    }

    /// ANALYZE TABLE: one task per table with its column layout.
    pub(crate) fn build_analyze(&mut self, tables: &[TableName]) -> PlanResult<PlanNode> {
        let mut children = Vec::with_capacity(tables.len());
        for tn in tables {
            let (db, info) = self.lookup_table(tn)?;
            let offsets = column_offsets(&info, &tn.index_hints);
            let schema = Arc::new(Schema::from_table(&db, &info.name.o, &info));
            let task = AnalyzeTask { db, table: info.name.clone(), offsets };
            children.push(self.new_node(PlanKind::AnalyzeTable { task }, vec![], schema));
        }
        Ok(self.new_node(PlanKind::Analyze, children, Arc::new(Schema::empty())))
    }

    pub(crate) fn build_load_data(&mut self, load: &LoadDataStmt) -> PlanResult<PlanNode> {
        let db = self.resolve_db(&load.table)?;
        self.add_visit_info(Privilege::Insert, &db, &load.table.name.l, "");
        Ok(self.empty_node(PlanKind::LoadData {
            is_local: load.is_local,
            path: load.path.clone(),
            table: load.table.clone(),
            columns: load.columns.clone(),
            fields_info: load.fields_info.clone(),
            lines_info: load.lines_info.clone(),
        }))
    }
}
