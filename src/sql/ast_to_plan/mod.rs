/// Statement to logical-plan translation.
/// `PlanBuilder` dispatches on the statement variant and assembles the plan
/// tree bottom-up, collecting the privileges the statement needs on the way.

mod ddl;
mod delete;
mod insert;
mod misc;
mod select;
mod show;
mod update;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Catalog, TableInfo};
use crate::common::{Clause, Name, PlanError, PlanResult};
use crate::sql::ast::{ExprNode, SelectStmt, Statement, TableName};
use crate::sql::expression::Expression;
use crate::sql::plan::{IdAllocator, OptFlags, PlanKind, PlanNode};
use crate::sql::privilege::{append_visit_info, Privilege, VisitInfo};
use crate::sql::rewriter::{AggregateMapper, ExpressionRewriter};
use crate::sql::schema::Schema;
use crate::sql::session::SessionContext;

/// Result of translating one statement.
#[derive(Debug, Clone)]
pub struct Translation {
    pub plan: PlanNode,
    pub visit_info: Vec<VisitInfo>,
    pub opt_flags: OptFlags,
}

/// Optimizer hints of the SELECT being built.
#[derive(Debug, Clone, Default)]
pub struct TableHintInfo {
    pub sort_merge_join_tables: Vec<Name>,
}

impl TableHintInfo {
    /// True when a named side of the join is hinted for sort-merge join.
    pub fn if_prefer_merge_join(&self, tables: &[Option<&Name>]) -> bool {
        if self.sort_merge_join_tables.is_empty() {
            return false;
        }
        tables
            .iter()
            .flatten()
            .any(|t| self.sort_merge_join_tables.iter().any(|h| h.l == t.l))
    }
}

/// Mutable state of one translation. Never shared between statements.
#[derive(Debug, Default)]
pub struct TranslationState {
    pub allocator: IdAllocator,
    pub visit_info: Vec<VisitInfo>,
    /// Schemas of the enclosing queries, innermost last.
    pub outer_schemas: Vec<Arc<Schema>>,
    /// Column AST node (by `node_key`) to a pre-resolved output column.
    pub col_mapper: HashMap<usize, usize>,
    pub table_hints: Vec<TableHintInfo>,
    pub opt_flags: OptFlags,
}

pub struct PlanBuilder<'a> {
    catalog: &'a dyn Catalog,
    session: &'a SessionContext,
    rewriter: &'a dyn ExpressionRewriter,
    state: TranslationState,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(catalog: &'a dyn Catalog, session: &'a SessionContext, rewriter: &'a dyn ExpressionRewriter) -> Self {
        PlanBuilder { catalog, session, rewriter, state: TranslationState::default() }
    }

    pub fn build(&mut self, stmt: &Statement) -> PlanResult<PlanNode> {
        debug!("planner: build {}", stmt.kind_name());
        self.state.opt_flags.prune_columns = true;
        match stmt {
            Statement::Admin(s) => self.build_admin(s),
            Statement::Deallocate { name } => Ok(self.empty_node(PlanKind::Deallocate { name: name.clone() })),
            Statement::Delete(s) => self.build_delete(s),
            Statement::Execute(s) => self.build_execute(s),
            Statement::Explain(s) => self.build_explain(s),
            Statement::Insert(s) => self.build_insert(s),
            Statement::LoadData(s) => self.build_load_data(s),
            Statement::Prepare(s) => self.build_prepare(s),
            Statement::Select(s) => self.build_select(s),
            Statement::Union(s) => self.build_union(s),
            Statement::Update(s) => self.build_update(s),
            Statement::Show(s) => self.build_show(s),
            Statement::Do(exprs) => self.build_do(exprs),
            Statement::Set(vars) => self.build_set(vars),
            Statement::Analyze(tables) => self.build_analyze(tables),
            Statement::Simple(s) => self.build_simple(s),
            Statement::Ddl(s) => self.build_ddl(s),
        }
    }

    pub fn visit_info(&self) -> &[VisitInfo] {
        &self.state.visit_info
    }

    pub fn opt_flags(&self) -> OptFlags {
        self.state.opt_flags
    }

    pub fn into_translation(self, plan: PlanNode) -> Translation {
        Translation { plan, visit_info: self.state.visit_info, opt_flags: self.state.opt_flags }
    }

    /// Plans a subquery with `outer` visible to its correlated column references.
    pub fn build_subquery(&mut self, sel: &SelectStmt, outer: Arc<Schema>) -> PlanResult<PlanNode> {
        self.state.outer_schemas.push(outer);
        let result = self.build_select(sel);
        self.state.outer_schemas.pop();
        self.state.opt_flags.decorrelate = true;
        result
    }

    /// Rewrites `expr` through the configured rewriter; failures are tagged with `clause`.
    pub fn rewrite(
        &mut self,
        expr: &ExprNode,
        plan: Option<&PlanNode>,
        agg_mapper: Option<&AggregateMapper>,
        allow_aggregate: bool,
        clause: Clause,
    ) -> PlanResult<(Expression, bool)> {
        let rewriter = self.rewriter;
        rewriter
            .rewrite(self, expr, plan, agg_mapper, allow_aggregate)
            .map_err(|e| PlanError::expression(clause, e))
    }

    pub(crate) fn outer_schemas(&self) -> &[Arc<Schema>] {
        &self.state.outer_schemas
    }

    pub(crate) fn mapped_column(&self, key: usize) -> Option<usize> {
        self.state.col_mapper.get(&key).copied()
    }

    pub(crate) fn new_node(&mut self, kind: PlanKind, children: Vec<PlanNode>, schema: Arc<Schema>) -> PlanNode {
        PlanNode { id: self.state.allocator.alloc(), kind, children, schema }
    }

    /// A leaf with an empty schema.
    pub(crate) fn empty_node(&mut self, kind: PlanKind) -> PlanNode {
        self.new_node(kind, vec![], Arc::new(Schema::empty()))
    }

    pub(crate) fn add_visit_info(&mut self, privilege: Privilege, db: &str, table: &str, column: &str) {
        append_visit_info(&mut self.state.visit_info, privilege, db, table, column);
    }

    /// Lower-cased database of `table`, falling back to the session database.
    pub(crate) fn resolve_db(&self, table: &TableName) -> PlanResult<String> {
        let db = table.db_or(self.session.current_db());
        if db.is_empty() {
            return Err(PlanError::NoDatabaseSelected);
        }
        Ok(db)
    }

    pub(crate) fn lookup_table(&self, table: &TableName) -> PlanResult<(String, Arc<TableInfo>)> {
        let db = self.resolve_db(table)?;
        let unknown = || PlanError::UnknownTable { db: db.clone(), table: table.name.o.clone() };
        if !self.catalog.has_schema(&db) {
            return Err(unknown());
        }
        let info = self.catalog.table_by_name(&db, &table.name.l).ok_or_else(unknown)?;
        Ok((db, info))
    }
}

/// Translates one statement. Each call owns a fresh builder, so translating
/// the same statement twice yields structurally equal plans.
pub fn translate(
    stmt: &Statement,
    catalog: &dyn Catalog,
    session: &SessionContext,
    rewriter: &dyn ExpressionRewriter,
) -> PlanResult<Translation> {
    let mut builder = PlanBuilder::new(catalog, session, rewriter);
    let plan = match builder.build(stmt) {
        Ok(plan) => plan,
        Err(e) => {
            debug!("planner: {} failed: {}", stmt.kind_name(), e);
            return Err(e);
        }
    };
    debug!(
        "planner: {} -> {} ({} nodes, {} privileges)",
        stmt.kind_name(),
        plan.explain_id(),
        plan.node_count(),
        builder.visit_info().len()
    );
    Ok(builder.into_translation(plan))
}
