use std::sync::Arc;

use crate::common::{Clause, Datum, FirstError, Name, PlanError, PlanResult, RewriteError};
use crate::sql::ast::{
    ByItem as AstByItem,
    ColumnName,
    ExprNode,
    JoinType,
    Limit,
    QueryExpr,
    SelectField,
    SelectLockType,
    SelectStmt,
    TableName,
    TableOptimizerHint,
    TableSource,
    UnionStmt,
};
use crate::sql::expression::Expression;
use crate::sql::index_hints::available_indices;
use crate::sql::plan::{ByItem, PlanKind, PlanNode};
use crate::sql::privilege::Privilege;
use crate::sql::rewriter::AggregateMapper;
use crate::sql::schema::{Column, Schema};
use crate::sql::utils::{collect_aggregates, collect_columns, detect_select_agg, node_key, split_where};

use super::{PlanBuilder, TableHintInfo};

const HINT_SORT_MERGE_JOIN: &str = "tidb_smj";
const ORDER_CLAUSE: &str = "order clause";

/// A base table reached through the FROM tree of a plan.
pub(crate) struct SourceTable<'p> {
    /// Alias when one was given, the table name otherwise.
    pub name: &'p Name,
    pub db: &'p str,
    pub table: &'p Name,
    pub id: i64,
}

/// Base tables under `plan` in FROM order. Derived tables are entered.
pub(crate) fn source_tables(plan: &PlanNode) -> Vec<SourceTable<'_>> {
    fn visit<'p>(plan: &'p PlanNode, out: &mut Vec<SourceTable<'p>>) {
        if let PlanKind::DataSource { db, table, table_id, alias, .. } = &plan.kind {
            out.push(SourceTable { name: alias.as_ref().unwrap_or(table), db, table, id: *table_id });
        }
        for child in &plan.children {
            visit(child, out);
        }
    }
    let mut out = Vec::new();
    visit(plan, &mut out);
    out
}

fn source_name(plan: &PlanNode) -> Option<&Name> {
    match &plan.kind {
        PlanKind::DataSource { table, alias, .. } => Some(alias.as_ref().unwrap_or(table)),
        _ => None,
    }
}

/// 1-based select-list position written as an integer literal.
fn ordinal(expr: &ExprNode) -> Option<u64> {
    match expr {
        ExprNode::Literal(Datum::Int(v)) => Some((*v).max(0) as u64),
        ExprNode::Literal(Datum::UInt(v)) => Some(*v),
        _ => None,
    }
}

/// Output column for a projected expression named `name`.
fn output_column(expr: &Expression, name: &str) -> Column {
    match expr {
        Expression::Column(c) => Column { name: Name::new(name), ..c.clone() },
        _ => Column::new("", "", name, expr.ret_type()),
    }
}

fn lookup_in(schema: &Schema, name: &ColumnName, context: &str) -> PlanResult<Column> {
    match schema.find_column(name) {
        Ok(Some(col)) => Ok(col.clone()),
        Ok(None) => Err(PlanError::UnknownColumn { name: name.to_string(), context: context.to_string() }),
        Err(_) => Err(PlanError::AmbiguousColumn { name: name.to_string(), context: context.to_string() }),
    }
}

/// What a GROUP BY item groups on.
enum GroupTarget<'s> {
    Expr(&'s ExprNode),
    /// A position that falls inside a wildcard expansion.
    Column(Column),
}

/// The select-list entry at 1-based `pos`, with wildcards expanded over the
/// columns of `input`.
fn field_at<'s>(pos: u64, input: &PlanNode, sel: &'s SelectStmt) -> Option<GroupTarget<'s>> {
    let mut remaining = (pos as usize).checked_sub(1)?;
    for field in &sel.fields {
        match field {
            SelectField::Expr { expr, .. } => {
                if remaining == 0 {
                    return Some(GroupTarget::Expr(expr));
                }
                remaining -= 1;
            }
            SelectField::Wildcard { table } => {
                let mut expanded =
                    input.schema.columns().iter().filter(|c| table.as_ref().is_none_or(|t| t.l == c.table.l));
                let width = expanded.clone().count();
                if remaining < width {
                    return expanded.nth(remaining).cloned().map(GroupTarget::Column);
                }
                remaining -= width;
            }
        }
    }
    None
}

/// The expression a GROUP BY item stands for: a select-list position, a
/// select-list alias the input cannot resolve, or the item itself.
fn group_by_target<'s>(item: &'s ExprNode, input: &PlanNode, sel: &'s SelectStmt) -> PlanResult<GroupTarget<'s>> {
    if let Some(pos) = ordinal(item) {
        return field_at(pos, input, sel)
            .ok_or_else(|| PlanError::UnknownColumn { name: pos.to_string(), context: Clause::GroupBy.to_string() });
    }
    if let ExprNode::Column(c) = item {
        if c.name.table.is_none() && matches!(input.schema.find_index(&c.name), Ok(None)) {
            let aliased = sel.fields.iter().find_map(|f| match f {
                SelectField::Expr { expr, alias: Some(alias) } if alias.l == c.name.name.l => Some(expr),
                _ => None,
            });
            if let Some(expr) = aliased {
                return Ok(GroupTarget::Expr(expr));
            }
        }
    }
    Ok(GroupTarget::Expr(item))
}

impl<'a> PlanBuilder<'a> {
    pub(crate) fn build_query(&mut self, query: &QueryExpr) -> PlanResult<PlanNode> {
        match query {
            QueryExpr::Select(sel) => self.build_select(sel),
            QueryExpr::Union(union) => self.build_union(union),
        }
    }

    pub(crate) fn build_select(&mut self, sel: &SelectStmt) -> PlanResult<PlanNode> {
        let pushed = self.push_table_hints(&sel.table_hints);
        let result = self.build_select_body(sel);
        if pushed {
            self.state.table_hints.pop();
        }
        result
    }

    fn push_table_hints(&mut self, hints: &[TableOptimizerHint]) -> bool {
        let mut info = TableHintInfo::default();
        for hint in hints.iter().filter(|h| h.name.l == HINT_SORT_MERGE_JOIN) {
            info.sort_merge_join_tables.extend(hint.tables.iter().cloned());
        }
        if info.sort_merge_join_tables.is_empty() {
            return false;
        }
        self.state.table_hints.push(info);
        true
    }

    fn build_select_body(&mut self, sel: &SelectStmt) -> PlanResult<PlanNode> {
        let mut p = match &sel.from {
            Some(from) => self.build_result_set_node(from)?,
            None => self.empty_node(PlanKind::TableDual),
        };
        let from_schema = Arc::clone(&p.schema);

        if let Some(cond) = &sel.where_clause {
            p = self.build_selection(p, cond, None, Clause::Where)?;
        }
        if sel.lock != SelectLockType::None {
            p = self.build_select_lock(p, sel.lock);
        }

        let mut agg_mapper = None;
        if detect_select_agg(sel) {
            let (agg, mapper) = self.build_aggregation(p, sel)?;
            p = agg;
            agg_mapper = Some(mapper);
        }
        if let Some(having) = &sel.having {
            self.map_having_aliases(having, &p, sel, agg_mapper.as_ref());
            p = self.build_selection(p, having, agg_mapper.as_ref(), Clause::Having)?;
        }

        let (mut p, aliases) = self.build_projection(p, sel, &from_schema, agg_mapper.as_ref())?;
        let visible = p.schema.len();
        let by_items = self.resolve_order_by(&mut p, sel, &aliases, agg_mapper.as_ref())?;

        if sel.distinct {
            p = self.build_distinct(p);
        }
        if !by_items.is_empty() {
            let schema = Arc::clone(&p.schema);
            p = self.new_node(PlanKind::Sort { by_items }, vec![p], schema);
        }
        if p.schema.len() > visible {
            p = self.trim_projection(p, visible);
        }
        if let Some(limit) = sel.limit {
            p = self.build_limit(p, limit);
        }
        Ok(p)
    }

    /// Points unqualified HAVING columns that `p` cannot resolve at the
    /// select-list field carrying that alias, when the field is an aggregate
    /// or a column of `p`.
    fn map_having_aliases(
        &mut self,
        having: &ExprNode,
        p: &PlanNode,
        sel: &SelectStmt,
        agg_mapper: Option<&AggregateMapper>,
    ) {
        let mut cols = Vec::new();
        collect_columns(having, &mut cols);
        for node in cols {
            let ExprNode::Column(c) = node else { continue };
            if c.name.table.is_some() || !matches!(p.schema.find_index(&c.name), Ok(None)) {
                continue;
            }
            let aliased = sel.fields.iter().find_map(|f| match f {
                SelectField::Expr { expr, alias: Some(alias) } if alias.l == c.name.name.l => Some(expr),
                _ => None,
            });
            let slot = match aliased {
                Some(ExprNode::Column(field)) => p.schema.find_index(&field.name).ok().flatten(),
                Some(expr) if matches!(expr, ExprNode::Aggregate(_)) => {
                    agg_mapper.and_then(|m| m.get(&node_key(expr)).copied())
                }
                _ => None,
            };
            if let Some(i) = slot {
                self.state.col_mapper.insert(node_key(node), i);
            }
        }
    }

    pub(crate) fn build_union(&mut self, union: &UnionStmt) -> PlanResult<PlanNode> {
        let mut children = Vec::with_capacity(union.selects.len());
        for sel in &union.selects {
            children.push(self.build_select(sel)?);
        }
        let first = children
            .first()
            .map(|c| Arc::clone(&c.schema))
            .ok_or_else(|| PlanError::UnsupportedStatement("UnionStmt without SELECT".to_string()))?;
        if children.iter().any(|c| c.schema.len() != first.len()) {
            return Err(PlanError::WrongNumberOfColumnsInSelect);
        }
        let schema = Arc::new(Schema::new(first.columns().to_vec()));
        let p = self.new_node(PlanKind::Union { all: union.all }, children, schema);
        if union.all {
            return Ok(p);
        }
        Ok(self.build_distinct(p))
    }

    pub(crate) fn build_result_set_node(&mut self, source: &TableSource) -> PlanResult<PlanNode> {
        match source {
            TableSource::Table { name, alias } => self.build_data_source(name, alias.as_ref()),
            TableSource::Derived { query, alias } => {
                let mut p = self.build_query(query)?;
                p.schema = Arc::new(p.schema.with_table_name(&alias.o));
                Ok(p)
            }
            TableSource::Join { left, right, join_type, on } => self.build_join(left, right, *join_type, on.as_ref()),
        }
    }

    fn build_data_source(&mut self, tn: &TableName, alias: Option<&Name>) -> PlanResult<PlanNode> {
        let (db, info) = self.lookup_table(tn)?;
        self.add_visit_info(Privilege::Select, &db, &info.name.l, "");

        let (indices, table_scan_allowed) = available_indices(&tn.index_hints, &info);
        let indices = indices.into_iter().cloned().collect();
        let table_name = alias.map_or(info.name.o.as_str(), |a| a.o.as_str());
        let schema = Arc::new(Schema::from_table(&db, table_name, &info));
        let kind = PlanKind::DataSource {
            db,
            table: info.name.clone(),
            table_id: info.id,
            alias: alias.cloned(),
            indices,
            table_scan_allowed,
        };
        Ok(self.new_node(kind, vec![], schema))
    }

    fn build_join(
        &mut self,
        left: &TableSource,
        right: &TableSource,
        join_type: JoinType,
        on: Option<&ExprNode>,
    ) -> PlanResult<PlanNode> {
        let left = self.build_result_set_node(left)?;
        let right = self.build_result_set_node(right)?;
        let prefer_merge_join = self
            .state
            .table_hints
            .last()
            .is_some_and(|h| h.if_prefer_merge_join(&[source_name(&left), source_name(&right)]));
        let schema = Arc::new(Schema::merge(&left.schema, &right.schema));
        let kind = PlanKind::Join { join_type, conditions: vec![], prefer_merge_join };
        let mut join = self.new_node(kind, vec![left, right], schema);

        if let Some(on) = on {
            let mut first = FirstError::new();
            let mut on_conditions = Vec::new();
            for cond in split_where(Some(on)) {
                if let Some((expr, _)) = first.absorb(self.rewrite(cond, Some(&join), None, false, Clause::JoinOn)) {
                    on_conditions.push(expr);
                }
            }
            let on_conditions = first.finish(on_conditions)?;
            if let PlanKind::Join { conditions, .. } = &mut join.kind {
                *conditions = on_conditions;
            }
        }
        Ok(join)
    }

    /// Selection over `p` holding the conjuncts of `cond`. Every conjunct is
    /// rewritten; the first failure is reported.
    pub(crate) fn build_selection(
        &mut self,
        p: PlanNode,
        cond: &ExprNode,
        agg_mapper: Option<&AggregateMapper>,
        clause: Clause,
    ) -> PlanResult<PlanNode> {
        let mut first = FirstError::new();
        let mut conditions = Vec::new();
        for conjunct in split_where(Some(cond)) {
            if let Some((expr, _)) = first.absorb(self.rewrite(conjunct, Some(&p), agg_mapper, false, clause)) {
                conditions.push(expr);
            }
        }
        let conditions = first.finish(conditions)?;
        self.state.opt_flags.push_down_predicates = true;
        let schema = Arc::clone(&p.schema);
        Ok(self.new_node(PlanKind::Selection { conditions }, vec![p], schema))
    }

    fn build_select_lock(&mut self, p: PlanNode, lock: SelectLockType) -> PlanNode {
        let schema = Arc::clone(&p.schema);
        self.new_node(PlanKind::SelectLock { lock }, vec![p], schema)
    }

    /// Aggregation over `p`. Output is the distinct aggregate calls of the
    /// select list, HAVING and ORDER BY followed by the columns of `p`.
    fn build_aggregation(&mut self, p: PlanNode, sel: &SelectStmt) -> PlanResult<(PlanNode, AggregateMapper)> {
        let mut agg_nodes = Vec::new();
        for field in &sel.fields {
            if let SelectField::Expr { expr, .. } = field {
                collect_aggregates(expr, &mut agg_nodes);
            }
        }
        if let Some(having) = &sel.having {
            collect_aggregates(having, &mut agg_nodes);
        }
        for item in &sel.order_by {
            collect_aggregates(&item.expr, &mut agg_nodes);
        }

        let mut mapper = AggregateMapper::new();
        let mut distinct_nodes: Vec<&ExprNode> = Vec::new();
        for node in agg_nodes {
            let idx = match distinct_nodes.iter().position(|n| *n == node) {
                Some(idx) => idx,
                None => {
                    distinct_nodes.push(node);
                    distinct_nodes.len() - 1
                }
            };
            mapper.insert(node_key(node), idx);
        }

        let mut agg_funcs = Vec::with_capacity(distinct_nodes.len());
        let mut columns = Vec::with_capacity(distinct_nodes.len() + p.schema.len());
        for node in &distinct_nodes {
            let (expr, _) = self.rewrite(node, Some(&p), None, true, Clause::FieldList)?;
            columns.push(Column::new("", "", &node.to_string(), expr.ret_type()));
            agg_funcs.push(expr);
        }
        columns.extend(p.schema.columns().iter().cloned());

        let mut group_by = Vec::with_capacity(sel.group_by.len());
        for item in &sel.group_by {
            let expr = match group_by_target(item, &p, sel)? {
                GroupTarget::Column(col) => Expression::Column(col),
                GroupTarget::Expr(target) => self.rewrite(target, Some(&p), None, false, Clause::GroupBy)?.0,
            };
            group_by.push(expr);
        }

        self.state.opt_flags.eliminate_aggregation = true;
        let node = self.new_node(PlanKind::Aggregation { agg_funcs, group_by }, vec![p], Arc::new(Schema::new(columns)));
        Ok((node, mapper))
    }

    /// Projection of the select list over `p`. Also returns the alias of every
    /// output column.
    fn build_projection(
        &mut self,
        p: PlanNode,
        sel: &SelectStmt,
        from_schema: &Schema,
        agg_mapper: Option<&AggregateMapper>,
    ) -> PlanResult<(PlanNode, Vec<Option<Name>>)> {
        let mut exprs = Vec::new();
        let mut columns = Vec::new();
        let mut aliases = Vec::new();
        for field in &sel.fields {
            match field {
                SelectField::Wildcard { table } => {
                    let mut matched = false;
                    for col in from_schema.columns() {
                        if table.as_ref().is_some_and(|t| t.l != col.table.l) {
                            continue;
                        }
                        matched = true;
                        let name = ColumnName { schema: None, table: Some(col.table.clone()), name: col.name.clone() };
                        let resolved = lookup_in(&p.schema, &name, "field list")?;
                        exprs.push(Expression::Column(resolved.clone()));
                        columns.push(resolved);
                        aliases.push(None);
                    }
                    if let (false, Some(t)) = (matched, table) {
                        return Err(PlanError::UnknownTable { db: String::new(), table: t.o.clone() });
                    }
                }
                SelectField::Expr { expr, alias } => {
                    let (rewritten, _) = self.rewrite(expr, Some(&p), agg_mapper, false, Clause::FieldList)?;
                    let name = match (alias, expr) {
                        (Some(alias), _) => alias.o.clone(),
                        (None, ExprNode::Column(c)) => c.name.name.o.clone(),
                        (None, _) => expr.to_string(),
                    };
                    columns.push(output_column(&rewritten, &name));
                    exprs.push(rewritten);
                    aliases.push(alias.clone());
                }
            }
        }
        let node = self.new_node(PlanKind::Projection { exprs }, vec![p], Arc::new(Schema::new(columns)));
        Ok((node, aliases))
    }

    /// Resolves ORDER BY against the projection `proj`. Positions and aliases
    /// map to projected columns; anything else the projection cannot resolve is
    /// appended to it as an auxiliary column.
    fn resolve_order_by(
        &mut self,
        proj: &mut PlanNode,
        sel: &SelectStmt,
        aliases: &[Option<Name>],
        agg_mapper: Option<&AggregateMapper>,
    ) -> PlanResult<Vec<ByItem>> {
        let visible = proj.schema.len();
        let mut by_items = Vec::with_capacity(sel.order_by.len());
        for item in &sel.order_by {
            if let Some(pos) = ordinal(&item.expr) {
                let col = (pos as usize)
                    .checked_sub(1)
                    .filter(|i| *i < visible)
                    .and_then(|i| proj.schema.column(i))
                    .ok_or_else(|| PlanError::UnknownColumn { name: pos.to_string(), context: ORDER_CLAUSE.to_string() })?;
                by_items.push(ByItem { expr: Expression::Column(col.clone()), desc: item.desc });
                continue;
            }
            if let ExprNode::Column(c) = &item.expr {
                if c.name.table.is_none() {
                    let by_alias = aliases.iter().position(|a| a.as_ref().is_some_and(|a| a.l == c.name.name.l));
                    if let Some(i) = by_alias {
                        self.state.col_mapper.insert(node_key(&item.expr), i);
                    }
                }
            }
            let expr = match self.rewrite(&item.expr, Some(&*proj), None, false, Clause::OrderBy) {
                Ok((expr, _)) => expr,
                Err(PlanError::Expression {
                    source: RewriteError::UnknownColumn { .. } | RewriteError::InvalidGroupFuncUse,
                    ..
                }) => {
                    if sel.distinct {
                        return Err(PlanError::UnknownColumn {
                            name: item.expr.to_string(),
                            context: ORDER_CLAUSE.to_string(),
                        });
                    }
                    let (expr, _) = {
                        let input = proj.child(0)?;
                        self.rewrite(&item.expr, Some(input), agg_mapper, false, Clause::OrderBy)?
                    };
                    append_aux_column(proj, &item.expr, expr)?
                }
                Err(e) => return Err(e),
            };
            by_items.push(ByItem { expr, desc: item.desc });
        }
        Ok(by_items)
    }

    /// Aggregation grouping on every column of `p`.
    pub(crate) fn build_distinct(&mut self, p: PlanNode) -> PlanNode {
        let group_by = p.schema.columns().iter().cloned().map(Expression::Column).collect();
        let agg_funcs = p
            .schema
            .columns()
            .iter()
            .map(|c| Expression::Aggregate {
                name: "first_row".to_string(),
                args: vec![Expression::Column(c.clone())],
                distinct: false,
                ret_type: c.ret_type.clone(),
            })
            .collect();
        let schema = Arc::new(Schema::new(p.schema.columns().to_vec()));
        self.state.opt_flags.eliminate_aggregation = true;
        self.new_node(PlanKind::Aggregation { agg_funcs, group_by }, vec![p], schema)
    }

    /// Sort over `p` for UPDATE and DELETE.
    pub(crate) fn build_sort(&mut self, p: PlanNode, items: &[AstByItem]) -> PlanResult<PlanNode> {
        let mut by_items = Vec::with_capacity(items.len());
        for item in items {
            let (expr, _) = self.rewrite(&item.expr, Some(&p), None, false, Clause::OrderBy)?;
            by_items.push(ByItem { expr, desc: item.desc });
        }
        let schema = Arc::clone(&p.schema);
        Ok(self.new_node(PlanKind::Sort { by_items }, vec![p], schema))
    }

    pub(crate) fn build_limit(&mut self, p: PlanNode, limit: Limit) -> PlanNode {
        let schema = Arc::clone(&p.schema);
        self.new_node(PlanKind::Limit { offset: limit.offset, count: limit.count }, vec![p], schema)
    }

    /// Projection keeping the first `len` columns of `p`.
    fn trim_projection(&mut self, p: PlanNode, len: usize) -> PlanNode {
        let mut schema = Schema::new(p.schema.columns().to_vec());
        schema.truncate(len);
        let exprs = schema.columns().iter().cloned().map(Expression::Column).collect();
        self.new_node(PlanKind::Projection { exprs }, vec![p], Arc::new(schema))
    }
}

fn append_aux_column(proj: &mut PlanNode, node: &ExprNode, expr: Expression) -> PlanResult<Expression> {
    let col = output_column(&expr, &node.to_string());
    match &mut proj.kind {
        PlanKind::Projection { exprs } => exprs.push(expr),
        other => return Err(PlanError::Internal(format!("expected Projection, got {}", other.name()))),
    }
    let mut schema = Schema::new(proj.schema.columns().to_vec());
    schema.append(col);
    let appended = schema.column(schema.len() - 1).cloned();
    proj.schema = Arc::new(schema);
    appended
        .map(Expression::Column)
        .ok_or_else(|| PlanError::Internal("auxiliary column missing".to_string()))
}
