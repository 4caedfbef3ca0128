/// Utility functions for working with statement AST nodes.
/// This module provides helpers to decompose predicates and find aggregates and table references.

use sqlparser::ast::BinaryOperator;

use crate::sql::ast::{ExprNode, QueryExpr, SelectField, SelectStmt, TableName, TableSource};

pub fn is_aggregate_func(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "count" | "sum" | "avg" | "min" | "max" | "group_concat" | "bit_and" | "bit_or" | "bit_xor" | "first_row"
    )
}

/// Splits a WHERE expression into its top-level AND conditions, left to right.
pub fn split_where(where_clause: Option<&ExprNode>) -> Vec<&ExprNode> {
    let mut conditions = Vec::new();
    if let Some(expr) = where_clause {
        split_into(expr, &mut conditions);
    }
    conditions
}

fn split_into<'a>(expr: &'a ExprNode, conditions: &mut Vec<&'a ExprNode>) {
    match expr {
        ExprNode::Binary { op: BinaryOperator::And, left, right } => {
            split_into(left, conditions);
            split_into(right, conditions);
        }
        ExprNode::Paren(inner) => split_into(inner, conditions),
        _ => conditions.push(expr),
    }
}

/// Identity of an AST node for the duration of one translation.
pub fn node_key(expr: &ExprNode) -> usize {
    expr as *const ExprNode as usize
}

/// Aggregate calls of `expr` in pre-order. Subqueries are not entered, their
/// aggregates belong to the inner query.
pub fn collect_aggregates<'a>(expr: &'a ExprNode, out: &mut Vec<&'a ExprNode>) {
    match expr {
        ExprNode::Aggregate(_) => out.push(expr),
        ExprNode::Binary { left, right, .. } => {
            collect_aggregates(left, out);
            collect_aggregates(right, out);
        }
        ExprNode::Unary { expr, .. } | ExprNode::Paren(expr) | ExprNode::IsNull { expr, .. } => {
            collect_aggregates(expr, out)
        }
        ExprNode::FuncCall { args, .. } => args.iter().for_each(|a| collect_aggregates(a, out)),
        ExprNode::InList { expr, list, .. } => {
            collect_aggregates(expr, out);
            list.iter().for_each(|e| collect_aggregates(e, out));
        }
        ExprNode::InSubquery { expr, .. } => collect_aggregates(expr, out),
        ExprNode::Like { expr, pattern, .. } => {
            collect_aggregates(expr, out);
            collect_aggregates(pattern, out);
        }
        ExprNode::Between { expr, low, high, .. } => {
            collect_aggregates(expr, out);
            collect_aggregates(low, out);
            collect_aggregates(high, out);
        }
        ExprNode::Column(_)
        | ExprNode::Literal(_)
        | ExprNode::Variable(_)
        | ExprNode::ParamMarker(_)
        | ExprNode::Default(_)
        | ExprNode::Subquery(_)
        | ExprNode::Exists { .. } => {}
    }
}

/// Column references of `expr` outside aggregate calls and subqueries.
pub fn collect_columns<'a>(expr: &'a ExprNode, out: &mut Vec<&'a ExprNode>) {
    match expr {
        ExprNode::Column(_) => out.push(expr),
        ExprNode::Binary { left, right, .. } => {
            collect_columns(left, out);
            collect_columns(right, out);
        }
        ExprNode::Unary { expr, .. } | ExprNode::Paren(expr) | ExprNode::IsNull { expr, .. } => {
            collect_columns(expr, out)
        }
        ExprNode::FuncCall { args, .. } => args.iter().for_each(|a| collect_columns(a, out)),
        ExprNode::InList { expr, list, .. } => {
            collect_columns(expr, out);
            list.iter().for_each(|e| collect_columns(e, out));
        }
        ExprNode::InSubquery { expr, .. } => collect_columns(expr, out),
        ExprNode::Like { expr, pattern, .. } => {
            collect_columns(expr, out);
            collect_columns(pattern, out);
        }
        ExprNode::Between { expr, low, high, .. } => {
            collect_columns(expr, out);
            collect_columns(low, out);
            collect_columns(high, out);
        }
        ExprNode::Aggregate(_)
        | ExprNode::Literal(_)
        | ExprNode::Variable(_)
        | ExprNode::ParamMarker(_)
        | ExprNode::Default(_)
        | ExprNode::Subquery(_)
        | ExprNode::Exists { .. } => {}
    }
}

pub fn has_aggregate(expr: &ExprNode) -> bool {
    let mut aggs = Vec::new();
    collect_aggregates(expr, &mut aggs);
    !aggs.is_empty()
}

/// A SELECT aggregates when it has GROUP BY or an aggregate call in its
/// fields, HAVING or ORDER BY.
pub fn detect_select_agg(sel: &SelectStmt) -> bool {
    if !sel.group_by.is_empty() {
        return true;
    }
    let in_fields = sel.fields.iter().any(|f| match f {
        SelectField::Expr { expr, .. } => has_aggregate(expr),
        SelectField::Wildcard { .. } => false,
    });
    in_fields
        || sel.having.as_ref().is_some_and(has_aggregate)
        || sel.order_by.iter().any(|item| has_aggregate(&item.expr))
}

/// Base tables read by a query, in FROM order.
pub fn collect_table_names(query: &QueryExpr) -> Vec<&TableName> {
    let mut out = Vec::new();
    match query {
        QueryExpr::Select(sel) => collect_select_tables(sel, &mut out),
        QueryExpr::Union(union) => union.selects.iter().for_each(|s| collect_select_tables(s, &mut out)),
    }
    out
}

fn collect_select_tables<'a>(sel: &'a SelectStmt, out: &mut Vec<&'a TableName>) {
    if let Some(from) = &sel.from {
        collect_source_tables(from, out);
    }
}

fn collect_source_tables<'a>(source: &'a TableSource, out: &mut Vec<&'a TableName>) {
    match source {
        TableSource::Table { name, .. } => out.push(name),
        TableSource::Derived { query, .. } => out.extend(collect_table_names(query)),
        TableSource::Join { left, right, .. } => {
            collect_source_tables(left, out);
            collect_source_tables(right, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::{parse_expr, JoinType};

    fn texts(exprs: &[&ExprNode]) -> Vec<String> {
        exprs.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_split_nested_and() {
        let e = parse_expr("a = 1 AND (b = 2 AND c = 3)").unwrap();
        assert_eq!(texts(&split_where(Some(&e))), vec!["a = 1", "b = 2", "c = 3"]);
    }

    #[test]
    fn test_split_keeps_or_whole() {
        let e = parse_expr("(a = 1 OR b = 2)").unwrap();
        assert_eq!(texts(&split_where(Some(&e))), vec!["a = 1 OR b = 2"]);
    }

    #[test]
    fn test_split_none() {
        assert!(split_where(None).is_empty());
    }

    #[test]
    fn test_split_shape_independent() {
        let left = ExprNode::and(ExprNode::and(ExprNode::col("a"), ExprNode::col("b")), ExprNode::col("c"));
        let right = ExprNode::and(ExprNode::col("a"), ExprNode::and(ExprNode::col("b"), ExprNode::col("c")));
        let nested = ExprNode::paren(ExprNode::and(ExprNode::paren(ExprNode::col("a")), ExprNode::paren(right.clone())));
        let expected = vec!["a", "b", "c"];
        assert_eq!(texts(&split_where(Some(&left))), expected);
        assert_eq!(texts(&split_where(Some(&right))), expected);
        assert_eq!(texts(&split_where(Some(&nested))), vec!["a", "a", "b", "c"]);
    }

    #[test]
    fn test_split_leaf_identity() {
        let e = parse_expr("a > 1 AND f(b)").unwrap();
        let parts = split_where(Some(&e));
        match &e {
            ExprNode::Binary { left, .. } => assert_eq!(node_key(parts[0]), node_key(left)),
            other => panic!("unexpected expr {:?}", other),
        }
    }

    #[test]
    fn test_detect_select_agg() {
        let mut sel = SelectStmt::star_from("t");
        assert!(!detect_select_agg(&sel));
        sel.having = Some(parse_expr("count(*) > 1").unwrap());
        assert!(detect_select_agg(&sel));
        let mut sel = SelectStmt::star_from("t");
        sel.group_by = vec![ExprNode::col("a")];
        assert!(detect_select_agg(&sel));
    }

    #[test]
    fn test_collect_columns_skips_aggregates() {
        let e = parse_expr("c > 1 AND sum(amount) > x + 2").unwrap();
        let mut cols = Vec::new();
        collect_columns(&e, &mut cols);
        assert_eq!(texts(&cols), vec!["c", "x"]);
    }

    #[test]
    fn test_collect_table_names() {
        let mut sel = SelectStmt::star_from("a");
        sel.from = Some(TableSource::join(TableSource::table("a"), TableSource::table("b"), JoinType::Inner, None));
        let query = QueryExpr::Select(sel);
        let names: Vec<String> = collect_table_names(&query).iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
