/// Expression rewriting: AST expressions to typed logical expressions.
/// Columns resolve against the current plan first and then the enclosing
/// queries, innermost first.

use std::collections::HashMap;
use std::sync::Arc;

use sqlparser::ast::{BinaryOperator, UnaryOperator};

use crate::common::{FieldType, RewriteError, TypeCode};
use crate::sql::ast::{ColumnName, ExprNode, SelectStmt};
use crate::sql::ast_to_plan::PlanBuilder;
use crate::sql::expression::{Expression, SubqueryKind};
use crate::sql::plan::PlanNode;
use crate::sql::schema::{Schema, SchemaLookupError};
use crate::sql::utils::node_key;

/// Aggregate AST node (by `node_key`) to its column in the aggregation schema.
pub type AggregateMapper = HashMap<usize, usize>;

const FIELD_LIST: &str = "field list";

pub trait ExpressionRewriter: Send + Sync {
    /// Rewrites `expr` against the schema of `plan`. Returns the expression and
    /// whether it contains an aggregate.
    fn rewrite(
        &self,
        builder: &mut PlanBuilder<'_>,
        expr: &ExprNode,
        plan: Option<&PlanNode>,
        agg_mapper: Option<&AggregateMapper>,
        allow_aggregate: bool,
    ) -> Result<(Expression, bool), RewriteError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRewriter;

struct RewriteCtx<'p> {
    plan: Option<&'p PlanNode>,
    agg_mapper: Option<&'p AggregateMapper>,
    allow_aggregate: bool,
    has_agg: bool,
}

impl ExpressionRewriter for DefaultRewriter {
    fn rewrite(
        &self,
        builder: &mut PlanBuilder<'_>,
        expr: &ExprNode,
        plan: Option<&PlanNode>,
        agg_mapper: Option<&AggregateMapper>,
        allow_aggregate: bool,
    ) -> Result<(Expression, bool), RewriteError> {
        let mut ctx = RewriteCtx { plan, agg_mapper, allow_aggregate, has_agg: false };
        let expr = self.rewrite_node(builder, expr, &mut ctx)?;
        Ok((expr, ctx.has_agg))
    }
}

impl DefaultRewriter {
    fn rewrite_node(
        &self,
        b: &mut PlanBuilder<'_>,
        expr: &ExprNode,
        ctx: &mut RewriteCtx<'_>,
    ) -> Result<Expression, RewriteError> {
        match expr {
            ExprNode::Column(c) => resolve_column(b, expr, &c.name, ctx.plan),
            ExprNode::Literal(d) => Ok(Expression::constant(d.clone(), d.literal_type())),
            ExprNode::Paren(inner) => self.rewrite_node(b, inner, ctx),
            ExprNode::Binary { op, left, right } => {
                let args = vec![self.rewrite_node(b, left, ctx)?, self.rewrite_node(b, right, ctx)?];
                let ret_type = binary_ret_type(op, &args);
                Ok(Expression::ScalarFunction { name: binary_func_name(op), args, ret_type })
            }
            ExprNode::Unary { op, expr: inner } => {
                let arg = self.rewrite_node(b, inner, ctx)?;
                match op {
                    UnaryOperator::Plus => Ok(arg),
                    UnaryOperator::Minus => {
                        let ret_type = arg.ret_type();
                        Ok(Expression::ScalarFunction { name: "unaryminus".to_string(), args: vec![arg], ret_type })
                    }
                    UnaryOperator::Not => Ok(not(arg)),
                    other => Ok(Expression::ScalarFunction {
                        name: other.to_string().to_lowercase(),
                        ret_type: arg.ret_type(),
                        args: vec![arg],
                    }),
                }
            }
            ExprNode::FuncCall { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.rewrite_node(b, a, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret_type = func_ret_type(name, &args);
                Ok(Expression::ScalarFunction { name: name.clone(), args, ret_type })
            }
            ExprNode::Aggregate(agg) => {
                if let (Some(mapper), Some(plan)) = (ctx.agg_mapper, ctx.plan) {
                    if let Some(col) = mapper.get(&node_key(expr)).and_then(|i| plan.schema.column(*i)) {
                        ctx.has_agg = true;
                        return Ok(Expression::Column(col.clone()));
                    }
                }
                if !ctx.allow_aggregate {
                    return Err(RewriteError::InvalidGroupFuncUse);
                }
                ctx.has_agg = true;
                let mut arg_ctx = RewriteCtx { plan: ctx.plan, agg_mapper: None, allow_aggregate: false, has_agg: false };
                let args = agg
                    .args
                    .iter()
                    .map(|a| self.rewrite_node(b, a, &mut arg_ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret_type = aggregate_ret_type(&agg.name, &args);
                Ok(Expression::Aggregate { name: agg.name.clone(), args, distinct: agg.distinct, ret_type })
            }
            ExprNode::Variable(v) => Ok(Expression::Variable {
                name: v.name.clone(),
                is_global: v.is_global,
                is_system: v.is_system,
            }),
            ExprNode::ParamMarker(order) => Ok(Expression::ParamMarker(*order)),
            ExprNode::Default(_) => Err(RewriteError::Unsupported(expr.to_string())),
            ExprNode::Subquery(sel) => {
                let plan = build_subquery(b, sel, ctx.plan)?;
                let ret_type = plan
                    .schema
                    .column(0)
                    .map(|c| c.ret_type.clone())
                    .unwrap_or_else(|| FieldType::new(TypeCode::Null));
                Ok(Expression::Subquery { kind: SubqueryKind::Scalar, expr: None, plan: Box::new(plan), ret_type })
            }
            ExprNode::Exists { subquery, negated } => {
                let plan = build_subquery(b, subquery, ctx.plan)?;
                Ok(Expression::Subquery {
                    kind: SubqueryKind::Exists { negated: *negated },
                    expr: None,
                    plan: Box::new(plan),
                    ret_type: bool_type(),
                })
            }
            ExprNode::InSubquery { expr: lhs, subquery, negated } => {
                let lhs = self.rewrite_node(b, lhs, ctx)?;
                let plan = build_subquery(b, subquery, ctx.plan)?;
                Ok(Expression::Subquery {
                    kind: SubqueryKind::In { negated: *negated },
                    expr: Some(Box::new(lhs)),
                    plan: Box::new(plan),
                    ret_type: bool_type(),
                })
            }
            ExprNode::InList { expr: lhs, list, negated } => {
                let mut args = vec![self.rewrite_node(b, lhs, ctx)?];
                for item in list {
                    args.push(self.rewrite_node(b, item, ctx)?);
                }
                let f = Expression::ScalarFunction { name: "in".to_string(), args, ret_type: bool_type() };
                Ok(if *negated { not(f) } else { f })
            }
            ExprNode::IsNull { expr: inner, negated } => {
                let arg = self.rewrite_node(b, inner, ctx)?;
                let f = Expression::ScalarFunction { name: "isnull".to_string(), args: vec![arg], ret_type: bool_type() };
                Ok(if *negated { not(f) } else { f })
            }
            ExprNode::Like { expr: inner, pattern, negated } => {
                let args = vec![self.rewrite_node(b, inner, ctx)?, self.rewrite_node(b, pattern, ctx)?];
                let f = Expression::ScalarFunction { name: "like".to_string(), args, ret_type: bool_type() };
                Ok(if *negated { not(f) } else { f })
            }
            ExprNode::Between { expr: inner, low, high, negated } => {
                let target = self.rewrite_node(b, inner, ctx)?;
                let low = self.rewrite_node(b, low, ctx)?;
                let high = self.rewrite_node(b, high, ctx)?;
                // NOT BETWEEN is target < low OR target > high.
                let (lower, upper, join) = if *negated { ("lt", "gt", "or") } else { ("ge", "le", "and") };
                let left = compare(lower, target.clone(), low);
                let right = compare(upper, target, high);
                Ok(compare(join, left, right))
            }
        }
    }
}

fn build_subquery(
    b: &mut PlanBuilder<'_>,
    sel: &SelectStmt,
    plan: Option<&PlanNode>,
) -> Result<PlanNode, RewriteError> {
    let outer = plan.map(|p| p.schema.clone()).unwrap_or_else(|| Arc::new(Schema::empty()));
    Ok(b.build_subquery(sel, outer)?)
}

fn resolve_column(
    b: &PlanBuilder<'_>,
    node: &ExprNode,
    name: &ColumnName,
    plan: Option<&PlanNode>,
) -> Result<Expression, RewriteError> {
    let ambiguous = || RewriteError::AmbiguousColumn { name: name.to_string(), context: FIELD_LIST.to_string() };
    if let Some(plan) = plan {
        if let Some(col) = b.mapped_column(node_key(node)).and_then(|i| plan.schema.column(i)) {
            return Ok(Expression::Column(col.clone()));
        }
        match plan.schema.find_column(name) {
            Ok(Some(col)) => return Ok(Expression::Column(col.clone())),
            Ok(None) => {}
            Err(SchemaLookupError::Ambiguous) => return Err(ambiguous()),
        }
    }
    for outer in b.outer_schemas().iter().rev() {
        match outer.find_column(name) {
            Ok(Some(col)) => return Ok(Expression::CorrelatedColumn(col.clone())),
            Ok(None) => {}
            Err(SchemaLookupError::Ambiguous) => return Err(ambiguous()),
        }
    }
    Err(RewriteError::UnknownColumn { name: name.to_string(), context: FIELD_LIST.to_string() })
}

fn bool_type() -> FieldType {
    FieldType::new(TypeCode::LongLong).with_len(1)
}

fn not(arg: Expression) -> Expression {
    Expression::ScalarFunction { name: "not".to_string(), args: vec![arg], ret_type: bool_type() }
}

fn compare(name: &str, left: Expression, right: Expression) -> Expression {
    Expression::ScalarFunction { name: name.to_string(), args: vec![left, right], ret_type: bool_type() }
}

fn binary_func_name(op: &BinaryOperator) -> String {
    let name = match op {
        BinaryOperator::Plus => "plus",
        BinaryOperator::Minus => "minus",
        BinaryOperator::Multiply => "mul",
        BinaryOperator::Divide => "div",
        BinaryOperator::Modulo => "mod",
        BinaryOperator::Gt => "gt",
        BinaryOperator::Lt => "lt",
        BinaryOperator::GtEq => "ge",
        BinaryOperator::LtEq => "le",
        BinaryOperator::Eq => "eq",
        BinaryOperator::NotEq => "ne",
        BinaryOperator::And => "and",
        BinaryOperator::Or => "or",
        BinaryOperator::Xor => "xor",
        BinaryOperator::StringConcat => "concat",
        other => return other.to_string().to_lowercase(),
    };
    name.to_string()
}

fn is_real(tp: &FieldType) -> bool {
    matches!(tp.tp, TypeCode::Float | TypeCode::Double | TypeCode::NewDecimal)
}

fn binary_ret_type(op: &BinaryOperator, args: &[Expression]) -> FieldType {
    match op {
        BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Multiply | BinaryOperator::Modulo => {
            if args.iter().any(|a| is_real(&a.ret_type())) {
                FieldType::new(TypeCode::Double)
            } else {
                FieldType::new(TypeCode::LongLong)
            }
        }
        BinaryOperator::Divide => FieldType::new(TypeCode::NewDecimal),
        BinaryOperator::StringConcat => FieldType::new(TypeCode::VarString),
        _ => bool_type(),
    }
}

fn func_ret_type(name: &str, args: &[Expression]) -> FieldType {
    match name {
        "abs" | "ifnull" | "coalesce" | "greatest" | "least" => args
            .first()
            .map(|a| a.ret_type())
            .unwrap_or_else(|| FieldType::new(TypeCode::Null)),
        "length" | "char_length" | "instr" | "locate" | "sign" | "floor" | "ceil" => FieldType::new(TypeCode::LongLong),
        "now" | "current_timestamp" | "sysdate" => FieldType::new(TypeCode::Datetime),
        "curdate" | "current_date" => FieldType::new(TypeCode::Date),
        "rand" | "pi" | "sqrt" | "pow" | "power" => FieldType::new(TypeCode::Double),
        _ => FieldType::new(TypeCode::VarString),
    }
}

fn aggregate_ret_type(name: &str, args: &[Expression]) -> FieldType {
    let arg_type = args.first().map(|a| a.ret_type());
    match name {
        "count" => FieldType::new(TypeCode::LongLong).with_len(21),
        "sum" | "avg" => match arg_type {
            Some(tp) if tp.tp == TypeCode::Float || tp.tp == TypeCode::Double => FieldType::new(TypeCode::Double),
            _ => FieldType::new(TypeCode::NewDecimal),
        },
        "bit_and" | "bit_or" | "bit_xor" => FieldType::new(TypeCode::LongLong).with_unsigned(),
        "group_concat" => FieldType::new(TypeCode::VarString),
        _ => arg_type.unwrap_or_else(|| FieldType::new(TypeCode::Null)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Clause, PlanError};
    use crate::sql::ast::parse_expr;
    use crate::sql::plan::PlanKind;
    use crate::sql::session::SessionContext;
    use crate::testutil::test_catalog;

    fn scan_t(b: &mut PlanBuilder<'_>) -> PlanNode {
        b.build_select(&SelectStmt::star_from("t"))
            .unwrap()
            .children
            .remove(0)
    }

    #[test]
    fn test_rewrite_against_plan() {
        let catalog = test_catalog();
        let session = SessionContext::with_db("test");
        let mut b = PlanBuilder::new(&catalog, &session, &DefaultRewriter);
        let plan = scan_t(&mut b);
        assert!(matches!(plan.kind, PlanKind::DataSource { .. }));
        let expr = parse_expr("id > 1 AND name LIKE 'a%'").unwrap();
        let (e, has_agg) = b.rewrite(&expr, Some(&plan), None, false, Clause::Where).unwrap();
        assert!(!has_agg);
        assert_eq!(e.to_string(), "and(gt(t.id, 1), like(t.name, 'a%'))");
    }

    #[test]
    fn test_unknown_column_and_aggregate_rejection() {
        let catalog = test_catalog();
        let session = SessionContext::with_db("test");
        let mut b = PlanBuilder::new(&catalog, &session, &DefaultRewriter);
        let plan = scan_t(&mut b);

        let err = b.rewrite(&parse_expr("nope + 1").unwrap(), Some(&plan), None, false, Clause::Where).unwrap_err();
        match err {
            PlanError::Expression { clause: Clause::Where, source: RewriteError::UnknownColumn { name, context } } => {
                assert_eq!(name, "nope");
                assert_eq!(context, "field list");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = b.rewrite(&parse_expr("count(*)").unwrap(), Some(&plan), None, false, Clause::Where).unwrap_err();
        assert_eq!(err.mysql_code(), 1111);

        let (e, has_agg) = b.rewrite(&parse_expr("sum(id)").unwrap(), Some(&plan), None, true, Clause::FieldList).unwrap();
        assert!(has_agg);
        assert!(matches!(e, Expression::Aggregate { ref name, .. } if name == "sum"));
    }

    #[test]
    fn test_between_and_not_in() {
        let catalog = test_catalog();
        let session = SessionContext::with_db("test");
        let mut b = PlanBuilder::new(&catalog, &session, &DefaultRewriter);
        let plan = scan_t(&mut b);
        let (e, _) = b.rewrite(&parse_expr("id NOT BETWEEN 1 AND 5").unwrap(), Some(&plan), None, false, Clause::Where).unwrap();
        assert_eq!(e.to_string(), "or(lt(t.id, 1), gt(t.id, 5))");
        let (e, _) = b.rewrite(&parse_expr("id NOT IN (1, 2)").unwrap(), Some(&plan), None, false, Clause::Where).unwrap();
        assert_eq!(e.to_string(), "not(in(t.id, 1, 2))");
    }

    #[test]
    fn test_no_plan_has_no_columns() {
        let catalog = test_catalog();
        let session = SessionContext::with_db("test");
        let mut b = PlanBuilder::new(&catalog, &session, &DefaultRewriter);
        let (e, _) = b.rewrite(&parse_expr("1 + 2.5").unwrap(), None, None, false, Clause::Values).unwrap();
        assert_eq!(e.ret_type().tp, TypeCode::Double);
        assert!(b.rewrite(&parse_expr("id").unwrap(), None, None, false, Clause::Values).is_err());
    }
}
