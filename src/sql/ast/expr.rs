/// Expression nodes of the statement AST.
/// Operators reuse the sqlparser vocabulary; `parse_expr` lowers sqlparser
/// expressions into these nodes.

use std::fmt;

use sqlparser::ast::{
    BinaryOperator,
    DuplicateTreatment,
    Expr,
    FunctionArg,
    FunctionArgExpr,
    FunctionArguments,
    UnaryOperator,
    Value,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use crate::common::{Datum, Name, PlanError, PlanResult};
use crate::sql::utils::is_aggregate_func;

use super::SelectStmt;

/// `[schema.][table.]name`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnName {
    pub schema: Option<Name>,
    pub table: Option<Name>,
    pub name: Name,
}

impl ColumnName {
    pub fn new(name: &str) -> Self {
        ColumnName { schema: None, table: None, name: Name::new(name) }
    }

    pub fn qualified(table: &str, name: &str) -> Self {
        ColumnName { schema: None, table: Some(Name::new(table)), name: Name::new(name) }
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        if let Some(table) = &self.table {
            write!(f, "{}.", table)?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnNameExpr {
    pub name: ColumnName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFuncExpr {
    /// Lower-cased function name.
    pub name: String,
    pub args: Vec<ExprNode>,
    pub distinct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpr {
    pub name: String,
    pub is_global: bool,
    pub is_system: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Column(ColumnNameExpr),
    Literal(Datum),
    Binary {
        op: BinaryOperator,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<ExprNode>,
    },
    Paren(Box<ExprNode>),
    FuncCall {
        name: String,
        args: Vec<ExprNode>,
    },
    Aggregate(AggregateFuncExpr),
    Variable(VariableExpr),
    /// `?` placeholder, numbered from 0 in source order.
    ParamMarker(usize),
    /// `DEFAULT` or `DEFAULT(col)`.
    Default(Option<ColumnName>),
    Subquery(Box<SelectStmt>),
    Exists {
        subquery: Box<SelectStmt>,
        negated: bool,
    },
    InSubquery {
        expr: Box<ExprNode>,
        subquery: Box<SelectStmt>,
        negated: bool,
    },
    InList {
        expr: Box<ExprNode>,
        list: Vec<ExprNode>,
        negated: bool,
    },
    IsNull {
        expr: Box<ExprNode>,
        negated: bool,
    },
    Like {
        expr: Box<ExprNode>,
        pattern: Box<ExprNode>,
        negated: bool,
    },
    Between {
        expr: Box<ExprNode>,
        low: Box<ExprNode>,
        high: Box<ExprNode>,
        negated: bool,
    },
}

impl ExprNode {
    pub fn col(name: &str) -> Self {
        ExprNode::Column(ColumnNameExpr { name: ColumnName::new(name) })
    }

    pub fn qualified_col(table: &str, name: &str) -> Self {
        ExprNode::Column(ColumnNameExpr { name: ColumnName::qualified(table, name) })
    }

    pub fn int(v: i64) -> Self {
        ExprNode::Literal(Datum::Int(v))
    }

    pub fn string(s: &str) -> Self {
        ExprNode::Literal(Datum::String(s.to_string()))
    }

    pub fn binary(op: BinaryOperator, left: ExprNode, right: ExprNode) -> Self {
        ExprNode::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn and(left: ExprNode, right: ExprNode) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    pub fn or(left: ExprNode, right: ExprNode) -> Self {
        Self::binary(BinaryOperator::Or, left, right)
    }

    pub fn paren(expr: ExprNode) -> Self {
        ExprNode::Paren(Box::new(expr))
    }

    pub fn user_var(name: &str) -> Self {
        ExprNode::Variable(VariableExpr { name: name.to_string(), is_global: false, is_system: false })
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Column(c) => write!(f, "{}", c.name),
            ExprNode::Literal(d) => write!(f, "{}", d),
            ExprNode::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            ExprNode::Unary { op, expr } => write!(f, "{} {}", op, expr),
            ExprNode::Paren(e) => write!(f, "({})", e),
            ExprNode::FuncCall { name, args } => write!(f, "{}({})", name, join(args)),
            ExprNode::Aggregate(agg) => {
                if agg.name == "count" && agg.args.is_empty() {
                    return write!(f, "count(*)");
                }
                let distinct = if agg.distinct { "distinct " } else { "" };
                write!(f, "{}({}{})", agg.name, distinct, join(&agg.args))
            }
            ExprNode::Variable(v) if v.is_system => {
                let scope = if v.is_global { "global." } else { "" };
                write!(f, "@@{}{}", scope, v.name)
            }
            ExprNode::Variable(v) => write!(f, "@{}", v.name),
            ExprNode::ParamMarker(_) => write!(f, "?"),
            ExprNode::Default(None) => write!(f, "DEFAULT"),
            ExprNode::Default(Some(c)) => write!(f, "DEFAULT({})", c),
            ExprNode::Subquery(_) => write!(f, "(subquery)"),
            ExprNode::Exists { negated, .. } => {
                write!(f, "{}EXISTS (subquery)", if *negated { "NOT " } else { "" })
            }
            ExprNode::InSubquery { expr, negated, .. } => {
                write!(f, "{} {}IN (subquery)", expr, if *negated { "NOT " } else { "" })
            }
            ExprNode::InList { expr, list, negated } => {
                write!(f, "{} {}IN ({})", expr, if *negated { "NOT " } else { "" }, join(list))
            }
            ExprNode::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            ExprNode::Like { expr, pattern, negated } => {
                write!(f, "{} {}LIKE {}", expr, if *negated { "NOT " } else { "" }, pattern)
            }
            ExprNode::Between { expr, low, high, negated } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
        }
    }
}

fn join(exprs: &[ExprNode]) -> String {
    exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Parses one MySQL expression into an `ExprNode`.
pub fn parse_expr(sql: &str) -> PlanResult<ExprNode> {
    let dialect = MySqlDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(sql)
        .map_err(|e| PlanError::Parse(format!("{e}")))?;
    let expr = parser
        .parse_expr()
        .map_err(|e| PlanError::Parse(format!("{e}")))?;
    let mut params = 0;
    lower_expr(&expr, &mut params)
}

fn lower_box(expr: &Expr, params: &mut usize) -> PlanResult<Box<ExprNode>> {
    Ok(Box::new(lower_expr(expr, params)?))
}

fn lower_expr(expr: &Expr, params: &mut usize) -> PlanResult<ExprNode> {
    match expr {
        Expr::Identifier(ident) => Ok(ExprNode::col(&ident.value)),
        Expr::CompoundIdentifier(idents) => {
            let parts: Vec<&str> = idents.iter().map(|i| i.value.as_str()).collect();
            let name = match parts.as_slice() {
                [table, col] => ColumnName::qualified(table, col),
                [schema, table, col] => ColumnName {
                    schema: Some(Name::new(schema)),
                    table: Some(Name::new(table)),
                    name: Name::new(col),
                },
                _ => return Err(PlanError::Parse(format!("Unsupported identifier: {}", expr))),
            };
            Ok(ExprNode::Column(ColumnNameExpr { name }))
        }
        Expr::Value(val) => match &val.value {
            Value::Number(n, _) => parse_number(n).map(ExprNode::Literal),
            Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => Ok(ExprNode::string(s)),
            Value::Boolean(b) => Ok(ExprNode::int(*b as i64)),
            Value::Null => Ok(ExprNode::Literal(Datum::Null)),
            Value::Placeholder(_) => {
                let order = *params;
                *params += 1;
                Ok(ExprNode::ParamMarker(order))
            }
            other => Err(PlanError::Parse(format!("Unsupported literal: {:?}", other))),
        },
        Expr::BinaryOp { left, op, right } => Ok(ExprNode::Binary {
            op: op.clone(),
            left: lower_box(left, params)?,
            right: lower_box(right, params)?,
        }),
        Expr::UnaryOp { op, expr: inner } => Ok(ExprNode::Unary {
            op: op.clone(),
            expr: lower_box(inner, params)?,
        }),
        Expr::Nested(inner) => Ok(ExprNode::Paren(lower_box(inner, params)?)),
        Expr::IsNull(inner) => Ok(ExprNode::IsNull { expr: lower_box(inner, params)?, negated: false }),
        Expr::IsNotNull(inner) => Ok(ExprNode::IsNull { expr: lower_box(inner, params)?, negated: true }),
        Expr::InList { expr: inner, list, negated } => Ok(ExprNode::InList {
            expr: lower_box(inner, params)?,
            list: list.iter().map(|e| lower_expr(e, params)).collect::<PlanResult<Vec<_>>>()?,
            negated: *negated,
        }),
        Expr::Between { expr: inner, negated, low, high } => Ok(ExprNode::Between {
            expr: lower_box(inner, params)?,
            low: lower_box(low, params)?,
            high: lower_box(high, params)?,
            negated: *negated,
        }),
        Expr::Like { negated, expr: inner, pattern, .. } => Ok(ExprNode::Like {
            expr: lower_box(inner, params)?,
            pattern: lower_box(pattern, params)?,
            negated: *negated,
        }),
        Expr::Function(func) => {
            let name = func.name.to_string().to_lowercase();
            let mut args = Vec::new();
            let mut star = false;
            let mut distinct = false;
            if let FunctionArguments::List(list) = &func.args {
                distinct = matches!(list.duplicate_treatment, Some(DuplicateTreatment::Distinct));
                for arg in &list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => args.push(lower_expr(e, params)?),
                        FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => star = true,
                        _ => {
                            return Err(PlanError::Parse(format!("Unsupported function argument in {}", expr)));
                        }
                    }
                }
            }
            if is_aggregate_func(&name) {
                if star && name != "count" {
                    return Err(PlanError::Parse(format!("Unsupported expression: {}", expr)));
                }
                return Ok(ExprNode::Aggregate(AggregateFuncExpr { name, args, distinct }));
            }
            Ok(ExprNode::FuncCall { name, args })
        }
        _ => Err(PlanError::Parse(format!("Unsupported expression: {}", expr))),
    }
}

fn parse_number(n: &str) -> PlanResult<Datum> {
    if let Ok(v) = n.parse::<i64>() {
        return Ok(Datum::Int(v));
    }
    if let Ok(v) = n.parse::<u64>() {
        return Ok(Datum::UInt(v));
    }
    n.parse::<f64>()
        .map(Datum::Float)
        .map_err(|_| PlanError::Parse(format!("Invalid number literal {}", n)))
}
