/// Typed logical-plan expressions produced by the rewriter.

use std::fmt;

use serde::Serialize;

use crate::common::{Datum, FieldType, TypeCode};
use crate::sql::plan::PlanNode;
use crate::sql::schema::Column;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub value: Datum,
    pub ret_type: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubqueryKind {
    Scalar,
    Exists { negated: bool },
    In { negated: bool },
}

#[derive(Debug, Clone, Serialize)]
pub enum Expression {
    /// Column of the plan the expression is evaluated on.
    Column(Column),
    /// Column of an enclosing query, bound per outer row.
    CorrelatedColumn(Column),
    Constant(Constant),
    ScalarFunction {
        name: String,
        args: Vec<Expression>,
        ret_type: FieldType,
    },
    Aggregate {
        name: String,
        args: Vec<Expression>,
        distinct: bool,
        ret_type: FieldType,
    },
    Variable {
        name: String,
        is_global: bool,
        is_system: bool,
    },
    ParamMarker(usize),
    Subquery {
        kind: SubqueryKind,
        /// Left operand of `IN (subquery)`.
        expr: Option<Box<Expression>>,
        #[serde(skip)]
        plan: Box<PlanNode>,
        ret_type: FieldType,
    },
}

impl Expression {
    pub fn constant(value: Datum, ret_type: FieldType) -> Self {
        Expression::Constant(Constant { value, ret_type })
    }

    pub fn ret_type(&self) -> FieldType {
        match self {
            Expression::Column(c) | Expression::CorrelatedColumn(c) => c.ret_type.clone(),
            Expression::Constant(c) => c.ret_type.clone(),
            Expression::ScalarFunction { ret_type, .. }
            | Expression::Aggregate { ret_type, .. }
            | Expression::Subquery { ret_type, .. } => ret_type.clone(),
            Expression::Variable { .. } => FieldType::new(TypeCode::VarString),
            Expression::ParamMarker(_) => FieldType::new(TypeCode::Null),
        }
    }

    pub fn is_correlated(&self) -> bool {
        match self {
            Expression::CorrelatedColumn(_) => true,
            Expression::ScalarFunction { args, .. } | Expression::Aggregate { args, .. } => {
                args.iter().any(|a| a.is_correlated())
            }
            Expression::Subquery { expr, .. } => expr.as_ref().is_some_and(|e| e.is_correlated()),
            _ => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(c) => write!(f, "{}", c.qualified_name()),
            Expression::CorrelatedColumn(c) => write!(f, "outer({})", c.qualified_name()),
            Expression::Constant(c) => write!(f, "{}", c.value),
            Expression::ScalarFunction { name, args, .. } => write!(f, "{}({})", name, join(args)),
            Expression::Aggregate { name, args, distinct, .. } => {
                write!(f, "{}({}{})", name, if *distinct { "distinct " } else { "" }, join(args))
            }
            Expression::Variable { name, is_system: true, .. } => write!(f, "@@{}", name),
            Expression::Variable { name, .. } => write!(f, "@{}", name),
            Expression::ParamMarker(i) => write!(f, "?{}", i),
            Expression::Subquery { kind, plan, .. } => write!(f, "{:?}(subquery_{})", kind, plan.id),
        }
    }
}

fn join(exprs: &[Expression]) -> String {
    exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// `col = expr` of UPDATE, INSERT ... SET and ON DUPLICATE KEY UPDATE.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub column: Column,
    pub expr: Expression,
}

/// A `SET` item.
#[derive(Debug, Clone, Serialize)]
pub struct VarAssignment {
    pub name: String,
    pub expr: Option<Expression>,
    pub is_default: bool,
    pub is_global: bool,
    pub is_system: bool,
    pub extend_value: Option<Constant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_type() {
        let col = Column::new("test", "t", "a", FieldType::new(TypeCode::Long));
        let e = Expression::ScalarFunction {
            name: "gt".to_string(),
            args: vec![Expression::Column(col.clone()), Expression::constant(Datum::Int(1), FieldType::new(TypeCode::LongLong))],
            ret_type: FieldType::new(TypeCode::LongLong),
        };
        assert_eq!(e.to_string(), "gt(t.a, 1)");
        assert_eq!(e.ret_type().tp, TypeCode::LongLong);
        assert!(!e.is_correlated());
        assert!(Expression::CorrelatedColumn(col).is_correlated());
    }
}
