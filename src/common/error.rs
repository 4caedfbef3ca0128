use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

/// Clause of a statement an expression was rewritten for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    FieldList,
    Where,
    JoinOn,
    GroupBy,
    Having,
    OrderBy,
    Values,
    SetList,
    OnDuplicate,
    ShowFilter,
    ExecuteUsing,
    Do,
    SetVariable,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Clause::FieldList => "field list",
            Clause::Where => "where clause",
            Clause::JoinOn => "on clause",
            Clause::GroupBy => "group statement",
            Clause::Having => "having clause",
            Clause::OrderBy => "order clause",
            Clause::Values => "values list",
            Clause::SetList => "set list",
            Clause::OnDuplicate => "on duplicate key update",
            Clause::ShowFilter => "show filter",
            Clause::ExecuteUsing => "execute using",
            Clause::Do => "do statement",
            Clause::SetVariable => "set variable",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised by an expression rewriter.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Unknown column '{name}' in '{context}'")]
    UnknownColumn { name: String, context: String },

    #[error("Column '{name}' in {context} is ambiguous")]
    AmbiguousColumn { name: String, context: String },

    #[error("Invalid use of group function")]
    InvalidGroupFuncUse,

    #[error("Unsupported expression: {0}")]
    Unsupported(String),

    #[error("Subquery: {0}")]
    Subquery(Box<PlanError>),
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Unsupported type {0}")]
    UnsupportedStatement(String),

    #[error("Parser Error: {0}")]
    Parse(String),

    #[error("Table '{db}.{table}' doesn't exist")]
    UnknownTable { db: String, table: String },

    #[error("Unknown column '{name}' in '{context}'")]
    UnknownColumn { name: String, context: String },

    #[error("Column '{name}' in {context} is ambiguous")]
    AmbiguousColumn { name: String, context: String },

    #[error("Incorrect arguments to EXECUTE")]
    WrongArguments,

    #[error("{source} (in {clause})")]
    Expression {
        clause: Clause,
        #[source]
        source: RewriteError,
    },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("No database selected")]
    NoDatabaseSelected,

    #[error("Column count doesn't match value count at row {row}")]
    WrongValueCount { row: usize },

    #[error("Field '{column}' doesn't have a default value")]
    NoDefaultValue { column: String },

    #[error("The used SELECT statements have a different number of columns")]
    WrongNumberOfColumnsInSelect,

    #[error("Unknown prepared statement handler ({0}) given to EXECUTE")]
    UnknownPreparedStatement(String),

    #[error("System internal error: {0}")]
    Internal(String),
}

/// Planner-level error codes, independent of any wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnsupportedType,
    SystemInternal,
    UnknownTable,
    UnknownColumn,
    Ambiguous,
    WrongArguments,
    InvalidGroupFuncUse,
    NoDatabaseSelected,
    WrongValueCount,
    NoDefaultValue,
    WrongNumberOfColumns,
    UnknownStmtHandler,
}

/// MySQL `ER_UNKNOWN_ERROR`, used for codes without a dedicated mapping.
pub const MYSQL_UNKNOWN_ERROR: u16 = 1105;

static MYSQL_CODES: OnceLock<HashMap<ErrorCode, u16>> = OnceLock::new();

fn mysql_codes() -> &'static HashMap<ErrorCode, u16> {
    MYSQL_CODES.get_or_init(|| {
        HashMap::from([
            (ErrorCode::UnknownColumn, 1054),
            (ErrorCode::Ambiguous, 1052),
            (ErrorCode::WrongArguments, 1210),
            (ErrorCode::UnknownTable, 1146),
            (ErrorCode::NoDatabaseSelected, 1046),
            (ErrorCode::WrongValueCount, 1136),
            (ErrorCode::NoDefaultValue, 1364),
            (ErrorCode::InvalidGroupFuncUse, 1111),
            (ErrorCode::WrongNumberOfColumns, 1222),
            (ErrorCode::UnknownStmtHandler, 1243),
        ])
    })
}

impl RewriteError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RewriteError::UnknownColumn { .. } => ErrorCode::UnknownColumn,
            RewriteError::AmbiguousColumn { .. } => ErrorCode::Ambiguous,
            RewriteError::InvalidGroupFuncUse => ErrorCode::InvalidGroupFuncUse,
            RewriteError::Unsupported(_) => ErrorCode::UnsupportedType,
            RewriteError::Subquery(inner) => inner.code(),
        }
    }
}

impl From<PlanError> for RewriteError {
    fn from(err: PlanError) -> Self {
        RewriteError::Subquery(Box::new(err))
    }
}

impl PlanError {
    pub fn expression(clause: Clause, source: RewriteError) -> Self {
        PlanError::Expression { clause, source }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PlanError::UnsupportedStatement(_) => ErrorCode::UnsupportedType,
            PlanError::UnknownTable { .. } => ErrorCode::UnknownTable,
            PlanError::UnknownColumn { .. } => ErrorCode::UnknownColumn,
            PlanError::AmbiguousColumn { .. } => ErrorCode::Ambiguous,
            PlanError::WrongArguments => ErrorCode::WrongArguments,
            PlanError::Expression { source, .. } => source.code(),
            PlanError::Parse(_) => ErrorCode::UnsupportedType,
            PlanError::Catalog(_) | PlanError::Internal(_) => ErrorCode::SystemInternal,
            PlanError::NoDatabaseSelected => ErrorCode::NoDatabaseSelected,
            PlanError::WrongValueCount { .. } => ErrorCode::WrongValueCount,
            PlanError::NoDefaultValue { .. } => ErrorCode::NoDefaultValue,
            PlanError::WrongNumberOfColumnsInSelect => ErrorCode::WrongNumberOfColumns,
            PlanError::UnknownPreparedStatement(_) => ErrorCode::UnknownStmtHandler,
        }
    }

    /// Error code reported to MySQL protocol clients.
    pub fn mysql_code(&self) -> u16 {
        mysql_codes()
            .get(&self.code())
            .copied()
            .unwrap_or(MYSQL_UNKNOWN_ERROR)
    }
}
