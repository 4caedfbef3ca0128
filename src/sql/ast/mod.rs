/// Typed statement AST consumed by the planner.
/// Nodes are immutable once built; the planner only borrows them.

pub mod expr;

use std::fmt;

pub use expr::{parse_expr, AggregateFuncExpr, ColumnName, ColumnNameExpr, ExprNode, VariableExpr};

use crate::common::{Datum, FieldType, Name};
use crate::sql::privilege::Privilege;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintType {
    Use,
    Ignore,
    Force,
}

/// What an index hint applies to. Only `Scan` hints restrict access paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintScope {
    Scan,
    Join,
    OrderBy,
    GroupBy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexHint {
    pub index_names: Vec<Name>,
    pub hint_type: IndexHintType,
    pub hint_scope: IndexHintScope,
}

impl IndexHint {
    pub fn new(hint_type: IndexHintType, names: &[&str]) -> Self {
        IndexHint {
            index_names: names.iter().map(|n| Name::new(n)).collect(),
            hint_type,
            hint_scope: IndexHintScope::Scan,
        }
    }

    pub fn with_scope(mut self, scope: IndexHintScope) -> Self {
        self.hint_scope = scope;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableName {
    pub schema: Option<Name>,
    pub name: Name,
    pub index_hints: Vec<IndexHint>,
}

impl TableName {
    pub fn new(name: &str) -> Self {
        TableName { schema: None, name: Name::new(name), index_hints: vec![] }
    }

    pub fn qualified(schema: &str, name: &str) -> Self {
        TableName { schema: Some(Name::new(schema)), name: Name::new(name), index_hints: vec![] }
    }

    pub fn with_hint(mut self, hint: IndexHint) -> Self {
        self.index_hints.push(hint);
        self
    }

    /// Lower-cased database of the table, falling back to `current_db`.
    pub fn db_or(&self, current_db: &str) -> String {
        match &self.schema {
            Some(schema) => schema.l.clone(),
            None => current_db.to_lowercase(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table {
        name: TableName,
        alias: Option<Name>,
    },
    Derived {
        query: Box<QueryExpr>,
        alias: Name,
    },
    Join {
        left: Box<TableSource>,
        right: Box<TableSource>,
        join_type: JoinType,
        on: Option<ExprNode>,
    },
}

impl TableSource {
    pub fn table(name: &str) -> Self {
        TableSource::Table { name: TableName::new(name), alias: None }
    }

    pub fn join(left: TableSource, right: TableSource, join_type: JoinType, on: Option<ExprNode>) -> Self {
        TableSource::Join { left: Box::new(left), right: Box::new(right), join_type, on }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectField {
    /// `*` or `tbl.*`
    Wildcard { table: Option<Name> },
    Expr { expr: ExprNode, alias: Option<Name> },
}

impl SelectField {
    pub fn expr(expr: ExprNode) -> Self {
        SelectField::Expr { expr, alias: None }
    }

    pub fn aliased(expr: ExprNode, alias: &str) -> Self {
        SelectField::Expr { expr, alias: Some(Name::new(alias)) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ByItem {
    pub expr: ExprNode,
    pub desc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectLockType {
    #[default]
    None,
    ForUpdate,
    InShareMode,
}

/// Optimizer hint written in a `/*+ ... */` comment, e.g. `TIDB_SMJ(t1, t2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptimizerHint {
    pub name: Name,
    pub tables: Vec<Name>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    pub distinct: bool,
    pub fields: Vec<SelectField>,
    pub from: Option<TableSource>,
    pub where_clause: Option<ExprNode>,
    pub group_by: Vec<ExprNode>,
    pub having: Option<ExprNode>,
    pub order_by: Vec<ByItem>,
    pub limit: Option<Limit>,
    pub lock: SelectLockType,
    pub table_hints: Vec<TableOptimizerHint>,
}

impl SelectStmt {
    /// `SELECT * FROM <table>`
    pub fn star_from(table: &str) -> Self {
        SelectStmt {
            fields: vec![SelectField::Wildcard { table: None }],
            from: Some(TableSource::table(table)),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionStmt {
    pub selects: Vec<SelectStmt>,
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Select(SelectStmt),
    Union(UnionStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnName,
    pub expr: ExprNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    NoPriority,
    LowPriority,
    HighPriority,
    DelayedPriority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: TableName,
    pub columns: Vec<ColumnName>,
    pub lists: Vec<Vec<ExprNode>>,
    pub setlist: Vec<Assignment>,
    pub on_duplicate: Vec<Assignment>,
    pub select: Option<Box<QueryExpr>>,
    pub is_replace: bool,
    pub ignore: bool,
    pub priority: Priority,
}

impl InsertStmt {
    pub fn new(table: TableName) -> Self {
        InsertStmt {
            table,
            columns: vec![],
            lists: vec![],
            setlist: vec![],
            on_duplicate: vec![],
            select: None,
            is_replace: false,
            ignore: false,
            priority: Priority::NoPriority,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table_refs: TableSource,
    pub list: Vec<Assignment>,
    pub where_clause: Option<ExprNode>,
    pub order_by: Vec<ByItem>,
    pub limit: Option<Limit>,
    pub ignore: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table_refs: TableSource,
    /// Target tables of a multi-table delete.
    pub tables: Vec<TableName>,
    pub where_clause: Option<ExprNode>,
    pub order_by: Vec<ByItem>,
    pub limit: Option<Limit>,
    pub is_multi_table: bool,
    pub ignore: bool,
    pub quick: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
    pub hostname: String,
}

impl UserIdentity {
    pub fn new(username: &str, hostname: &str) -> Self {
        UserIdentity { username: username.to_string(), hostname: hostname.to_string() }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.hostname)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSpec {
    pub user: UserIdentity,
    pub auth_string: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowType {
    Engines,
    Databases,
    Tables,
    TableStatus,
    Columns,
    Warnings,
    Charset,
    Variables,
    Status,
    Collation,
    CreateTable,
    CreateDatabase,
    Grants,
    Index,
    ProcessList,
    ProcedureStatus,
    Triggers,
    Events,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowStmt {
    pub tp: ShowType,
    pub db_name: String,
    pub table: Option<TableName>,
    pub column: Option<ColumnName>,
    pub full: bool,
    pub global: bool,
    pub user: Option<UserIdentity>,
    /// `LIKE 'pattern'`, matched against the first result column.
    pub pattern: Option<String>,
    pub where_clause: Option<ExprNode>,
}

impl ShowStmt {
    pub fn new(tp: ShowType) -> Self {
        ShowStmt {
            tp,
            db_name: String::new(),
            table: None,
            column: None,
            full: false,
            global: false,
            user: None,
            pattern: None,
            where_clause: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareStmt {
    pub name: String,
    pub sql_text: String,
    /// `PREPARE s FROM @var`
    pub sql_var: Option<VariableExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteStmt {
    pub name: String,
    pub using_vars: Vec<ExprNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableAssignment {
    pub name: String,
    pub value: ExprNode,
    pub is_global: bool,
    pub is_system: bool,
    /// Collation of `SET NAMES 'cs' COLLATE 'coll'`.
    pub extend_value: Option<Datum>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldsClause {
    pub terminated: String,
    pub enclosed: Option<char>,
    pub escaped: char,
}

impl Default for FieldsClause {
    fn default() -> Self {
        FieldsClause { terminated: "\t".to_string(), enclosed: None, escaped: '\\' }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinesClause {
    pub starting: String,
    pub terminated: String,
}

impl Default for LinesClause {
    fn default() -> Self {
        LinesClause { starting: String::new(), terminated: "\n".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadDataStmt {
    pub is_local: bool,
    pub path: String,
    pub table: TableName,
    pub columns: Vec<ColumnName>,
    pub fields_info: FieldsClause,
    pub lines_info: LinesClause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminType {
    CheckTable,
    ShowDdl,
    ShowDdlJobs,
    CancelDdlJobs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminStmt {
    pub tp: AdminType,
    pub tables: Vec<TableName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantLevelType {
    Global,
    Db,
    Table,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantLevel {
    pub level: GrantLevelType,
    pub db_name: String,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivElem {
    pub privilege: Privilege,
    pub cols: Vec<ColumnName>,
}

impl PrivElem {
    pub fn new(privilege: Privilege) -> Self {
        PrivElem { privilege, cols: vec![] }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantStmt {
    pub privs: Vec<PrivElem>,
    pub level: GrantLevel,
    pub users: Vec<UserSpec>,
    pub with_grant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevokeStmt {
    pub privs: Vec<PrivElem>,
    pub level: GrantLevel,
    pub users: Vec<UserSpec>,
}

/// Statements the planner passes through as a `Simple` plan.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleStmt {
    Use { db: String },
    Begin,
    Commit,
    Rollback,
    Flush,
    Binlog(String),
    Kill { connection_id: u64, query: bool },
    CreateUser { if_not_exists: bool, specs: Vec<UserSpec> },
    AlterUser { if_exists: bool, specs: Vec<UserSpec> },
    DropUser { if_exists: bool, users: Vec<UserIdentity> },
    SetPassword { user: Option<UserIdentity>, password: String },
    Grant(GrantStmt),
    Revoke(RevokeStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: Name,
    pub tp: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableSpec {
    AddColumn(ColumnDef),
    DropColumn(Name),
    AddIndex { name: Name, columns: Vec<Name>, unique: bool },
    DropIndex(Name),
    Rename(TableName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table: TableName,
    pub if_not_exists: bool,
    pub cols: Vec<ColumnDef>,
    /// `CREATE TABLE t LIKE src`
    pub refer_table: Option<TableName>,
    /// `CREATE TABLE t AS SELECT ...`
    pub select: Option<Box<QueryExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DdlStmt {
    CreateDatabase { name: String, if_not_exists: bool },
    DropDatabase { name: String, if_exists: bool },
    CreateTable(CreateTableStmt),
    DropTable { tables: Vec<TableName>, if_exists: bool },
    AlterTable { table: TableName, specs: Vec<AlterTableSpec> },
    CreateIndex { index_name: Name, table: TableName, columns: Vec<Name>, unique: bool },
    DropIndex { index_name: Name, table: TableName, if_exists: bool },
    TruncateTable { table: TableName },
    RenameTable { old_table: TableName, new_table: TableName },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Union(UnionStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Show(ShowStmt),
    Explain(Box<Statement>),
    Prepare(PrepareStmt),
    Execute(ExecuteStmt),
    Deallocate { name: String },
    Do(Vec<ExprNode>),
    Set(Vec<VariableAssignment>),
    Analyze(Vec<TableName>),
    LoadData(LoadDataStmt),
    Admin(AdminStmt),
    Simple(SimpleStmt),
    Ddl(DdlStmt),
}

impl Statement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SelectStmt",
            Statement::Union(_) => "UnionStmt",
            Statement::Insert(_) => "InsertStmt",
            Statement::Update(_) => "UpdateStmt",
            Statement::Delete(_) => "DeleteStmt",
            Statement::Show(_) => "ShowStmt",
            Statement::Explain(_) => "ExplainStmt",
            Statement::Prepare(_) => "PrepareStmt",
            Statement::Execute(_) => "ExecuteStmt",
            Statement::Deallocate { .. } => "DeallocateStmt",
            Statement::Do(_) => "DoStmt",
            Statement::Set(_) => "SetStmt",
            Statement::Analyze(_) => "AnalyzeTableStmt",
            Statement::LoadData(_) => "LoadDataStmt",
            Statement::Admin(_) => "AdminStmt",
            Statement::Simple(_) => "SimpleStmt",
            Statement::Ddl(_) => "DDLStmt",
        }
    }
}
