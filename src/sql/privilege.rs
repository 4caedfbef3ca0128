/// Privilege collection.
/// Every statement kind that needs authorization appends `VisitInfo` records;
/// checking them against grant tables happens later, outside the planner.

use std::fmt;

use serde::Serialize;

use crate::sql::ast::{DdlStmt, GrantLevelType, GrantStmt, QueryExpr, SimpleStmt};
use crate::sql::utils::collect_table_names;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Privilege {
    Create,
    Select,
    Insert,
    Update,
    Delete,
    ShowDb,
    Super,
    CreateUser,
    Trigger,
    Drop,
    Process,
    Grant,
    References,
    Alter,
    Execute,
    Index,
    /// `ALL [PRIVILEGES]` in a GRANT; always expanded, never recorded.
    All,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Privilege::Create => "Create",
            Privilege::Select => "Select",
            Privilege::Insert => "Insert",
            Privilege::Update => "Update",
            Privilege::Delete => "Delete",
            Privilege::ShowDb => "Show Databases",
            Privilege::Super => "Super",
            Privilege::CreateUser => "Create User",
            Privilege::Trigger => "Trigger",
            Privilege::Drop => "Drop",
            Privilege::Process => "Process",
            Privilege::Grant => "Grant Option",
            Privilege::References => "References",
            Privilege::Alter => "Alter",
            Privilege::Execute => "Execute",
            Privilege::Index => "Index",
            Privilege::All => "All Privileges",
        };
        write!(f, "{}", s)
    }
}

pub const ALL_GLOBAL_PRIVS: &[Privilege] = &[
    Privilege::Select,
    Privilege::Insert,
    Privilege::Update,
    Privilege::Delete,
    Privilege::Create,
    Privilege::Drop,
    Privilege::Process,
    Privilege::Grant,
    Privilege::References,
    Privilege::Alter,
    Privilege::ShowDb,
    Privilege::Super,
    Privilege::Execute,
    Privilege::Index,
    Privilege::CreateUser,
    Privilege::Trigger,
];

pub const ALL_DB_PRIVS: &[Privilege] = &[
    Privilege::Select,
    Privilege::Insert,
    Privilege::Update,
    Privilege::Delete,
    Privilege::Create,
    Privilege::Drop,
    Privilege::Grant,
    Privilege::Alter,
    Privilege::Execute,
    Privilege::Index,
];

pub const ALL_TABLE_PRIVS: &[Privilege] = &[
    Privilege::Select,
    Privilege::Insert,
    Privilege::Update,
    Privilege::Delete,
    Privilege::Create,
    Privilege::Drop,
    Privilege::Grant,
    Privilege::Alter,
    Privilege::Index,
];

/// One privilege the statement needs. Empty strings mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitInfo {
    pub privilege: Privilege,
    pub db: String,
    pub table: String,
    pub column: String,
}

pub fn append_visit_info(vi: &mut Vec<VisitInfo>, privilege: Privilege, db: &str, table: &str, column: &str) {
    vi.push(VisitInfo {
        privilege,
        db: db.to_lowercase(),
        table: table.to_lowercase(),
        column: column.to_lowercase(),
    });
}

/// GRANT needs the grant option on the level plus every privilege granted.
pub fn collect_grant(vi: &mut Vec<VisitInfo>, stmt: &GrantStmt, current_db: &str) {
    let db = match stmt.level.level {
        GrantLevelType::Global => String::new(),
        _ if stmt.level.db_name.is_empty() => current_db.to_string(),
        _ => stmt.level.db_name.clone(),
    };
    let table = stmt.level.table_name.as_str();
    append_visit_info(vi, Privilege::Grant, &db, table, "");

    let mut all_privs: Option<&[Privilege]> = None;
    for item in &stmt.privs {
        if item.privilege == Privilege::All {
            all_privs = Some(match stmt.level.level {
                GrantLevelType::Global => ALL_GLOBAL_PRIVS,
                GrantLevelType::Db => ALL_DB_PRIVS,
                GrantLevelType::Table => ALL_TABLE_PRIVS,
            });
            break;
        }
        append_visit_info(vi, item.privilege, &db, table, "");
    }

    if let Some(privs) = all_privs {
        for privilege in privs {
            append_visit_info(vi, *privilege, &db, table, "");
        }
    }
}

/// Account management and REVOKE record `CreateUser` server-wide.
/// TODO: replace with a SUPER privilege check for SET PASSWORD and REVOKE.
pub fn collect_simple(vi: &mut Vec<VisitInfo>, stmt: &SimpleStmt, current_db: &str) {
    match stmt {
        SimpleStmt::CreateUser { .. } | SimpleStmt::AlterUser { .. } | SimpleStmt::DropUser { .. } => {
            append_visit_info(vi, Privilege::CreateUser, "", "", "");
        }
        SimpleStmt::Grant(grant) => collect_grant(vi, grant, current_db),
        SimpleStmt::SetPassword { .. } | SimpleStmt::Revoke(_) => {
            append_visit_info(vi, Privilege::CreateUser, "", "", "");
        }
        SimpleStmt::Use { .. }
        | SimpleStmt::Begin
        | SimpleStmt::Commit
        | SimpleStmt::Rollback
        | SimpleStmt::Flush
        | SimpleStmt::Binlog(_)
        | SimpleStmt::Kill { .. } => {}
    }
}

pub fn collect_ddl(vi: &mut Vec<VisitInfo>, stmt: &DdlStmt, current_db: &str) {
    match stmt {
        DdlStmt::AlterTable { table, .. } => {
            append_visit_info(vi, Privilege::Alter, &table.db_or(current_db), &table.name.l, "");
        }
        DdlStmt::CreateDatabase { name, .. } => {
            append_visit_info(vi, Privilege::Create, name, "", "");
        }
        DdlStmt::CreateIndex { table, .. } | DdlStmt::DropIndex { table, .. } => {
            append_visit_info(vi, Privilege::Index, &table.db_or(current_db), &table.name.l, "");
        }
        DdlStmt::CreateTable(create) => {
            let table = &create.table;
            append_visit_info(vi, Privilege::Create, &table.db_or(current_db), &table.name.l, "");
            if let Some(refer) = &create.refer_table {
                append_visit_info(vi, Privilege::Select, &refer.db_or(current_db), &refer.name.l, "");
            }
            if let Some(select) = &create.select {
                collect_query_sources(vi, select, current_db);
            }
        }
        DdlStmt::DropDatabase { name, .. } => {
            append_visit_info(vi, Privilege::Drop, name, "", "");
        }
        DdlStmt::DropTable { tables, .. } => {
            for table in tables {
                append_visit_info(vi, Privilege::Drop, &table.db_or(current_db), &table.name.l, "");
            }
        }
        DdlStmt::TruncateTable { table } => {
            append_visit_info(vi, Privilege::Delete, &table.db_or(current_db), &table.name.l, "");
        }
        DdlStmt::RenameTable { old_table, new_table } => {
            append_visit_info(vi, Privilege::Alter, &old_table.db_or(current_db), &old_table.name.l, "");
            append_visit_info(vi, Privilege::Alter, &new_table.db_or(current_db), &new_table.name.l, "");
        }
    }
}

fn collect_query_sources(vi: &mut Vec<VisitInfo>, query: &QueryExpr, current_db: &str) {
    for table in collect_table_names(query) {
        append_visit_info(vi, Privilege::Select, &table.db_or(current_db), &table.name.l, "");
    }
}
