//! Result shapes of introspection statements (SHOW, ADMIN SHOW DDL, EXPLAIN).
//! These are data tables; `compose_show_schema` and `build_column` turn them
//! into schemas.

use crate::common::field_type::{default_charset_for_type, default_field_length};
use crate::common::{FieldType, TypeCode};
use crate::config::{INFORMATION_SCHEMA_NAME, SHOW_DATETIME_WIDTH, SHOW_VARCHAR_WIDTH};
use crate::sql::ast::{ShowStmt, ShowType};
use crate::sql::schema::{Column, Schema};
use crate::sql::session::SessionContext;

use TypeCode::{Datetime, Long, LongLong, Varchar};

/// A column of an information-schema style result. Text columns take the
/// session charset.
pub fn build_column(session: &SessionContext, table: &str, name: &str, tp: TypeCode, size: usize) -> Column {
    let (mut charset, mut collate): (&str, &str) = default_charset_for_type(tp);
    let mut unsigned = true;
    if tp == TypeCode::Varchar || tp == TypeCode::Blob {
        charset = session.charset.as_str();
        collate = session.collation.as_str();
        unsigned = false;
    }
    let mut ret_type = FieldType::new(tp).with_len(size).with_charset(charset, collate);
    ret_type.unsigned = unsigned;
    Column::new(INFORMATION_SCHEMA_NAME, table, name, ret_type)
}

/// Schema of plain named columns. Missing types default to varchar, and
/// string columns carry the session charset.
pub fn compose_show_schema(session: &SessionContext, names: &[String], ftypes: &[TypeCode]) -> Schema {
    let columns = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let tp = ftypes.get(i).copied().unwrap_or(Varchar);
            let flen = match tp {
                Varchar | TypeCode::String => Some(SHOW_VARCHAR_WIDTH),
                Datetime => Some(SHOW_DATETIME_WIDTH),
                _ => default_field_length(tp),
            };
            let mut ret_type = FieldType::new(tp);
            if matches!(tp, Varchar | TypeCode::String) {
                ret_type = ret_type.with_charset(&session.charset, &session.collation);
            }
            ret_type.flen = flen;
            Column::new("", "", name, ret_type)
        })
        .collect();
    Schema::new(columns)
}

/// Column descriptions of SHOW COLUMNS.
pub fn col_desc_field_names(full: bool) -> Vec<&'static str> {
    if full {
        vec!["Field", "Type", "Collation", "Null", "Key", "Default", "Extra", "Privileges", "Comment"]
    } else {
        vec!["Field", "Type", "Null", "Key", "Default", "Extra"]
    }
}

pub fn build_show_schema(show: &ShowStmt, session: &SessionContext) -> Schema {
    match show.tp {
        ShowType::ProcedureStatus => return show_procedure_schema(session),
        ShowType::Triggers => return show_trigger_schema(session),
        ShowType::Events => return show_events_schema(session),
        ShowType::Warnings => return show_warnings_schema(session),
        _ => {}
    }

    let (names, ftypes): (Vec<String>, Vec<TypeCode>) = match show.tp {
        ShowType::Engines => (strings(&["Engine", "Support", "Comment", "Transactions", "XA", "Savepoints"]), vec![]),
        ShowType::Databases => (strings(&["Database"]), vec![]),
        ShowType::Tables => {
            let mut names = vec![format!("Tables_in_{}", show.db_name)];
            if show.full {
                names.push("Table_type".to_string());
            }
            (names, vec![])
        }
        ShowType::TableStatus => (
            strings(&[
                "Name", "Engine", "Version", "Row_format", "Rows", "Avg_row_length", "Data_length",
                "Max_data_length", "Index_length", "Data_free", "Auto_increment", "Create_time",
                "Update_time", "Check_time", "Collation", "Checksum", "Create_options", "Comment",
            ]),
            vec![
                Varchar, Varchar, LongLong, Varchar, LongLong, LongLong, LongLong, LongLong, LongLong,
                LongLong, LongLong, Datetime, Datetime, Datetime, Varchar, Varchar, Varchar, Varchar,
            ],
        ),
        ShowType::Columns => (strings(&col_desc_field_names(show.full)), vec![]),
        ShowType::Charset => (
            strings(&["Charset", "Description", "Default collation", "Maxlen"]),
            vec![Varchar, Varchar, Varchar, LongLong],
        ),
        ShowType::Variables | ShowType::Status => (strings(&["Variable_name", "Value"]), vec![]),
        ShowType::Collation => (
            strings(&["Collation", "Charset", "Id", "Default", "Compiled", "Sortlen"]),
            vec![Varchar, Varchar, LongLong, Varchar, Varchar, LongLong],
        ),
        ShowType::CreateTable => (strings(&["Table", "Create Table"]), vec![]),
        ShowType::CreateDatabase => (strings(&["Database", "Create Database"]), vec![]),
        ShowType::Grants => {
            let user = show.user.as_ref().map(|u| u.to_string()).unwrap_or_default();
            (vec![format!("Grants for {}", user)], vec![])
        }
        ShowType::Index => (
            strings(&[
                "Table", "Non_unique", "Key_name", "Seq_in_index", "Column_name", "Collation",
                "Cardinality", "Sub_part", "Packed", "Null", "Index_type", "Comment", "Index_comment",
            ]),
            vec![
                Varchar, LongLong, Varchar, LongLong, Varchar, Varchar, LongLong, LongLong, Varchar,
                Varchar, Varchar, Varchar, Varchar,
            ],
        ),
        ShowType::ProcessList => (
            strings(&["Id", "User", "Host", "db", "Command", "Time", "State", "Info"]),
            vec![LongLong, Varchar, Varchar, Varchar, Varchar, Long, Varchar, TypeCode::String],
        ),
        ShowType::ProcedureStatus | ShowType::Triggers | ShowType::Events | ShowType::Warnings => (vec![], vec![]),
    };
    compose_show_schema(session, &names, &ftypes)
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn show_procedure_schema(session: &SessionContext) -> Schema {
    let tbl = "ROUTINES";
    Schema::new(vec![
        build_column(session, tbl, "Db", Varchar, 128),
        build_column(session, tbl, "Name", Varchar, 128),
        build_column(session, tbl, "Type", Varchar, 128),
        build_column(session, tbl, "Definer", Varchar, 128),
        build_column(session, tbl, "Modified", Datetime, 19),
        build_column(session, tbl, "Created", Datetime, 19),
        build_column(session, tbl, "Security_type", Varchar, 128),
        build_column(session, tbl, "Comment", TypeCode::Blob, 196605),
        build_column(session, tbl, "character_set_client", Varchar, 32),
        build_column(session, tbl, "collation_connection", Varchar, 32),
        build_column(session, tbl, "Database Collation", Varchar, 32),
    ])
}

fn show_trigger_schema(session: &SessionContext) -> Schema {
    let tbl = "TRIGGERS";
    Schema::new(vec![
        build_column(session, tbl, "Trigger", Varchar, 128),
        build_column(session, tbl, "Event", Varchar, 128),
        build_column(session, tbl, "Table", Varchar, 128),
        build_column(session, tbl, "Statement", TypeCode::Blob, 196605),
        build_column(session, tbl, "Timing", Varchar, 128),
        build_column(session, tbl, "Created", Datetime, 19),
        build_column(session, tbl, "sql_mode", TypeCode::Blob, 8192),
        build_column(session, tbl, "Definer", Varchar, 128),
        build_column(session, tbl, "character_set_client", Varchar, 32),
        build_column(session, tbl, "collation_connection", Varchar, 32),
        build_column(session, tbl, "Database Collation", Varchar, 32),
    ])
}

fn show_events_schema(session: &SessionContext) -> Schema {
    let tbl = "EVENTS";
    Schema::new(vec![
        build_column(session, tbl, "Db", Varchar, 128),
        build_column(session, tbl, "Name", Varchar, 128),
        build_column(session, tbl, "Time zone", Varchar, 32),
        build_column(session, tbl, "Definer", Varchar, 128),
        build_column(session, tbl, "Type", Varchar, 128),
        build_column(session, tbl, "Execute At", Datetime, 19),
        build_column(session, tbl, "Interval Value", Varchar, 128),
        build_column(session, tbl, "Interval Field", Varchar, 128),
        build_column(session, tbl, "Starts", Datetime, 19),
        build_column(session, tbl, "Ends", Datetime, 19),
        build_column(session, tbl, "Status", Varchar, 32),
        build_column(session, tbl, "Originator", TypeCode::Int24, 4),
        build_column(session, tbl, "character_set_client", Varchar, 32),
        build_column(session, tbl, "collation_connection", Varchar, 32),
        build_column(session, tbl, "Database Collation", Varchar, 32),
    ])
}

fn show_warnings_schema(session: &SessionContext) -> Schema {
    let tbl = "WARNINGS";
    Schema::new(vec![
        build_column(session, tbl, "Level", Varchar, 64),
        build_column(session, tbl, "Code", Long, 19),
        build_column(session, tbl, "Message", Varchar, 64),
    ])
}

pub fn show_ddl_schema(session: &SessionContext) -> Schema {
    Schema::new(vec![
        build_column(session, "", "SCHEMA_VER", LongLong, 4),
        build_column(session, "", "OWNER", Varchar, 64),
        build_column(session, "", "JOB", Varchar, 128),
        build_column(session, "", "BG_SCHEMA_VER", LongLong, 4),
        build_column(session, "", "BG_OWNER", Varchar, 64),
        build_column(session, "", "BG_JOB", Varchar, 128),
    ])
}

pub fn explain_schema() -> Schema {
    Schema::new(
        ["ID", "Json", "ParentID"]
            .iter()
            .map(|name| Column::new("", "", name, FieldType::new(TypeCode::String)))
            .collect(),
    )
}
