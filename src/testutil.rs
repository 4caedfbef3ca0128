use crate::catalog::{MemCatalog, TableInfo};
use crate::common::{Datum, FieldType, TypeCode};
use crate::sql::session::SessionContext;

/// `test.t(id, name, note)`, `test.orders(id, user_id, amount)` and
/// `test.users(id, name, email)`.
pub fn test_catalog() -> MemCatalog {
    let mut catalog = MemCatalog::new();
    catalog.add_schema("test");

    let t = TableInfo::new(1, "t")
        .column("id", FieldType::new(TypeCode::Long))
        .column("name", FieldType::new(TypeCode::Varchar).with_len(64))
        .column("note", FieldType::new(TypeCode::Varchar).with_len(255))
        .handle_pk("id")
        .index("idx_name", &["name"], false);
    catalog.add_table("test", t).unwrap();

    let orders = TableInfo::new(2, "orders")
        .column("id", FieldType::new(TypeCode::LongLong).with_auto_increment())
        .column("user_id", FieldType::new(TypeCode::Long).with_not_null())
        .column_with_default("amount", FieldType::new(TypeCode::Double).with_not_null(), Datum::Float(0.0))
        .handle_pk("id")
        .index("idx_user", &["user_id"], false)
        .index("idx_user_amount", &["user_id", "amount"], false);
    catalog.add_table("test", orders).unwrap();

    let users = TableInfo::new(3, "users")
        .column("id", FieldType::new(TypeCode::Long).with_auto_increment())
        .column("name", FieldType::new(TypeCode::Varchar).with_len(32).with_not_null())
        .column_with_default("email", FieldType::new(TypeCode::Varchar).with_len(128), Datum::String(String::new()))
        .handle_pk("id")
        .index("uk_name", &["name"], true);
    catalog.add_table("test", users).unwrap();

    catalog
}

pub fn test_session() -> SessionContext {
    SessionContext::with_db("test")
}
