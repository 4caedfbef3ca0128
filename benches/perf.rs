use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rsql_planner::catalog::{MemCatalog, TableInfo};
use rsql_planner::common::{FieldType, TypeCode};
use rsql_planner::sql::ast::{
    parse_expr, ByItem, InsertStmt, JoinType, SelectField, SelectStmt, Statement, TableName, TableSource,
};
use rsql_planner::{translate, translate_all, DefaultRewriter, SessionContext};
use std::time::Duration;

fn setup_catalog() -> MemCatalog {
    let mut catalog = MemCatalog::new();
    let main = TableInfo::new(1, "test_main")
        .column("id", FieldType::new(TypeCode::Long))
        .column("val", FieldType::new(TypeCode::Varchar).with_len(255))
        .column("category", FieldType::new(TypeCode::Long))
        .handle_pk("id")
        .index("idx_category", &["category"], false);
    catalog.add_table("bench", main).unwrap();

    let orders = TableInfo::new(2, "test_orders")
        .column("oid", FieldType::new(TypeCode::Long))
        .column("user_id", FieldType::new(TypeCode::Long))
        .column("amount", FieldType::new(TypeCode::Float))
        .handle_pk("oid");
    catalog.add_table("bench", orders).unwrap();
    catalog
}

fn point_select() -> Statement {
    let mut sel = SelectStmt::star_from("test_main");
    sel.where_clause = Some(parse_expr("id = 50").unwrap());
    Statement::Select(sel)
}

fn join_select() -> Statement {
    let sel = SelectStmt {
        fields: vec![
            SelectField::expr(parse_expr("t.val").unwrap()),
            SelectField::expr(parse_expr("o.amount").unwrap()),
        ],
        from: Some(TableSource::join(
            TableSource::Table { name: TableName::new("test_main"), alias: Some("t".into()) },
            TableSource::Table { name: TableName::new("test_orders"), alias: Some("o".into()) },
            JoinType::Inner,
            Some(parse_expr("t.id = o.user_id").unwrap()),
        )),
        where_clause: Some(parse_expr("t.id = 10").unwrap()),
        ..Default::default()
    };
    Statement::Select(sel)
}

fn group_select() -> Statement {
    let sel = SelectStmt {
        fields: vec![
            SelectField::expr(parse_expr("category").unwrap()),
            SelectField::expr(parse_expr("COUNT(*)").unwrap()),
            SelectField::expr(parse_expr("AVG(id)").unwrap()),
        ],
        from: Some(TableSource::table("test_main")),
        group_by: vec![parse_expr("category").unwrap()],
        order_by: vec![ByItem { expr: parse_expr("category").unwrap(), desc: false }],
        ..Default::default()
    };
    Statement::Select(sel)
}

fn insert_values() -> Statement {
    let mut insert = InsertStmt::new(TableName::new("test_main"));
    insert.lists = (1..=100)
        .map(|i| {
            vec![
                parse_expr(&i.to_string()).unwrap(),
                parse_expr(&format!("'val_{}'", i)).unwrap(),
                parse_expr(&(i % 5).to_string()).unwrap(),
            ]
        })
        .collect();
    Statement::Insert(insert)
}

fn bench_translate_suites(c: &mut Criterion) {
    let catalog = setup_catalog();
    let session = SessionContext::with_db("bench");
    let rewriter = DefaultRewriter;

    // --- Group 1: basic DML ---
    let mut g1 = c.benchmark_group("Basic-Operations");
    g1.measurement_time(Duration::from_secs(5));

    let stmt = point_select();
    g1.bench_function("point_select_indexed", |b| {
        b.iter(|| translate(black_box(&stmt), &catalog, &session, &rewriter).unwrap());
    });

    let stmt = insert_values();
    g1.bench_function("insert_100_rows", |b| {
        b.iter(|| translate(black_box(&stmt), &catalog, &session, &rewriter).unwrap());
    });
    g1.finish();

    // --- Group 2: JOIN / aggregation ---
    let mut g2 = c.benchmark_group("Analytical-Queries");
    g2.measurement_time(Duration::from_secs(5));

    let stmt = join_select();
    g2.bench_function("inner_join_simple", |b| {
        b.iter(|| translate(black_box(&stmt), &catalog, &session, &rewriter).unwrap());
    });

    let stmt = group_select();
    g2.bench_function("group_by_aggregation", |b| {
        b.iter(|| translate(black_box(&stmt), &catalog, &session, &rewriter).unwrap());
    });

    let batch: Vec<Statement> = (0..64)
        .map(|i| match i % 3 {
            0 => point_select(),
            1 => join_select(),
            _ => group_select(),
        })
        .collect();
    g2.bench_function("parallel_batch_64", |b| {
        b.iter(|| translate_all(black_box(&batch), &catalog, &session, &rewriter));
    });
    g2.finish();
}

criterion_group!(benches, bench_translate_suites);
criterion_main!(benches);
