use std::sync::Arc;

use crate::catalog::ColumnInfo;
use crate::common::{Clause, Datum, FirstError, PlanError, PlanResult};
use crate::sql::ast::{Assignment as AstAssignment, ColumnName, ExprNode, InsertStmt};
use crate::sql::expression::{Assignment, Expression};
use crate::sql::plan::{PlanKind, PlanNode, TableRef};
use crate::sql::privilege::Privilege;
use crate::sql::schema::Schema;

use super::PlanBuilder;

const FIELD_LIST: &str = "field list";

impl<'a> PlanBuilder<'a> {
    /// INSERT / REPLACE. VALUES rows are all walked and the first error in
    /// source order is reported; SET and ON DUPLICATE KEY UPDATE stop at their
    /// first error.
    pub(crate) fn build_insert(&mut self, insert: &InsertStmt) -> PlanResult<PlanNode> {
        let (db, by_name) = self.lookup_table(&insert.table)?;
        let info = self
            .catalog
            .table_by_id(by_name.id)
            .ok_or_else(|| PlanError::Catalog(format!("Can't get table {}.", by_name.name)))?;
        let schema = Arc::new(Schema::from_table(&db, &info.name.o, &info));
        self.add_visit_info(Privilege::Insert, &db, &info.name.l, "");

        let cols: Vec<&ColumnInfo> = info.public_columns().collect();
        let mut first = FirstError::new();

        let listed: Vec<Option<&ColumnInfo>> = insert
            .columns
            .iter()
            .map(|c| {
                let found = cols.iter().find(|col| col.name.l == c.name.l).copied();
                if found.is_none() {
                    first.record(PlanError::UnknownColumn { name: c.to_string(), context: FIELD_LIST.to_string() });
                }
                found
            })
            .collect();
        let target_count = if insert.columns.is_empty() { cols.len() } else { listed.len() };
        let target = |i: usize| {
            if insert.columns.is_empty() { cols.get(i).copied() } else { listed.get(i).copied().flatten() }
        };

        let mut lists = Vec::with_capacity(insert.lists.len());
        for (row, values) in insert.lists.iter().enumerate() {
            // `VALUES ()` without a column list fills every column with its default.
            if values.is_empty() && insert.columns.is_empty() {
                let mut exprs = Vec::with_capacity(cols.len());
                for col in &cols {
                    exprs.extend(first.absorb(self.column_default(col)));
                }
                lists.push(exprs);
                continue;
            }
            if values.len() != target_count {
                first.record(PlanError::WrongValueCount { row: row + 1 });
            }
            let mut exprs = Vec::with_capacity(values.len());
            for (i, value) in values.iter().enumerate() {
                let res = match value {
                    ExprNode::Default(Some(name)) => self.named_default(&cols, name),
                    ExprNode::Default(None) => match target(i) {
                        Some(col) => self.column_default(col),
                        None => Err(PlanError::WrongValueCount { row: row + 1 }),
                    },
                    ExprNode::Literal(d) => Ok(Expression::constant(d.clone(), d.literal_type())),
                    _ => self.rewrite(value, None, None, false, Clause::Values).map(|(e, _)| e),
                };
                exprs.extend(first.absorb(res));
            }
            lists.push(exprs);
        }

        let setlist = self.build_insert_assignments(&insert.setlist, &cols, &schema, None, Clause::SetList, &mut first);
        let on_duplicate = if insert.on_duplicate.is_empty() {
            Vec::new()
        } else {
            let dual = self.new_node(PlanKind::TableDual, vec![], Arc::clone(&schema));
            self.build_insert_assignments(
                &insert.on_duplicate,
                &cols,
                &schema,
                Some(&dual),
                Clause::OnDuplicate,
                &mut first,
            )
        };

        let mut children = Vec::new();
        if let Some(query) = &insert.select {
            if !first.is_set() {
                let select = self.build_query(query)?;
                if select.schema.len() != target_count {
                    return Err(PlanError::WrongValueCount { row: 1 });
                }
                children.push(select);
            }
        }

        let kind = PlanKind::Insert {
            table: TableRef { db, table: info.name.clone(), id: info.id },
            columns: insert.columns.iter().map(|c| c.name.clone()).collect(),
            lists,
            setlist,
            on_duplicate,
            is_replace: insert.is_replace,
            ignore: insert.ignore,
            priority: insert.priority,
        };
        let node = self.new_node(kind, children, Arc::new(Schema::empty()));
        first.finish(node)
    }

    fn build_insert_assignments(
        &mut self,
        list: &[AstAssignment],
        cols: &[&ColumnInfo],
        schema: &Schema,
        plan: Option<&PlanNode>,
        clause: Clause,
        first: &mut FirstError,
    ) -> Vec<Assignment> {
        let mut out = Vec::with_capacity(list.len());
        for assign in list {
            let column = match schema.find_column(&assign.column) {
                Ok(Some(col)) => col.clone(),
                _ => {
                    first.record(PlanError::UnknownColumn {
                        name: assign.column.to_string(),
                        context: FIELD_LIST.to_string(),
                    });
                    break;
                }
            };
            let res = match &assign.expr {
                ExprNode::Default(Some(name)) => self.named_default(cols, name),
                ExprNode::Default(None) => self.named_default(cols, &ColumnName::new(&column.name.o)),
                expr => self.rewrite(expr, plan, None, false, clause).map(|(e, _)| e),
            };
            match res {
                Ok(expr) => out.push(Assignment { column, expr }),
                Err(e) => {
                    first.record(e);
                    break;
                }
            }
        }
        out
    }

    /// Value of `DEFAULT(col)`.
    fn named_default(&self, cols: &[&ColumnInfo], name: &ColumnName) -> PlanResult<Expression> {
        match cols.iter().find(|c| c.name.l == name.name.l) {
            Some(col) => self.column_default(col),
            None => Err(PlanError::UnknownColumn { name: name.to_string(), context: FIELD_LIST.to_string() }),
        }
    }

    /// The default value a column takes when none is given.
    fn column_default(&self, col: &ColumnInfo) -> PlanResult<Expression> {
        let tp = &col.field_type;
        let value = match &col.default_value {
            Some(value) => value.clone(),
            None if !tp.not_null || tp.auto_increment => Datum::Null,
            None if self.session.strict_mode => {
                return Err(PlanError::NoDefaultValue { column: col.name.o.clone() });
            }
            None => Datum::zero_for(tp),
        };
        Ok(Expression::constant(value, tp.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RewriteError;
    use crate::sql::ast::{parse_expr, QueryExpr, SelectField, SelectStmt, Statement, TableName};
    use crate::sql::ast_to_plan::translate;
    use crate::sql::rewriter::DefaultRewriter;
    use crate::sql::session::SessionContext;
    use crate::testutil::{test_catalog, test_session};

    fn values(rows: &[&[&str]]) -> Vec<Vec<ExprNode>> {
        rows.iter().map(|row| row.iter().map(|v| parse_expr(v).unwrap()).collect()).collect()
    }

    fn insert_into(table: &str) -> InsertStmt {
        InsertStmt::new(TableName::new(table))
    }

    fn lists_of(plan: &PlanNode) -> &Vec<Vec<Expression>> {
        match &plan.kind {
            PlanKind::Insert { lists, .. } => lists,
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_insert_values() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("t");
        insert.lists = values(&[&["1", "'a'", "'n'"], &["2", "upper('b')", "NULL"]]);
        let tr = translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.shape(), vec!["Insert"]);
        let lists = lists_of(&tr.plan);
        assert_eq!(lists.len(), 2);
        assert!(matches!(&lists[1][1], Expression::ScalarFunction { name, .. } if name == "upper"));
        assert_eq!(tr.visit_info.len(), 1);
        assert_eq!(tr.visit_info[0].privilege, Privilege::Insert);
    }

    #[test]
    fn test_first_error_wins_across_rows() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("t");
        insert.lists = values(&[&["1", "'a'", "'n'"], &["2", "bad_one + 1", "'x'"], &["3", "bad_two", "'y'"]]);
        let err = translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter).unwrap_err();
        match err {
            PlanError::Expression { clause: Clause::Values, source: RewriteError::UnknownColumn { name, context } } => {
                assert_eq!(name, "bad_one");
                assert_eq!(context, "field list");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrong_value_count() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("t");
        insert.columns = vec![ColumnName::new("id"), ColumnName::new("name")];
        insert.lists = values(&[&["1", "'a'"], &["2"]]);
        let err = translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::WrongValueCount { row: 2 }));
        assert_eq!(err.mysql_code(), 1136);
    }

    #[test]
    fn test_default_values() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("users");
        insert.columns = vec![ColumnName::new("id"), ColumnName::new("email"), ColumnName::new("name")];
        insert.lists = vec![vec![
            ExprNode::Default(None),
            ExprNode::Default(None),
            ExprNode::Default(Some(ColumnName::new("email"))),
        ]];
        let tr = translate(&Statement::Insert(insert.clone()), &catalog, &session, &DefaultRewriter).unwrap();
        let row = &lists_of(&tr.plan)[0];
        // auto_increment id takes NULL, email its declared default.
        assert!(matches!(&row[0], Expression::Constant(c) if c.value == Datum::Null));
        assert!(matches!(&row[1], Expression::Constant(c) if c.value == Datum::String(String::new())));
        assert!(matches!(&row[2], Expression::Constant(c) if c.value == Datum::String(String::new())));

        insert.lists = vec![vec![ExprNode::int(1), ExprNode::Default(None), ExprNode::Default(None)]];
        let err = translate(&Statement::Insert(insert.clone()), &catalog, &session, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::NoDefaultValue { ref column } if column == "name"));

        let lenient = SessionContext { strict_mode: false, ..test_session() };
        let tr = translate(&Statement::Insert(insert.clone()), &catalog, &lenient, &DefaultRewriter).unwrap();
        let row = &lists_of(&tr.plan)[0];
        assert!(matches!(&row[2], Expression::Constant(c) if c.value == Datum::String(String::new())));

        insert.lists = vec![vec![ExprNode::int(1), ExprNode::Default(Some(ColumnName::new("nope"))), ExprNode::int(2)]];
        match translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter) {
            Err(PlanError::UnknownColumn { name, context }) => {
                assert_eq!(name, "nope");
                assert_eq!(context, "field list");
            }
            other => panic!("unexpected result {:?}", other.map(|t| t.plan.shape())),
        }
    }

    #[test]
    fn test_set_and_on_duplicate() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("orders");
        insert.setlist = vec![
            AstAssignment { column: ColumnName::new("user_id"), expr: parse_expr("7").unwrap() },
            AstAssignment { column: ColumnName::new("amount"), expr: parse_expr("1.5").unwrap() },
        ];
        insert.on_duplicate = vec![AstAssignment {
            column: ColumnName::new("amount"),
            expr: parse_expr("amount + 1").unwrap(),
        }];
        let tr = translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter).unwrap();
        match &tr.plan.kind {
            PlanKind::Insert { setlist, on_duplicate, table, .. } => {
                assert_eq!(setlist.len(), 2);
                assert_eq!(setlist[1].column.position, 2);
                assert_eq!(on_duplicate.len(), 1);
                assert_eq!(on_duplicate[0].expr.to_string(), "plus(orders.amount, 1)");
                assert_eq!(table.id, 2);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_default_in_set_and_on_duplicate() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("users");
        insert.setlist = vec![
            AstAssignment { column: ColumnName::new("name"), expr: parse_expr("'x'").unwrap() },
            AstAssignment { column: ColumnName::new("email"), expr: ExprNode::Default(None) },
        ];
        insert.on_duplicate = vec![
            AstAssignment { column: ColumnName::new("email"), expr: ExprNode::Default(None) },
            AstAssignment { column: ColumnName::new("name"), expr: ExprNode::Default(Some(ColumnName::new("email"))) },
        ];
        let tr = translate(&Statement::Insert(insert.clone()), &catalog, &session, &DefaultRewriter).unwrap();
        match &tr.plan.kind {
            PlanKind::Insert { setlist, on_duplicate, .. } => {
                assert!(matches!(&setlist[1].expr, Expression::Constant(c) if c.value == Datum::String(String::new())));
                assert_eq!(on_duplicate.len(), 2);
                assert!(matches!(&on_duplicate[0].expr, Expression::Constant(c) if c.value == Datum::String(String::new())));
                assert!(matches!(&on_duplicate[1].expr, Expression::Constant(c) if c.value == Datum::String(String::new())));
            }
            other => panic!("unexpected node {:?}", other),
        }

        // name is NOT NULL without a default.
        insert.on_duplicate = vec![AstAssignment { column: ColumnName::new("name"), expr: ExprNode::Default(None) }];
        let err = translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::NoDefaultValue { ref column } if column == "name"));
    }

    #[test]
    fn test_empty_values_row_takes_defaults() {
        let catalog = test_catalog();
        let mut insert = insert_into("orders");
        insert.lists = vec![vec![]];

        let lenient = SessionContext { strict_mode: false, ..test_session() };
        let tr = translate(&Statement::Insert(insert.clone()), &catalog, &lenient, &DefaultRewriter).unwrap();
        let row = &lists_of(&tr.plan)[0];
        assert_eq!(row.len(), 3);
        assert!(matches!(&row[0], Expression::Constant(c) if c.value == Datum::Null));
        assert!(matches!(&row[1], Expression::Constant(c) if c.value == Datum::Int(0)));
        assert!(matches!(&row[2], Expression::Constant(c) if c.value == Datum::Float(0.0)));

        let err = translate(&Statement::Insert(insert.clone()), &catalog, &test_session(), &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::NoDefaultValue { ref column } if column == "user_id"));

        insert.columns = vec![ColumnName::new("user_id")];
        let err = translate(&Statement::Insert(insert), &catalog, &lenient, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::WrongValueCount { row: 1 }));
    }

    #[test]
    fn test_insert_select() {
        let catalog = test_catalog();
        let session = test_session();
        let mut insert = insert_into("users");
        insert.columns = vec![ColumnName::new("name")];
        insert.select = Some(Box::new(QueryExpr::Select(SelectStmt {
            fields: vec![SelectField::expr(parse_expr("name").unwrap())],
            ..SelectStmt::star_from("t")
        })));
        let tr = translate(&Statement::Insert(insert.clone()), &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.shape(), vec!["Insert", "Projection", "DataScan"]);
        let privs: Vec<(Privilege, &str)> = tr.visit_info.iter().map(|v| (v.privilege, v.table.as_str())).collect();
        assert_eq!(privs, vec![(Privilege::Insert, "users"), (Privilege::Select, "t")]);

        insert.columns = vec![ColumnName::new("name"), ColumnName::new("email")];
        let err = translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::WrongValueCount { row: 1 }));
    }

    #[test]
    fn test_table_missing_by_id() {
        let mut catalog = test_catalog();
        catalog.forget_table_id(1);
        let session = test_session();
        let mut insert = insert_into("t");
        insert.lists = values(&[&["1", "'a'", "'n'"]]);
        match translate(&Statement::Insert(insert), &catalog, &session, &DefaultRewriter) {
            Err(PlanError::Catalog(msg)) => assert_eq!(msg, "Can't get table t."),
            other => panic!("unexpected result {:?}", other.map(|t| t.plan.shape())),
        }
    }
}
