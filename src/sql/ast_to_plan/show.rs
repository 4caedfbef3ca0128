use std::sync::Arc;

use tracing::warn;

use crate::common::{Clause, PlanError, PlanResult};
use crate::sql::ast::{AdminStmt, AdminType, ColumnName, ColumnNameExpr, ExprNode, ShowStmt, ShowType, Statement};
use crate::sql::plan::{explain_rows, PlanKind, PlanNode};
use crate::sql::schema::Schema;
use crate::sql::show_schema::{build_show_schema, explain_schema, show_ddl_schema};
use crate::sql::utils::split_where;

use super::PlanBuilder;

impl<'a> PlanBuilder<'a> {
    pub(crate) fn build_show(&mut self, show: &ShowStmt) -> PlanResult<PlanNode> {
        let db_name = match show.tp {
            ShowType::Tables | ShowType::TableStatus if show.db_name.is_empty() => self.session.current_db().to_string(),
            _ => show.db_name.clone(),
        };
        let schema = if db_name == show.db_name {
            build_show_schema(show, self.session)
        } else {
            build_show_schema(&ShowStmt { db_name: db_name.clone(), ..show.clone() }, self.session)
        };
        // Column positions are reassigned after assembly.
        let schema = Arc::new(Schema::new(schema.columns().to_vec()));

        let kind = PlanKind::Show {
            tp: show.tp,
            db_name,
            table: show.table.clone(),
            full: show.full,
            global: show.global,
            user: show.user.clone(),
        };
        let p = self.new_node(kind, vec![], schema);

        let mut conditions = Vec::new();
        if let Some(pattern) = &show.pattern {
            if let Some(first) = p.schema.column(0) {
                let like = ExprNode::Like {
                    expr: Box::new(ExprNode::Column(ColumnNameExpr { name: ColumnName::new(&first.name.o) })),
                    pattern: Box::new(ExprNode::string(pattern)),
                    negated: false,
                };
                let (expr, _) = self.rewrite(&like, Some(&p), None, false, Clause::ShowFilter)?;
                conditions.push(expr);
            }
        }
        for cond in split_where(show.where_clause.as_ref()) {
            let (expr, _) = self.rewrite(cond, Some(&p), None, false, Clause::ShowFilter)?;
            conditions.push(expr);
        }
        if conditions.is_empty() {
            return Ok(p);
        }
        self.state.opt_flags.push_down_predicates = true;
        let schema = Arc::clone(&p.schema);
        Ok(self.new_node(PlanKind::Selection { conditions }, vec![p], schema))
    }

    /// EXPLAIN of a SHOW is the SHOW itself.
    pub(crate) fn build_explain(&mut self, stmt: &Statement) -> PlanResult<PlanNode> {
        if let Statement::Show(show) = stmt {
            return self.build_show(show);
        }
        let target = self.build(stmt)?;
        let rows = explain_rows(&target);
        Ok(self.new_node(PlanKind::Explain { rows }, vec![target], Arc::new(explain_schema())))
    }

    pub(crate) fn build_admin(&mut self, admin: &AdminStmt) -> PlanResult<PlanNode> {
        match admin.tp {
            AdminType::CheckTable => Ok(self.empty_node(PlanKind::CheckTable { tables: admin.tables.clone() })),
            AdminType::ShowDdl => Ok(self.new_node(PlanKind::ShowDdl, vec![], Arc::new(show_ddl_schema(self.session)))),
            other => {
                warn!("planner: admin statement {:?} is not supported", other);
                Err(PlanError::UnsupportedStatement(format!("AdminStmt({:?})", other)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::{parse_expr, SelectStmt, TableName};
    use crate::sql::ast_to_plan::translate;
    use crate::sql::rewriter::DefaultRewriter;
    use crate::testutil::{test_catalog, test_session};

    #[test]
    fn test_show_tables_uses_current_db() {
        let catalog = test_catalog();
        let session = test_session();
        let mut show = ShowStmt::new(ShowType::Tables);
        show.pattern = Some("ord%".to_string());
        let tr = translate(&Statement::Show(show), &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.shape(), vec!["Selection", "Show"]);
        let show_node = &tr.plan.children[0];
        assert!(Arc::ptr_eq(&tr.plan.schema, &show_node.schema));
        assert_eq!(tr.plan.schema.column(0).unwrap().name.o, "Tables_in_test");
        match &show_node.kind {
            PlanKind::Show { db_name, .. } => assert_eq!(db_name, "test"),
            other => panic!("unexpected node {:?}", other),
        }
        match &tr.plan.kind {
            PlanKind::Selection { conditions } => assert_eq!(conditions[0].to_string(), "like(Tables_in_test, 'ord%')"),
            other => panic!("unexpected node {:?}", other),
        }
        assert!(tr.visit_info.is_empty());
    }

    #[test]
    fn test_show_where_filter() {
        let catalog = test_catalog();
        let session = test_session();
        let mut show = ShowStmt::new(ShowType::Variables);
        show.where_clause = Some(parse_expr("Variable_name = 'autocommit' AND Value = 'ON'").unwrap());
        let tr = translate(&Statement::Show(show.clone()), &catalog, &session, &DefaultRewriter).unwrap();
        match &tr.plan.kind {
            PlanKind::Selection { conditions } => assert_eq!(conditions.len(), 2),
            other => panic!("unexpected node {:?}", other),
        }
        assert!(tr.plan.schema.positions_consistent());

        show.where_clause = Some(parse_expr("nope = 1").unwrap());
        let err = translate(&Statement::Show(show), &catalog, &session, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::Expression { clause: Clause::ShowFilter, .. }));
    }

    #[test]
    fn test_show_without_filter() {
        let catalog = test_catalog();
        let session = test_session();
        let tr = translate(&Statement::Show(ShowStmt::new(ShowType::Databases)), &catalog, &session, &DefaultRewriter)
            .unwrap();
        assert_eq!(tr.plan.shape(), vec!["Show"]);
        assert_eq!(tr.plan.schema.len(), 1);
    }

    #[test]
    fn test_show_columns_take_session_charset() {
        let catalog = test_catalog();
        let mut session = test_session();
        session.charset = "latin1".to_string();
        session.collation = "latin1_bin".to_string();
        let tr = translate(&Statement::Show(ShowStmt::new(ShowType::Databases)), &catalog, &session, &DefaultRewriter)
            .unwrap();
        let col = tr.plan.schema.column(0).unwrap();
        assert_eq!(col.ret_type.charset, "latin1");
        assert_eq!(col.ret_type.collate, "latin1_bin");
    }

    #[test]
    fn test_explain_select() {
        let catalog = test_catalog();
        let session = test_session();
        let stmt = Statement::Explain(Box::new(Statement::Select(SelectStmt::star_from("t"))));
        let tr = translate(&stmt, &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.shape(), vec!["Explain", "Projection", "DataScan"]);
        let names: Vec<&str> = tr.plan.schema.columns().iter().map(|c| c.name.o.as_str()).collect();
        assert_eq!(names, vec!["ID", "Json", "ParentID"]);
        match &tr.plan.kind {
            PlanKind::Explain { rows } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].id, "Projection_2");
                assert_eq!(rows[1].parent_id, "Projection_2");
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(tr.visit_info.len(), 1);
    }

    #[test]
    fn test_explain_show_is_show() {
        let catalog = test_catalog();
        let session = test_session();
        let stmt = Statement::Explain(Box::new(Statement::Show(ShowStmt::new(ShowType::Engines))));
        let tr = translate(&stmt, &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.shape(), vec!["Show"]);
        assert_eq!(tr.plan.schema.len(), 6);
    }

    #[test]
    fn test_admin() {
        let catalog = test_catalog();
        let session = test_session();
        let check = AdminStmt { tp: AdminType::CheckTable, tables: vec![TableName::new("t")] };
        let tr = translate(&Statement::Admin(check), &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.kind.name(), "CheckTable");

        let ddl = AdminStmt { tp: AdminType::ShowDdl, tables: vec![] };
        let tr = translate(&Statement::Admin(ddl), &catalog, &session, &DefaultRewriter).unwrap();
        assert_eq!(tr.plan.schema.len(), 6);

        let jobs = AdminStmt { tp: AdminType::ShowDdlJobs, tables: vec![] };
        let err = translate(&Statement::Admin(jobs), &catalog, &session, &DefaultRewriter).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedStatement(_)));
    }
}
