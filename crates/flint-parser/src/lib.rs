//! A small recursive-descent parser for the MySQL-derived dialect described
//! in §6 of the specification.
//!
//! Parsing is treated as an external collaborator by the rest of the
//! engine (§1): the planner only depends on [`ast::Statement`] and friends,
//! never on tokenizer or parser internals.

pub mod ast;
pub mod parser;
pub mod tokens;

pub use ast::*;
pub use parser::parse_statements;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let stmts = parse_statements("SELECT * FROM `$satellites`").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::Query(q) => {
                assert_eq!(q.select.projection, vec![SelectItem::Wildcard]);
                assert_eq!(q.select.from.len(), 1);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_where_and_group_by_having() {
        let sql = "SELECT planetId, COUNT(*) FROM satellites GROUP BY planetId HAVING COUNT(*) > 5";
        let stmts = parse_statements(sql).unwrap();
        match &stmts[0] {
            Statement::Query(q) => {
                assert_eq!(q.select.group_by.len(), 1);
                assert!(q.select.having.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_placeholder_bind_param() {
        let stmts = parse_statements("SELECT * FROM planets WHERE id > ?").unwrap();
        match &stmts[0] {
            Statement::Query(q) => match q.select.selection.as_ref().unwrap() {
                Expr::Comparison { right, .. } => {
                    assert!(matches!(**right, Expr::Placeholder(0)));
                }
                other => panic!("unexpected expr: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_temporal_for_clause() {
        let stmts = parse_statements("SELECT * FROM logs FOR TODAY").unwrap();
        match &stmts[0] {
            Statement::Query(q) => match &q.select.from[0].relation {
                TableFactor::Table { temporal, .. } => {
                    assert_eq!(temporal, &Some(TemporalFilter::Today));
                }
                other => panic!("unexpected relation: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_limit_offset() {
        let stmts = parse_statements("SELECT * FROM satellites LIMIT 50 OFFSET 150").unwrap();
        match &stmts[0] {
            Statement::Query(q) => {
                assert_eq!(q.limit, Some(Expr::Literal(Literal::Number("50".into()))));
                assert_eq!(q.offset, Some(Expr::Literal(Literal::Number("150".into()))));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_multi_statement_batch() {
        let stmts = parse_statements("SELECT 1; SELECT 2;").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn backtick_identifiers_and_strings_respect_semicolons_inside_quotes() {
        let stmts = parse_statements("SELECT * FROM t WHERE name = 'a;b'").unwrap();
        assert_eq!(stmts.len(), 1);
    }
}
