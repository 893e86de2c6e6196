use flint_error::{EngineError, ErrorKind, Result};

use crate::ast::*;
use crate::tokens::{Token, Tokenizer};

/// Split `sql` on top-level `;` and parse each statement.
///
/// Multi-statement batches are supported; quoted contexts are respected
/// because they're resolved by the tokenizer before statements are split.
pub fn parse_statements(sql: &str) -> Result<Vec<Statement>> {
    let tokens = Tokenizer::new(sql).tokenize()?;

    let mut statements = Vec::new();
    let mut start = 0;
    for (idx, tok) in tokens.iter().enumerate() {
        if matches!(tok, Token::Semicolon) {
            if idx > start {
                let mut chunk = tokens[start..idx].to_vec();
                chunk.push(Token::Eof);
                let mut parser = Parser::new(chunk);
                statements.push(parser.parse_statement()?);
            }
            start = idx + 1;
        }
    }
    if start < tokens.len() && !matches!(tokens[start], Token::Eof) {
        let chunk = tokens[start..].to_vec();
        let mut parser = Parser::new(chunk);
        statements.push(parser.parse_statement()?);
    }

    if statements.is_empty() {
        return Err(EngineError::new(
            ErrorKind::MissingSqlStatement,
            "no SQL statement provided",
        ));
    }

    Ok(statements)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_placeholder: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            next_placeholder: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_n(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if !matches!(tok, Token::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn is_word(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }

    fn is_word_n(&self, n: usize, kw: &str) -> bool {
        matches!(self.peek_n(n), Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }

    fn eat_word(&mut self, kw: &str) -> bool {
        if self.is_word(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, kw: &str) -> Result<()> {
        if self.eat_word(kw) {
            Ok(())
        } else {
            Err(EngineError::new(
                ErrorKind::UnsupportedSyntax,
                format!("expected keyword '{kw}', found {:?}", self.peek()),
            ))
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Token::Op(o) if o == op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token) -> Result<()> {
        if *self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            Err(EngineError::new(
                ErrorKind::UnsupportedSyntax,
                format!("expected {tok:?}, found {:?}", self.peek()),
            ))
        }
    }

    fn parse_ident_word(&mut self) -> Result<String> {
        match self.advance() {
            Token::Word(w) => Ok(w),
            Token::QuotedIdent(w) => Ok(w),
            other => Err(EngineError::new(
                ErrorKind::UnsupportedSyntax,
                format!("expected identifier, found {other:?}"),
            )),
        }
    }

    /// Parse a dotted name like `schema.table` or `table`.
    fn parse_object_name(&mut self) -> Result<Vec<String>> {
        let mut parts = vec![self.parse_ident_word()?];
        while matches!(self.peek(), Token::Period) {
            self.advance();
            parts.push(self.parse_ident_word()?);
        }
        Ok(parts)
    }

    pub fn parse_statement(&mut self) -> Result<Statement> {
        if self.eat_word("EXPLAIN") {
            let _ = self.eat_word("ANALYZE");
            let inner = self.parse_statement()?;
            return Ok(Statement::Explain(Box::new(inner)));
        }

        if self.eat_word("SHOW") {
            return self.parse_show();
        }

        if self.eat_word("SET") {
            return self.parse_set();
        }

        if self.is_word("SELECT") || self.is_word("WITH") {
            let query = self.parse_query()?;
            return Ok(Statement::Query(query));
        }

        Err(EngineError::new(
            ErrorKind::UnsupportedSyntax,
            format!("unsupported statement starting at {:?}", self.peek()),
        ))
    }

    fn parse_show(&mut self) -> Result<Statement> {
        if self.eat_word("COLUMNS") {
            self.expect_word("FROM").or_else(|_| self.expect_word("IN"))?;
            let table = self.parse_object_name()?;
            return Ok(Statement::ShowColumns { table });
        }
        if self.eat_word("CREATE") {
            self.expect_word("TABLE")?;
            let table = self.parse_object_name()?;
            return Ok(Statement::ShowCreate { table });
        }
        if self.eat_word("FUNCTIONS") {
            return Ok(Statement::ShowFunctions);
        }
        if self.eat_word("VARIABLES") {
            return Ok(Statement::ShowVariable {
                name: String::new(),
            });
        }
        if self.eat_word("PARAMETER") || self.eat_word("VARIABLE") {
            let name = self.parse_ident_word()?;
            return Ok(Statement::ShowVariable { name });
        }
        Err(EngineError::new(
            ErrorKind::UnsupportedSyntax,
            format!("unsupported SHOW form at {:?}", self.peek()),
        ))
    }

    fn parse_set(&mut self) -> Result<Statement> {
        let double_at = matches!(self.peek(), Token::AtAt);
        if matches!(self.peek(), Token::At | Token::AtAt) {
            self.advance();
        }
        let name = self.parse_ident_word()?;
        self.eat_op("=");
        let value = self.parse_expr()?;
        Ok(Statement::Set {
            name,
            value,
            session: !double_at,
        })
    }

    pub fn parse_query(&mut self) -> Result<QueryNode> {
        let select = self.parse_select()?;

        let mut order_by = Vec::new();
        if self.eat_word("ORDER") {
            self.expect_word("BY")?;
            loop {
                let expr = self.parse_expr()?;
                let asc = if self.eat_word("DESC") {
                    false
                } else {
                    self.eat_word("ASC");
                    true
                };
                order_by.push(OrderByExpr { expr, asc });
                if !matches!(self.peek(), Token::Comma) {
                    break;
                }
                self.advance();
            }
        }

        let mut limit = None;
        let mut offset = None;
        // LIMIT and OFFSET may appear in either order per the dialect.
        for _ in 0..2 {
            if limit.is_none() && self.eat_word("LIMIT") {
                limit = Some(self.parse_expr()?);
            } else if offset.is_none() && self.eat_word("OFFSET") {
                offset = Some(self.parse_expr()?);
            } else {
                break;
            }
        }

        Ok(QueryNode {
            select,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_select(&mut self) -> Result<SelectNode> {
        self.expect_word("SELECT")?;

        let distinct = if self.eat_word("DISTINCT") {
            if matches!(self.peek(), Token::Word(w) if w.eq_ignore_ascii_case("ON")) {
                self.advance();
                self.expect(Token::LeftParen)?;
                let mut cols = vec![self.parse_expr()?];
                while matches!(self.peek(), Token::Comma) {
                    self.advance();
                    cols.push(self.parse_expr()?);
                }
                self.expect(Token::RightParen)?;
                Some(cols)
            } else {
                Some(Vec::new())
            }
        } else {
            None
        };

        let mut projection = vec![self.parse_select_item()?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            projection.push(self.parse_select_item()?);
        }

        let mut from = Vec::new();
        if self.eat_word("FROM") {
            from.push(self.parse_table_with_joins()?);
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                from.push(self.parse_table_with_joins()?);
            }
        }

        let selection = if self.eat_word("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat_word("GROUP") {
            self.expect_word("BY")?;
            group_by.push(self.parse_expr()?);
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                group_by.push(self.parse_expr()?);
            }
        }

        let having = if self.eat_word("HAVING") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(SelectNode {
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
        })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if matches!(self.peek(), Token::Op(o) if o == "*") {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }
        if let Token::Word(w) = self.peek().clone() {
            if matches!(self.peek_n(1), Token::Period) && matches!(self.peek_n(2), Token::Op(o) if o == "*") {
                self.advance();
                self.advance();
                self.advance();
                return Ok(SelectItem::QualifiedWildcard(vec![w]));
            }
        }

        let expr = self.parse_expr()?;
        if self.eat_word("AS") {
            let alias = self.parse_ident_word()?;
            return Ok(SelectItem::ExprWithAlias(expr, alias));
        }
        if let Token::Word(w) = self.peek().clone() {
            if !is_reserved_after_expr(&w) {
                self.advance();
                return Ok(SelectItem::ExprWithAlias(expr, w));
            }
        }
        Ok(SelectItem::UnnamedExpr(expr))
    }

    fn parse_table_with_joins(&mut self) -> Result<TableWithJoins> {
        let relation = self.parse_table_factor()?;
        let mut joins = Vec::new();
        loop {
            if self.eat_word("CROSS") {
                if self.eat_word("JOIN") {
                    if self.eat_word("UNNEST") {
                        self.expect(Token::LeftParen)?;
                        let unnest_column = self.parse_expr()?;
                        self.expect(Token::RightParen)?;
                        let alias = self.parse_optional_alias()?;
                        joins.push(Join {
                            relation: TableFactor::Function {
                                name: "UNNEST".to_string(),
                                args: vec![FunctionArg::Expr(unnest_column.clone())],
                                alias,
                                columns: Vec::new(),
                            },
                            operator: JoinOperator::CrossJoinUnnest { unnest_column },
                        });
                        continue;
                    }
                    let relation = self.parse_table_factor()?;
                    joins.push(Join {
                        relation,
                        operator: JoinOperator::Cross,
                    });
                    continue;
                }
                break;
            }

            if self.eat_word("NATURAL") {
                let kind = self.parse_join_side()?;
                self.expect_word("JOIN")?;
                let relation = self.parse_table_factor()?;
                joins.push(Join {
                    relation,
                    operator: JoinOperator::Natural(kind),
                });
                continue;
            }

            let side = if self.eat_word("LEFT") {
                Some("LEFT")
            } else if self.eat_word("RIGHT") {
                Some("RIGHT")
            } else if self.eat_word("FULL") {
                Some("FULL")
            } else if self.eat_word("INNER") {
                Some("INNER")
            } else if self.is_word("JOIN") {
                Some("INNER")
            } else {
                None
            };

            let Some(side) = side else { break };

            let semi = self.eat_word("SEMI");
            let anti = self.eat_word("ANTI");
            let _ = self.eat_word("OUTER");
            self.expect_word("JOIN")?;

            let relation = self.parse_table_factor()?;
            let constraint = self.parse_join_constraint()?;

            let operator = match (side, semi, anti) {
                ("LEFT", true, false) => JoinOperator::LeftSemi(constraint),
                ("LEFT", false, true) => JoinOperator::LeftAnti(constraint),
                ("RIGHT", true, false) => JoinOperator::RightSemi(constraint),
                ("RIGHT", false, true) => JoinOperator::RightAnti(constraint),
                ("LEFT", _, _) => JoinOperator::LeftOuter(constraint),
                ("RIGHT", _, _) => JoinOperator::RightOuter(constraint),
                ("FULL", _, _) => JoinOperator::FullOuter(constraint),
                _ => JoinOperator::Inner(constraint),
            };

            joins.push(Join { relation, operator });
        }

        Ok(TableWithJoins { relation, joins })
    }

    fn parse_join_side(&mut self) -> Result<NaturalKind> {
        if self.eat_word("LEFT") {
            Ok(NaturalKind::Left)
        } else if self.eat_word("RIGHT") {
            Ok(NaturalKind::Right)
        } else if self.eat_word("FULL") {
            Ok(NaturalKind::Full)
        } else {
            let _ = self.eat_word("INNER");
            Ok(NaturalKind::Inner)
        }
    }

    fn parse_join_constraint(&mut self) -> Result<JoinConstraint> {
        if self.eat_word("ON") {
            Ok(JoinConstraint::On(self.parse_expr()?))
        } else if self.eat_word("USING") {
            self.expect(Token::LeftParen)?;
            let mut cols = vec![self.parse_ident_word()?];
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                cols.push(self.parse_ident_word()?);
            }
            self.expect(Token::RightParen)?;
            Ok(JoinConstraint::Using(cols))
        } else {
            Ok(JoinConstraint::None)
        }
    }

    fn parse_table_factor(&mut self) -> Result<TableFactor> {
        if matches!(self.peek(), Token::LeftParen) {
            self.advance();
            let subquery = self.parse_query()?;
            self.expect(Token::RightParen)?;
            let alias = self.parse_optional_alias()?;
            return Ok(TableFactor::Derived {
                subquery: Box::new(subquery),
                alias,
            });
        }

        if self.is_word("VALUES")
            || self.is_word("UNNEST")
            || self.is_word("GENERATE_SERIES")
            || self.is_word("FAKE")
        {
            let name = self.parse_ident_word()?.to_uppercase();
            self.expect(Token::LeftParen)?;
            let mut args = Vec::new();
            if !matches!(self.peek(), Token::RightParen) {
                args.push(self.parse_function_arg()?);
                while matches!(self.peek(), Token::Comma) {
                    self.advance();
                    args.push(self.parse_function_arg()?);
                }
            }
            self.expect(Token::RightParen)?;
            let alias = self.parse_optional_alias()?;
            let columns = self.parse_optional_column_list()?;
            return Ok(TableFactor::Function {
                name,
                args,
                alias,
                columns,
            });
        }

        let name = self.parse_object_name()?;
        let hints = self.parse_optional_hints()?;
        let temporal = self.parse_optional_temporal()?;
        let alias = self.parse_optional_alias()?;
        Ok(TableFactor::Table {
            name,
            alias,
            hints,
            temporal,
        })
    }

    fn parse_optional_hints(&mut self) -> Result<Vec<String>> {
        // `WITH (HINT1, HINT2)` hint block.
        let mut hints = Vec::new();
        if self.is_word("WITH") && matches!(self.peek_n(1), Token::LeftParen) {
            self.advance();
            self.advance();
            hints.push(self.parse_ident_word()?);
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                hints.push(self.parse_ident_word()?);
            }
            self.expect(Token::RightParen)?;
        }
        Ok(hints)
    }

    fn parse_optional_temporal(&mut self) -> Result<Option<TemporalFilter>> {
        if !self.eat_word("FOR") {
            return Ok(None);
        }
        if self.eat_word("TODAY") {
            return Ok(Some(TemporalFilter::Today));
        }
        if self.eat_word("YESTERDAY") {
            return Ok(Some(TemporalFilter::Yesterday));
        }
        self.expect_word("DATES")?;
        if self.eat_word("AS") {
            self.expect_word("OF")?;
            let ts = self.parse_expr()?;
            return Ok(Some(TemporalFilter::AsOf(ts)));
        }
        self.expect_word("BETWEEN")?;
        let start = self.parse_expr()?;
        self.expect_word("AND")?;
        let end = self.parse_expr()?;
        Ok(Some(TemporalFilter::Between(start, end)))
    }

    fn parse_optional_alias(&mut self) -> Result<Option<String>> {
        if self.eat_word("AS") {
            return Ok(Some(self.parse_ident_word()?));
        }
        if let Token::Word(w) = self.peek().clone() {
            if !is_reserved_after_expr(&w) {
                self.advance();
                return Ok(Some(w));
            }
        }
        Ok(None)
    }

    fn parse_optional_column_list(&mut self) -> Result<Vec<String>> {
        if !matches!(self.peek(), Token::LeftParen) {
            return Ok(Vec::new());
        }
        self.advance();
        let mut cols = vec![self.parse_ident_word()?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            cols.push(self.parse_ident_word()?);
        }
        self.expect(Token::RightParen)?;
        Ok(cols)
    }

    fn parse_function_arg(&mut self) -> Result<FunctionArg> {
        if matches!(self.peek(), Token::Op(o) if o == "*") {
            self.advance();
            return Ok(FunctionArg::Wildcard);
        }
        Ok(FunctionArg::Expr(self.parse_expr()?))
    }

    // ---- expression parsing, precedence climbing ----

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_xor()?;
        while self.eat_word("OR") {
            let right = self.parse_xor()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_word("XOR") {
            let right = self.parse_and()?;
            left = Expr::Xor(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_word("AND") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_word("NOT") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        let expr = self.parse_comparison()?;
        self.parse_predicate_tail(expr)
    }

    fn parse_predicate_tail(&mut self, expr: Expr) -> Result<Expr> {
        let negated = self.eat_word("NOT");

        if self.eat_word("BETWEEN") {
            let low = self.parse_comparison()?;
            self.expect_word("AND")?;
            let high = self.parse_comparison()?;
            return Ok(Expr::Between {
                expr: Box::new(expr),
                negated,
                low: Box::new(low),
                high: Box::new(high),
            });
        }

        if self.eat_word("IN") {
            self.expect(Token::LeftParen)?;
            if self.is_word("SELECT") {
                let subquery = self.parse_query()?;
                self.expect(Token::RightParen)?;
                return Ok(Expr::InSubquery {
                    expr: Box::new(expr),
                    subquery: Box::new(subquery),
                    negated,
                });
            }
            let mut list = vec![self.parse_expr()?];
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                list.push(self.parse_expr()?);
            }
            self.expect(Token::RightParen)?;
            return Ok(Expr::InList {
                expr: Box::new(expr),
                list,
                negated,
            });
        }

        if self.eat_word("UNNEST") {
            self.expect(Token::LeftParen)?;
            let array_expr = self.parse_expr()?;
            self.expect(Token::RightParen)?;
            return Ok(Expr::InUnnest {
                expr: Box::new(expr),
                array_expr: Box::new(array_expr),
                negated,
            });
        }

        if self.eat_word("LIKE") {
            let pattern = self.parse_comparison()?;
            return Ok(Expr::Like {
                expr: Box::new(expr),
                pattern: Box::new(pattern),
                negated,
                case_insensitive: false,
            });
        }
        if self.eat_word("ILIKE") {
            let pattern = self.parse_comparison()?;
            return Ok(Expr::Like {
                expr: Box::new(expr),
                pattern: Box::new(pattern),
                negated,
                case_insensitive: true,
            });
        }
        if self.eat_word("SIMILAR") {
            self.expect_word("TO")?;
            let pattern = self.parse_comparison()?;
            return Ok(Expr::SimilarTo {
                expr: Box::new(expr),
                pattern: Box::new(pattern),
                negated,
            });
        }

        if negated {
            // `NOT` wasn't part of a predicate after all; push it back by
            // wrapping the remaining comparison in a boolean NOT.
            return Ok(Expr::Not(Box::new(expr)));
        }

        if self.eat_word("IS") {
            let inner_negated = self.eat_word("NOT");
            if self.eat_word("NULL") {
                return Ok(if inner_negated {
                    Expr::IsNotNull(Box::new(expr))
                } else {
                    Expr::IsNull(Box::new(expr))
                });
            }
            if self.eat_word("TRUE") {
                return Ok(if inner_negated {
                    Expr::IsNotTrue(Box::new(expr))
                } else {
                    Expr::IsTrue(Box::new(expr))
                });
            }
            if self.eat_word("FALSE") {
                return Ok(if inner_negated {
                    Expr::IsNotFalse(Box::new(expr))
                } else {
                    Expr::IsFalse(Box::new(expr))
                });
            }
            return Err(EngineError::new(
                ErrorKind::UnsupportedSyntax,
                "expected NULL/TRUE/FALSE after IS",
            ));
        }

        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Token::Op(o) => match o.as_str() {
                "=" => Some(ComparisonOperator::Eq),
                "<>" | "!=" => Some(ComparisonOperator::NotEq),
                "<" => Some(ComparisonOperator::Lt),
                "<=" => Some(ComparisonOperator::LtEq),
                ">" => Some(ComparisonOperator::Gt),
                ">=" => Some(ComparisonOperator::GtEq),
                _ => None,
            },
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Op(o) if o == "+" => Some(BinaryOperator::Plus),
                Token::Op(o) if o == "-" => Some(BinaryOperator::Minus),
                Token::Op(o) if o == "||" => Some(BinaryOperator::StringConcat),
                _ => None,
            };
            let Some(op) = op else { break };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Op(o) if o == "*" => Some(BinaryOperator::Multiply),
                Token::Op(o) if o == "/" => Some(BinaryOperator::Divide),
                Token::Op(o) if o == "%" => Some(BinaryOperator::Modulo),
                _ => None,
            };
            let Some(op) = op else { break };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat_op("-") {
            return Ok(Expr::UnaryMinus(Box::new(self.parse_unary()?)));
        }
        if self.eat_op("+") {
            return self.parse_unary();
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek(), Token::LeftBracket) {
                self.advance();
                let key = self.parse_expr()?;
                self.expect(Token::RightBracket)?;
                expr = Expr::MapAccess {
                    expr: Box::new(expr),
                    key: Box::new(key),
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            Token::SingleQuotedString(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::SingleQuotedString(s)))
            }
            Token::Placeholder => {
                self.advance();
                let idx = self.next_placeholder;
                self.next_placeholder += 1;
                Ok(Expr::Placeholder(idx))
            }
            Token::At => {
                self.advance();
                let name = self.parse_ident_word()?;
                Ok(Expr::SessionVariable {
                    name,
                    double_at: false,
                })
            }
            Token::AtAt => {
                self.advance();
                let name = self.parse_ident_word()?;
                Ok(Expr::SessionVariable {
                    name,
                    double_at: true,
                })
            }
            Token::LeftParen => {
                self.advance();
                if self.is_word("SELECT") {
                    let q = self.parse_query()?;
                    self.expect(Token::RightParen)?;
                    return Ok(Expr::Subquery(Box::new(q)));
                }
                let first = self.parse_expr()?;
                if matches!(self.peek(), Token::Comma) {
                    let mut items = vec![first];
                    while matches!(self.peek(), Token::Comma) {
                        self.advance();
                        items.push(self.parse_expr()?);
                    }
                    self.expect(Token::RightParen)?;
                    return Ok(Expr::Tuple(items));
                }
                self.expect(Token::RightParen)?;
                Ok(Expr::Nested(Box::new(first)))
            }
            Token::Op(o) if o == "*" => {
                self.advance();
                Ok(Expr::Wildcard)
            }
            Token::Word(w) => self.parse_word_primary(w),
            other => Err(EngineError::new(
                ErrorKind::UnsupportedSyntax,
                format!("unexpected token in expression: {other:?}"),
            )),
        }
    }

    fn parse_word_primary(&mut self, word: String) -> Result<Expr> {
        let upper = word.to_ascii_uppercase();

        match upper.as_str() {
            "TRUE" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Boolean(true)));
            }
            "FALSE" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Boolean(false)));
            }
            "NULL" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Null));
            }
            "CAST" | "TRY_CAST" | "SAFE_CAST" => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let expr = self.parse_expr()?;
                self.expect_word("AS")?;
                let data_type = self.parse_ident_word()?;
                self.expect(Token::RightParen)?;
                let kind = match upper.as_str() {
                    "TRY_CAST" => CastKind::TryCast,
                    "SAFE_CAST" => CastKind::SafeCast,
                    _ => CastKind::Cast,
                };
                return Ok(Expr::Cast {
                    expr: Box::new(expr),
                    data_type,
                    kind,
                });
            }
            "EXTRACT" => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let field = self.parse_ident_word()?;
                self.expect_word("FROM")?;
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                return Ok(Expr::Extract {
                    field,
                    expr: Box::new(expr),
                });
            }
            _ => {}
        }

        self.advance();
        let mut parts = vec![word];
        while matches!(self.peek(), Token::Period) {
            self.advance();
            parts.push(self.parse_ident_word()?);
        }

        if matches!(self.peek(), Token::LeftParen) && parts.len() == 1 {
            self.advance();
            let distinct = self.eat_word("DISTINCT");
            let mut args = Vec::new();
            if !matches!(self.peek(), Token::RightParen) {
                args.push(self.parse_function_arg()?);
                while matches!(self.peek(), Token::Comma) {
                    self.advance();
                    args.push(self.parse_function_arg()?);
                }
            }
            self.expect(Token::RightParen)?;
            return Ok(Expr::Function {
                name: parts.remove(0),
                args,
                distinct,
            });
        }

        if parts.len() == 1 {
            Ok(Expr::Ident {
                source: None,
                column: parts.remove(0),
            })
        } else {
            let column = parts.pop().unwrap();
            let source = parts.pop();
            Ok(Expr::Ident { source, column })
        }
    }
}

/// Words that should not be swallowed as an implicit alias because they
/// introduce the next clause.
fn is_reserved_after_expr(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "FROM"
            | "WHERE"
            | "GROUP"
            | "HAVING"
            | "ORDER"
            | "LIMIT"
            | "OFFSET"
            | "JOIN"
            | "INNER"
            | "LEFT"
            | "RIGHT"
            | "FULL"
            | "CROSS"
            | "NATURAL"
            | "ON"
            | "USING"
            | "AND"
            | "OR"
            | "XOR"
            | "AS"
            | "UNION"
            | "INTERSECT"
            | "EXCEPT"
            | "FOR"
    )
}
