//! Recursive descent parser for the Python-like source language
//!
//! # Module Structure
//!
//! - `cursor` - Token stream navigation and lookahead
//! - `error` - Error types with source location tracking
//!
//! The parser accepts more than the compiler supports (loops, `pass`,
//! chained comparisons, tuples, ...). Rejecting those is left to
//! `codegen::ingest`, which can name the construct and point at it.

pub mod cursor;
pub mod error;

pub use cursor::TokenCursor;
pub use error::{ParseError, ParseResult};

use crate::ast::*;
use crate::lexer::{SpannedToken, Token};

pub struct Parser {
    cursor: TokenCursor,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
        }
    }

    /// Parse a whole source file
    pub fn parse_module(&mut self) -> ParseResult<Module> {
        let mut body = Vec::new();
        while !self.cursor.is_at_end() {
            if self.cursor.match_token(&Token::Newline) {
                continue;
            }
            body.push(self.parse_stmt()?);
        }
        Ok(Module { body })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.cursor.peek() {
            Token::Def => self.parse_def(),
            Token::If => {
                let start = self.cursor.current_span();
                self.cursor.advance();
                self.parse_if_rest(start)
            }
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.end_of_line()?;
                Ok(stmt)
            }
        }
    }

    fn end_of_line(&mut self) -> ParseResult<()> {
        if self.cursor.match_token(&Token::Newline) || self.cursor.is_at_end() {
            Ok(())
        } else {
            Err(self.cursor.unexpected("end of line"))
        }
    }

    fn parse_simple_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.peek() {
            Token::Return => {
                self.cursor.advance();
                if self.cursor.is_expr_start() {
                    StmtKind::Return(Some(self.parse_expr_list()?))
                } else {
                    StmtKind::Return(None)
                }
            }
            Token::Pass => {
                self.cursor.advance();
                StmtKind::Pass
            }
            Token::Break => {
                self.cursor.advance();
                StmtKind::Break
            }
            Token::Continue => {
                self.cursor.advance();
                StmtKind::Continue
            }
            _ => self.parse_expr_stmt()?,
        };
        Ok(Stmt::new(kind, self.cursor.span_from(&start)))
    }

    fn parse_expr_stmt(&mut self) -> ParseResult<StmtKind> {
        let first = self.parse_expr_list()?;

        let aug_op = match self.cursor.peek() {
            Token::PlusEq => Some(Operator::Add),
            Token::MinusEq => Some(Operator::Sub),
            _ => None,
        };
        if let Some(op) = aug_op {
            self.cursor.advance();
            check_target(&first)?;
            let value = self.parse_expr_list()?;
            return Ok(StmtKind::AugAssign {
                target: first,
                op,
                value,
            });
        }

        if !self.cursor.check(&Token::Assign) {
            return Ok(StmtKind::Expr(first));
        }

        // `a = b = value`: every expression but the last is a target
        let mut exprs = vec![first];
        while self.cursor.match_token(&Token::Assign) {
            exprs.push(self.parse_expr_list()?);
        }
        let value = exprs.pop().ok_or_else(|| self.cursor.unexpected("expression"))?;
        for target in &exprs {
            check_target(target)?;
        }
        Ok(StmtKind::Assign {
            targets: exprs,
            value,
        })
    }

    fn parse_def(&mut self) -> ParseResult<Stmt> {
        let start = self.cursor.consume(Token::Def, "'def'")?.span;
        let name = self.cursor.consume_ident("function name")?;
        self.cursor.consume(Token::LParen, "'('")?;
        let params = self.parse_params(&Token::RParen)?;
        self.cursor.consume(Token::RParen, "')'")?;
        self.cursor.consume(Token::Colon, "':'")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::FunctionDef { name, params, body },
            self.cursor.span_from(&start),
        ))
    }

    /// Comma-separated parameters up to (not including) `close`
    fn parse_params(&mut self, close: &Token) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.cursor.check(close) {
            let start = self.cursor.current_span();
            let name = self.cursor.consume_ident("parameter name")?;
            let default = if self.cursor.match_token(&Token::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                span: self.cursor.span_from(&start),
            });
            if !self.cursor.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    /// Parse the rest of an `if`/`elif` after its keyword
    fn parse_if_rest(&mut self, start: Span) -> ParseResult<Stmt> {
        let test = self.parse_expr()?;
        self.cursor.consume(Token::Colon, "':'")?;
        let body = self.parse_block()?;

        let orelse = match self.cursor.peek() {
            Token::Elif => {
                let elif_start = self.cursor.advance().span;
                vec![self.parse_if_rest(elif_start)?]
            }
            Token::Else => {
                self.cursor.advance();
                self.cursor.consume(Token::Colon, "':'")?;
                self.parse_block()?
            }
            _ => Vec::new(),
        };

        Ok(Stmt::new(
            StmtKind::If { test, body, orelse },
            self.cursor.span_from(&start),
        ))
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.cursor.consume(Token::While, "'while'")?.span;
        let test = self.parse_expr()?;
        self.cursor.consume(Token::Colon, "':'")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::While { test, body },
            self.cursor.span_from(&start),
        ))
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.cursor.consume(Token::For, "'for'")?.span;
        let target = self.parse_expr_list()?;
        check_target(&target)?;
        self.cursor.consume(Token::In, "'in'")?;
        let iter = self.parse_expr_list()?;
        self.cursor.consume(Token::Colon, "':'")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::For { target, iter, body },
            self.cursor.span_from(&start),
        ))
    }

    /// An indented block, or a single simple statement on the same line
    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        if !self.cursor.match_token(&Token::Newline) {
            let stmt = self.parse_simple_stmt()?;
            self.end_of_line()?;
            return Ok(vec![stmt]);
        }

        self.cursor.consume(Token::Indent, "indented block")?;
        let mut body = Vec::new();
        while !self.cursor.match_token(&Token::Dedent) {
            if self.cursor.is_at_end() {
                return Err(self.cursor.unexpected("end of block"));
            }
            body.push(self.parse_stmt()?);
        }
        Ok(body)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// `expr (, expr)*`, a tuple when a comma is present
    pub fn parse_expr_list(&mut self) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let first = self.parse_expr()?;
        if !self.cursor.check(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.cursor.match_token(&Token::Comma) {
            if !self.cursor.is_expr_start() {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), self.cursor.span_from(&start)))
    }

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        if self.cursor.check(&Token::Lambda) {
            let start = self.cursor.advance().span;
            let params = self.parse_params(&Token::Colon)?;
            self.cursor.consume(Token::Colon, "':'")?;
            let body = self.parse_expr()?;
            return Ok(Expr::new(
                ExprKind::Lambda {
                    params,
                    body: Box::new(body),
                },
                self.cursor.span_from(&start),
            ));
        }
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.parse_bool_op(Token::Or, BoolOp::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.parse_bool_op(Token::And, BoolOp::And, Self::parse_not)
    }

    fn parse_bool_op(
        &mut self,
        token: Token,
        op: BoolOp,
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let first = operand(self)?;
        if !self.cursor.check(&token) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.cursor.match_token(&token) {
            values.push(operand(self)?);
        }
        Ok(Expr::new(
            ExprKind::BoolOp { op, values },
            self.cursor.span_from(&start),
        ))
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.cursor.check(&Token::Not) {
            let start = self.cursor.advance().span;
            let operand = self.parse_not()?;
            return Ok(Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                self.cursor.span_from(&start),
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let left = self.parse_arith()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = cmp_op(self.cursor.peek()) {
            self.cursor.advance();
            ops.push(op);
            comparators.push(self.parse_arith()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            self.cursor.span_from(&start),
        ))
    }

    fn parse_arith(&mut self) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let mut left = self.parse_term()?;
        loop {
            let op = match self.cursor.peek() {
                Token::Plus => Operator::Add,
                Token::Minus => Operator::Sub,
                _ => return Ok(left),
            };
            self.cursor.advance();
            let right = self.parse_term()?;
            left = binop(left, op, right, self.cursor.span_from(&start));
        }
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.cursor.peek() {
                Token::Star => Operator::Mult,
                Token::Slash => Operator::Div,
                Token::DoubleSlash => Operator::FloorDiv,
                Token::Percent => Operator::Mod,
                _ => return Ok(left),
            };
            self.cursor.advance();
            let right = self.parse_factor()?;
            left = binop(left, op, right, self.cursor.span_from(&start));
        }
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let op = match self.cursor.peek() {
            Token::Minus => UnaryOp::USub,
            Token::Plus => UnaryOp::UAdd,
            _ => return self.parse_postfix(),
        };
        let start = self.cursor.advance().span;

        // Negative integer literals are folded into a single constant
        if op == UnaryOp::USub {
            if let Token::Int(n) = self.cursor.peek() {
                let n = *n;
                self.cursor.advance();
                return Ok(Expr::new(
                    ExprKind::Constant(Literal::Int(-n)),
                    self.cursor.span_from(&start),
                ));
            }
        }

        let operand = self.parse_factor()?;
        Ok(Expr::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            self.cursor.span_from(&start),
        ))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let mut expr = self.parse_atom()?;
        while self.cursor.match_token(&Token::LParen) {
            let mut args = Vec::new();
            while !self.cursor.check(&Token::RParen) {
                args.push(self.parse_expr()?);
                if !self.cursor.match_token(&Token::Comma) {
                    break;
                }
            }
            self.cursor.consume(Token::RParen, "')'")?;
            expr = Expr::new(
                ExprKind::Call {
                    func: Box::new(expr),
                    args,
                },
                self.cursor.span_from(&start),
            );
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.peek().clone() {
            Token::Int(n) => ExprKind::Constant(Literal::Int(n)),
            Token::Str(s) => ExprKind::Constant(Literal::Str(s)),
            Token::True => ExprKind::Constant(Literal::Bool(true)),
            Token::False => ExprKind::Constant(Literal::Bool(false)),
            Token::None => ExprKind::Constant(Literal::None),
            Token::Ident(name) => ExprKind::Name(name),
            Token::LParen => {
                self.cursor.advance();
                if self.cursor.match_token(&Token::RParen) {
                    return Ok(Expr::new(
                        ExprKind::Tuple(Vec::new()),
                        self.cursor.span_from(&start),
                    ));
                }
                let inner = self.parse_expr_list()?;
                self.cursor.consume(Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => {
                self.cursor.advance();
                let mut items = Vec::new();
                while !self.cursor.check(&Token::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.cursor.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.cursor.consume(Token::RBracket, "']'")?;
                return Ok(Expr::new(
                    ExprKind::List(items),
                    self.cursor.span_from(&start),
                ));
            }
            _ => return Err(self.cursor.unexpected("expression")),
        };
        self.cursor.advance();
        Ok(Expr::new(kind, self.cursor.span_from(&start)))
    }
}

fn cmp_op(token: &Token) -> Option<CmpOp> {
    match token {
        Token::EqEq => Some(CmpOp::Eq),
        Token::NotEq => Some(CmpOp::NotEq),
        Token::Lt => Some(CmpOp::Lt),
        Token::LtE => Some(CmpOp::LtE),
        Token::Gt => Some(CmpOp::Gt),
        Token::GtE => Some(CmpOp::GtE),
        _ => None,
    }
}

fn binop(left: Expr, op: Operator, right: Expr, span: Span) -> Expr {
    Expr::new(
        ExprKind::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

/// Only names, tuples and lists of targets can be assigned to
fn check_target(expr: &Expr) -> ParseResult<()> {
    match &expr.node {
        ExprKind::Name(_) => Ok(()),
        ExprKind::Tuple(items) | ExprKind::List(items) => items.iter().try_for_each(check_target),
        other => Err(ParseError::InvalidTarget {
            what: other.describe(),
            span: expr.span.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(input: &str) -> Module {
        let tokens = Lexer::new(input).tokenize().unwrap();
        Parser::new(tokens).parse_module().unwrap()
    }

    #[test]
    fn test_precedence() {
        let module = parse("x = 1 + 2 * 3");
        let StmtKind::Assign { value, .. } = &module.body[0].node else {
            panic!("expected assignment");
        };
        let ExprKind::BinOp { op, right, .. } = &value.node else {
            panic!("expected binop");
        };
        assert_eq!(*op, Operator::Add);
        assert!(matches!(right.node, ExprKind::BinOp { op: Operator::Mult, .. }));
    }

    #[test]
    fn test_elif_nests() {
        let module = parse("if a:\n    x\nelif b:\n    y\nelse:\n    z\n");
        let StmtKind::If { orelse, .. } = &module.body[0].node else {
            panic!("expected if");
        };
        assert_eq!(orelse.len(), 1);
        assert!(matches!(&orelse[0].node, StmtKind::If { orelse, .. } if orelse.len() == 1));
    }

    #[test]
    fn test_negative_literal_folds() {
        let module = parse("f(-3)");
        let StmtKind::Expr(call) = &module.body[0].node else {
            panic!("expected expression statement");
        };
        let ExprKind::Call { args, .. } = &call.node else {
            panic!("expected call");
        };
        assert_eq!(args[0].node, ExprKind::Constant(Literal::Int(-3)));
    }

    #[test]
    fn test_statement_span() {
        let module = parse("\nfoo = bar(1)\n");
        assert_eq!(module.body[0].span, Span::new(1, 13));
    }

    #[test]
    fn test_invalid_target() {
        let tokens = Lexer::new("f(x) = 1").tokenize().unwrap();
        let err = Parser::new(tokens).parse_module().unwrap_err();
        assert!(matches!(err, ParseError::InvalidTarget { what: "call", .. }));
    }
}
