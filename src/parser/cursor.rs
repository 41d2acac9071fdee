//! Token stream cursor with lookahead and span tracking

use crate::ast::Span;
use crate::lexer::{SpannedToken, Token};

use super::error::{ParseError, ParseResult};

/// Token stream cursor providing lookahead and span tracking
pub struct TokenCursor {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ========================================================================
    // Position and lookahead
    // ========================================================================

    /// Get the current token without consuming it
    pub fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    /// Span of the current token
    pub fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span.clone())
            .unwrap_or_default()
    }

    /// Span of the most recently consumed token
    pub fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.clone())
            .unwrap_or_default()
    }

    /// Span from `start` to the end of the last consumed token
    pub fn span_from(&self, start: &Span) -> Span {
        start.merge(&self.previous_span())
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    // ========================================================================
    // Token consumption
    // ========================================================================

    /// Advance to the next token and return the consumed one
    pub fn advance(&mut self) -> SpannedToken {
        let current = self.tokens.get(self.pos).cloned().unwrap_or(SpannedToken {
            token: Token::Eof,
            span: self.current_span(),
        });
        if !self.is_at_end() {
            self.pos += 1;
        }
        current
    }

    pub fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    /// If the current token matches, consume it and return true
    pub fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the expected token or return an error
    pub fn consume(&mut self, expected: Token, what: &str) -> ParseResult<SpannedToken> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Consume an identifier and return its name
    pub fn consume_ident(&mut self, what: &str) -> ParseResult<String> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Create an error for an unexpected token at the current position
    pub fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected(expected, self.peek().clone(), self.current_span())
    }

    // ========================================================================
    // Token predicates
    // ========================================================================

    /// Check if the current token could start an expression
    pub fn is_expr_start(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_)
                | Token::Str(_)
                | Token::True
                | Token::False
                | Token::None
                | Token::Ident(_)
                | Token::LParen
                | Token::LBracket
                | Token::Minus
                | Token::Plus
                | Token::Not
                | Token::Lambda
        )
    }
}
