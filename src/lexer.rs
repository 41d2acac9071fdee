//! Handwritten indentation-aware lexer
//!
//! Produces synthetic `Newline`, `Indent` and `Dedent` tokens the way the
//! host language's tokenizer does. Newlines inside brackets are ignored.

use crate::ast::Span;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Str(String),
    True,
    False,
    None,

    Ident(String),

    // Keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Pass,
    Break,
    Continue,
    And,
    Or,
    Not,
    Lambda,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,

    // Operators
    Assign,      // =
    EqEq,        // ==
    NotEq,       // !=
    Lt,          // <
    LtE,         // <=
    Gt,          // >
    GtE,         // >=
    Plus,        // +
    Minus,       // -
    Star,        // *
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %
    PlusEq,      // +=
    MinusEq,     // -=

    // Layout
    Newline,
    Indent,
    Dedent,

    Eof,
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character: {0:?}")]
    UnexpectedChar(char, Span),
    #[error("unterminated string")]
    UnterminatedString(Span),
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(char, Span),
    #[error("invalid number: {0}")]
    InvalidNumber(String, Span),
    #[error("unindent does not match any outer indentation level")]
    InconsistentDedent(Span),
}

impl LexError {
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedChar(_, span)
            | LexError::UnterminatedString(span)
            | LexError::InvalidEscape(_, span)
            | LexError::InvalidNumber(_, span)
            | LexError::InconsistentDedent(span) => span,
        }
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    pos: usize,
    /// Open indentation widths; the bottom entry is always 0
    indents: Vec<usize>,
    /// Bracket nesting depth
    depth: usize,
    tokens: Vec<SpannedToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            pos: 0,
            indents: vec![0],
            depth: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, LexError> {
        while self.start_line()? {
            self.lex_line()?;
        }

        let end = Span::new(self.pos, self.pos);
        if self
            .tokens
            .last()
            .map_or(false, |t| t.token != Token::Newline)
        {
            self.push(Token::Newline, end.clone());
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Token::Dedent, end.clone());
        }
        self.push(Token::Eof, end);
        Ok(self.tokens)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn push(&mut self, token: Token, span: Span) {
        self.tokens.push(SpannedToken { token, span });
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Measure the indentation of the next non-blank line and emit layout
    /// tokens for it. Returns false at end of input.
    fn start_line(&mut self) -> Result<bool, LexError> {
        loop {
            let line_start = self.pos;
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' | '\t' => width += 1,
                    '\r' => {}
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                None => return Ok(false),
                Some('\n') => {
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                Some(_) => {
                    self.indent_to(width, Span::new(line_start, self.pos))?;
                    return Ok(true);
                }
            }
        }
    }

    fn indent_to(&mut self, width: usize, span: Span) -> Result<(), LexError> {
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(Token::Indent, span);
        } else if width < current {
            while self.indents.last().map_or(false, |&top| top > width) {
                self.indents.pop();
                self.push(Token::Dedent, span.clone());
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(LexError::InconsistentDedent(span));
            }
        }
        Ok(())
    }

    /// Lex tokens up to and including the end of a logical line
    fn lex_line(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                None => return Ok(()),
                Some('\n') => {
                    let start = self.pos;
                    self.advance();
                    if self.depth == 0 {
                        self.push(Token::Newline, Span::new(start, self.pos));
                        return Ok(());
                    }
                }
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                Some(_) => {
                    let tok = self.next_token()?;
                    self.tokens.push(tok);
                }
            }
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        let start = self.pos;
        let Some(c) = self.advance() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                span: Span::new(start, start),
            });
        };

        let token = match c {
            '(' => {
                self.depth += 1;
                Token::LParen
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RParen
            }
            '[' => {
                self.depth += 1;
                Token::LBracket
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RBracket
            }
            ',' => Token::Comma,
            ':' => Token::Colon,
            '=' => self.followed_by('=', Token::EqEq, Token::Assign),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::NotEq
                } else {
                    return Err(LexError::UnexpectedChar('!', Span::new(start, self.pos)));
                }
            }
            '<' => self.followed_by('=', Token::LtE, Token::Lt),
            '>' => self.followed_by('=', Token::GtE, Token::Gt),
            '+' => self.followed_by('=', Token::PlusEq, Token::Plus),
            '-' => self.followed_by('=', Token::MinusEq, Token::Minus),
            '*' => Token::Star,
            '/' => self.followed_by('/', Token::DoubleSlash, Token::Slash),
            '%' => Token::Percent,
            '"' | '\'' => self.lex_string(c, start)?,
            c if c.is_ascii_digit() => self.lex_number(c, start)?,
            c if c.is_alphabetic() || c == '_' => self.lex_ident(c),
            _ => return Err(LexError::UnexpectedChar(c, Span::new(start, self.pos))),
        };

        Ok(SpannedToken {
            token,
            span: Span::new(start, self.pos),
        })
    }

    fn followed_by(&mut self, next: char, yes: Token, no: Token) -> Token {
        if self.peek() == Some(next) {
            self.advance();
            yes
        } else {
            no
        }
    }

    fn lex_string(&mut self, quote: char, start: usize) -> Result<Token, LexError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some(c) => {
                            return Err(LexError::InvalidEscape(c, Span::new(start, self.pos)))
                        }
                        None => {
                            return Err(LexError::UnterminatedString(Span::new(start, self.pos)))
                        }
                    };
                    s.push(escaped);
                }
                Some('\n') | None => {
                    return Err(LexError::UnterminatedString(Span::new(start, self.pos)))
                }
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn lex_number(&mut self, first: char, start: usize) -> Result<Token, LexError> {
        let mut s = String::new();
        s.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
                if c != '_' {
                    s.push(c);
                }
            } else {
                break;
            }
        }
        let n: i64 = s
            .parse()
            .map_err(|_| LexError::InvalidNumber(s.clone(), Span::new(start, self.pos)))?;
        Ok(Token::Int(n))
    }

    fn lex_ident(&mut self, first: char) -> Token {
        let mut s = String::new();
        s.push(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match s.as_str() {
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None,
            "def" => Token::Def,
            "return" => Token::Return,
            "if" => Token::If,
            "elif" => Token::Elif,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "in" => Token::In,
            "pass" => Token::Pass,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "lambda" => Token::Lambda,
            _ => Token::Ident(s),
        }
    }
}
