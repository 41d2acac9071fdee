//! Host syntax tree produced by the front-end parser
//!
//! The tree mirrors the shape of the Python-like source closely and accepts
//! more than the compiler supports; `codegen::ingest` decides what is
//! accepted and reports everything else with the node's span.

pub use crate::codegen::tree::Literal;

pub type Ident = String;

/// Source location for error reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Human-readable source position (1-indexed line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    /// Counted in characters, not bytes
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line:column positions.
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: String,
    /// Byte offset of the start of each line
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|&(_, c)| c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source: source.to_string(),
            line_starts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Convert a byte offset to a 1-indexed position
    pub fn position(&self, byte_offset: usize) -> Position {
        let offset = byte_offset.min(self.source.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self.source[line_start..offset].chars().count() + 1;
        Position {
            line: line_idx + 1,
            column,
        }
    }

    /// Text of a 1-indexed line, without the line terminator
    pub fn line(&self, line_num: usize) -> Option<&str> {
        if line_num == 0 || line_num > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line_num - 1];
        let end = self
            .line_starts
            .get(line_num)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }
}

/// A node paired with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    USub,
    UAdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

// ============================================================================
// Expressions
// ============================================================================

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(Ident),
    Constant(Literal),
    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    /// `left op1 c1 op2 c2 ...`
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Lambda {
        params: Vec<Param>,
        body: Box<Expr>,
    },
}

impl ExprKind {
    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            ExprKind::Name(_) => "name",
            ExprKind::Constant(_) => "constant",
            ExprKind::BinOp { .. } => "binary operation",
            ExprKind::UnaryOp { .. } => "unary operation",
            ExprKind::BoolOp { .. } => "boolean operation",
            ExprKind::Compare { .. } => "comparison",
            ExprKind::Call { .. } => "call",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::List(_) => "list",
            ExprKind::Lambda { .. } => "lambda",
        }
    }
}

/// Function parameter, optionally with a default value
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

pub type Stmt = Spanned<StmtKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    FunctionDef {
        name: Ident,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    /// `t1 = t2 = ... = value`
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        op: Operator,
        value: Expr,
    },
    Return(Option<Expr>),
    Expr(Expr),
    /// `elif` chains nest as a single `If` in `orelse`
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Pass,
    Break,
    Continue,
}

impl StmtKind {
    pub fn describe(&self) -> &'static str {
        match self {
            StmtKind::FunctionDef { .. } => "function definition",
            StmtKind::Assign { .. } => "assignment",
            StmtKind::AugAssign { .. } => "augmented assignment",
            StmtKind::Return(_) => "return",
            StmtKind::Expr(_) => "expression statement",
            StmtKind::If { .. } => "if statement",
            StmtKind::While { .. } => "while loop",
            StmtKind::For { .. } => "for loop",
            StmtKind::Pass => "pass statement",
            StmtKind::Break => "break statement",
            StmtKind::Continue => "continue statement",
        }
    }
}

/// A parsed source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_map_positions() {
        let map = SourceMap::new("x = 1\ny = 2\n");
        assert_eq!(map.position(0), Position { line: 1, column: 1 });
        assert_eq!(map.position(6), Position { line: 2, column: 1 });
        assert_eq!(map.position(10), Position { line: 2, column: 5 });
        assert_eq!(map.line(2), Some("y = 2"));
        assert_eq!(map.line(4), None);
    }

    #[test]
    fn span_merge() {
        let a = Span::new(3, 5);
        let b = Span::new(1, 4);
        assert_eq!(a.merge(&b), Span::new(1, 5));
    }
}
