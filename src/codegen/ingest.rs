//! Host syntax tree → Lisp-like tree
//!
//! Only the shapes listed below are accepted; anything else is reported as
//! [`CompileError::UnsupportedConstruct`] with the span of the offending
//! node. There is no best-effort mode.
//!
//! | host node                  | result                                        |
//! |----------------------------|-----------------------------------------------|
//! | module                     | `(Begin stmt ...)`                            |
//! | `def f(a, b): body`        | `(Assign f (Function (a b) (Begin body...)))` |
//! | `x = e`                    | `(Assign x e)`                                |
//! | `return e` / `return`      | `(Return e)` / `(Return (Constant None))`     |
//! | expression statement       | the expression                                |
//! | `if p: a else: b`          | `(If p (Begin a...) (Begin b...))`            |
//! | `f(a, b)`                  | `(Call f a b)`                                |
//! | `a + b`, `a == b`          | `(Call Add a b)`, `(Call Eq a b)`             |
//! | name / constant            | `x` / `(Constant 1)`                          |

use crate::ast::{CmpOp, Expr, ExprKind, Module, Operator, Span, Stmt, StmtKind};

use super::error::{CompileError, CompileResult};
use super::tree::{BinOp, Literal, Node};

const PASS: &str = "ingest";

/// Convert a parsed module into a `Begin` of its top-level statements.
pub fn ingest(module: &Module) -> CompileResult<Node> {
    ingest_reserving(module, &[])
}

/// Like [`ingest`], but also refuses to bind any name in `reserved`.
///
/// Operator names (`Mult`, `Lt`, ...) are always reserved: the emitted code
/// calls runtime functions by those names.
pub fn ingest_reserving(module: &Module, reserved: &[&str]) -> CompileResult<Node> {
    let body = stmts(&module.body)?;
    check_binders(&module.body, reserved)?;
    Ok(Node::Begin(body))
}

fn check_binders(body: &[Stmt], reserved: &[&str]) -> CompileResult<()> {
    let check = |name: &str, span: &Span| {
        let is_operator = BinOp::ALL.iter().any(|op| op.name() == name);
        if is_operator || reserved.contains(&name) {
            Err(unsupported(format!("binding of reserved name `{}`", name), span))
        } else {
            Ok(())
        }
    };

    for stmt in body {
        match &stmt.node {
            StmtKind::FunctionDef { name, params, body } => {
                check(name, &stmt.span)?;
                for param in params {
                    check(&param.name, &param.span)?;
                }
                check_binders(body, reserved)?;
            }
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    if let ExprKind::Name(name) = &target.node {
                        check(name, &target.span)?;
                    }
                }
            }
            StmtKind::If { body, orelse, .. } => {
                check_binders(body, reserved)?;
                check_binders(orelse, reserved)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn unsupported(what: impl Into<String>, span: &Span) -> CompileError {
    CompileError::UnsupportedConstruct {
        pass: PASS,
        construct: what.into(),
        span: Some(span.clone()),
    }
}

fn stmts(body: &[Stmt]) -> CompileResult<Vec<Node>> {
    body.iter().map(stmt).collect()
}

fn stmt(stmt: &Stmt) -> CompileResult<Node> {
    match &stmt.node {
        StmtKind::FunctionDef { name, params, body } => {
            if let Some(param) = params.iter().find(|p| p.default.is_some()) {
                return Err(unsupported(
                    format!("default value for parameter `{}`", param.name),
                    &param.span,
                ));
            }
            let params = params.iter().map(|p| p.name.clone()).collect();
            let body = Node::Begin(stmts(body)?);
            Ok(Node::assign(name.clone(), Node::lambda(params, vec![body])))
        }

        StmtKind::Assign { targets, value } => match targets.as_slice() {
            [Expr {
                node: ExprKind::Name(target),
                ..
            }] => Ok(Node::assign(target.clone(), expr(value)?)),
            [single] => Err(unsupported(
                format!("assignment to {}", single.node.describe()),
                &single.span,
            )),
            _ => Err(unsupported("chained assignment", &stmt.span)),
        },

        StmtKind::Return(value) => {
            let value = match value {
                Some(e) => expr(e)?,
                None => Node::Constant(Literal::None),
            };
            Ok(Node::Return(Box::new(value)))
        }

        StmtKind::Expr(e) => expr(e),

        StmtKind::If { test, body, orelse } => {
            if orelse.is_empty() {
                return Err(unsupported("if statement without else", &stmt.span));
            }
            Ok(Node::if_(
                expr(test)?,
                Node::Begin(stmts(body)?),
                Node::Begin(stmts(orelse)?),
            ))
        }

        StmtKind::AugAssign { .. }
        | StmtKind::While { .. }
        | StmtKind::For { .. }
        | StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue => Err(unsupported(stmt.node.describe(), &stmt.span)),
    }
}

fn expr(e: &Expr) -> CompileResult<Node> {
    match &e.node {
        ExprKind::Name(name) => Ok(Node::var(name.clone())),
        ExprKind::Constant(lit) => Ok(Node::Constant(lit.clone())),

        ExprKind::BinOp { left, op, right } => Ok(Node::call(
            Node::Op(arith_op(*op)),
            vec![expr(left)?, expr(right)?],
        )),

        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => match (ops.as_slice(), comparators.as_slice()) {
            ([op], [right]) => Ok(Node::call(
                Node::Op(cmp_op(*op)),
                vec![expr(left)?, expr(right)?],
            )),
            _ => Err(unsupported("chained comparison", &e.span)),
        },

        ExprKind::Call { func, args } => {
            let callee = expr(func)?;
            let args = args.iter().map(expr).collect::<CompileResult<Vec<_>>>()?;
            Ok(Node::call(callee, args))
        }

        ExprKind::UnaryOp { .. }
        | ExprKind::BoolOp { .. }
        | ExprKind::Tuple(_)
        | ExprKind::List(_)
        | ExprKind::Lambda { .. } => Err(unsupported(e.node.describe(), &e.span)),
    }
}

fn arith_op(op: Operator) -> BinOp {
    match op {
        Operator::Add => BinOp::Add,
        Operator::Sub => BinOp::Sub,
        Operator::Mult => BinOp::Mult,
        Operator::Div => BinOp::Div,
        Operator::FloorDiv => BinOp::FloorDiv,
        Operator::Mod => BinOp::Mod,
    }
}

fn cmp_op(op: CmpOp) -> BinOp {
    match op {
        CmpOp::Eq => BinOp::Eq,
        CmpOp::NotEq => BinOp::NotEq,
        CmpOp::Lt => BinOp::Lt,
        CmpOp::LtE => BinOp::LtE,
        CmpOp::Gt => BinOp::Gt,
        CmpOp::GtE => BinOp::GtE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn ingest_str(src: &str) -> CompileResult<Node> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let module = Parser::new(tokens).parse_module().unwrap();
        ingest(&module)
    }

    #[test]
    fn test_function_definition() {
        let node = ingest_str("def f(a, b):\n    return a + b\n").unwrap();
        assert_eq!(
            node.to_string(),
            "(Begin (Assign f (Function (a b) (Begin (Return (Call Add a b))))))"
        );
    }

    #[test]
    fn test_if_branches_are_wrapped() {
        let node = ingest_str("if n == 0:\n    x = 1\nelse:\n    x = n\n").unwrap();
        assert_eq!(
            node.to_string(),
            "(Begin (If (Call Eq n (Constant 0)) \
             (Begin (Assign x (Constant 1))) (Begin (Assign x n))))"
        );
    }

    #[test]
    fn test_bare_return() {
        let node = ingest_str("def f():\n    return\n").unwrap();
        assert_eq!(
            node.to_string(),
            "(Begin (Assign f (Function () (Begin (Return (Constant None))))))"
        );
    }

    #[test]
    fn test_rejections_carry_spans() {
        let err = ingest_str("x = 1\nwhile x:\n    x = 2\n").unwrap_err();
        assert!(matches!(
            &err,
            CompileError::UnsupportedConstruct { pass: "ingest", construct, .. }
                if construct == "while loop"
        ));
        assert_eq!(err.span().map(|s| s.start), Some(6));

        let err = ingest_str("f(not x)").unwrap_err();
        assert_eq!(err.span(), Some(&Span::new(2, 7)));

        let err = ingest_str("if a:\n    b\n").unwrap_err();
        assert!(err.to_string().contains("if statement without else"));

        let err = ingest_str("x = a < b < c").unwrap_err();
        assert!(err.to_string().contains("chained comparison"));

        let err = ingest_str("a, b = c").unwrap_err();
        assert!(err.to_string().contains("assignment to tuple"));
    }

    #[test]
    fn test_operator_names_cannot_be_bound() {
        let err = ingest_str("Mult = 5\nx = 2 * 3\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ingest: unsupported construct: binding of reserved name `Mult`"
        );
        assert_eq!(err.span(), Some(&Span::new(0, 4)));

        assert!(ingest_str("def Lt(a, b):\n    return a\n").is_err());
        assert!(ingest_str("def f(Mod):\n    return Mod\n").is_err());
        assert!(ingest_str("if a:\n    x = 1\nelse:\n    GtE = 2\n").is_err());

        // Reading an operator name is fine; only binding it is refused.
        assert!(ingest_str("x = Mult\n").is_ok());
    }

    #[test]
    fn test_extra_reserved_names() {
        let tokens = Lexer::new("display = 1\n").tokenize().unwrap();
        let module = Parser::new(tokens).parse_module().unwrap();
        assert!(ingest(&module).is_ok());
        let err = ingest_reserving(&module, &["display"]).unwrap_err();
        assert!(err.to_string().contains("binding of reserved name `display`"));
    }
}
