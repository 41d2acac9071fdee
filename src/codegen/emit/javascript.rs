//! JavaScript emitter
//!
//! Functions become `function (...) { ...; return last; }`, conditionals
//! become ternaries, and locals are declared with a leading `var`.

use super::{escape_string, Renderer};
use crate::codegen::error::{CompileError, CompileResult};
use crate::codegen::tree::{BinOp, CpsProgram, Literal, Node};

/// Words JavaScript does not accept as variable names
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct JsRenderer;

impl JsRenderer {
    fn ident(name: &str) -> CompileResult<&str> {
        if RESERVED_WORDS.contains(&name) {
            return Err(CompileError::UnsupportedConstruct {
                pass: "javascript",
                construct: format!("reserved word `{}` as identifier", name),
                span: None,
            });
        }
        Ok(name)
    }

    fn idents(names: &[String]) -> CompileResult<String> {
        let names = names
            .iter()
            .map(|n| Self::ident(n))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(names.join(", "))
    }

    fn literal(lit: &Literal) -> String {
        match lit {
            Literal::Int(n) => n.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Str(s) => format!("\"{}\"", escape_string(s)),
            Literal::None => "null".into(),
        }
    }

    fn primitive(op: BinOp) -> Option<&'static str> {
        match op {
            BinOp::Add => Some("+"),
            BinOp::Sub => Some("-"),
            BinOp::Eq => Some("==="),
            _ => None,
        }
    }
}

impl Renderer for JsRenderer {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn render_node(&self, node: &Node) -> CompileResult<String> {
        match node {
            Node::Var(name) => Ok(Self::ident(name)?.to_string()),
            Node::Lit(lit) => Ok(Self::literal(lit)),
            Node::Op(op) => Ok(op.name().to_string()),

            Node::Function {
                params,
                locals,
                body,
            } => {
                let mut out = format!("function ({}) {{ ", Self::idents(params)?);
                if !locals.is_empty() {
                    out.push_str(&format!("var {}; ", Self::idents(locals)?));
                }
                let stmts = self.render_all(body)?;
                if let Some((last, init)) = stmts.split_last() {
                    for stmt in init {
                        out.push_str(stmt);
                        out.push_str("; ");
                    }
                    out.push_str(&format!("return {}; ", last));
                }
                out.push('}');
                Ok(out)
            }

            Node::Assign { target, value } => {
                Ok(format!("{} = {}", Self::ident(target)?, self.render_node(value)?))
            }

            Node::If { test, then, orelse } => Ok(format!(
                "({} ? {} : {})",
                self.render_node(test)?,
                self.render_node(then)?,
                self.render_node(orelse)?
            )),

            Node::Call { callee, args } => Ok(format!(
                "({})({})",
                self.render_node(callee)?,
                self.render_all(args)?.join(", ")
            )),

            Node::Prim { op, lhs, rhs } => {
                let Some(op) = Self::primitive(*op) else {
                    return Err(self.mismatch(node));
                };
                Ok(format!(
                    "({} {} {})",
                    self.render_node(lhs)?,
                    op,
                    self.render_node(rhs)?
                ))
            }

            Node::Begin(_) | Node::Constant(_) | Node::Return(_) => Err(self.mismatch(node)),
        }
    }

    fn render_program(&self, program: &CpsProgram) -> CompileResult<String> {
        let mut out = String::new();
        if !program.globals.is_empty() {
            out.push_str(&format!("var {};\n", Self::idents(&program.globals)?));
        }
        out.push_str(&format!(
            "({})({});\n",
            self.render_node(&program.entry)?,
            program.continuation
        ));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_statements() {
        let f = Node::Function {
            params: vec!["v1".into()],
            locals: vec!["a".into(), "b".into()],
            body: vec![
                Node::assign("a", Node::var("v1")),
                Node::call(Node::var("k"), vec![Node::Lit(Literal::None)]),
            ],
        };
        assert_eq!(
            JsRenderer.render_node(&f).unwrap(),
            "function (v1) { var a, b; a = v1; return (k)(null); }"
        );
    }

    #[test]
    fn test_conditional_is_ternary() {
        let node = Node::if_(
            Node::var("v"),
            Node::call(Node::var("a"), vec![Node::var("k")]),
            Node::call(Node::var("b"), vec![Node::var("k")]),
        );
        assert_eq!(JsRenderer.render_node(&node).unwrap(), "(v ? (a)(k) : (b)(k))");
    }

    #[test]
    fn test_reserved_words_are_rejected() {
        let err = JsRenderer.render_node(&Node::var("new")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "javascript: unsupported construct: reserved word `new` as identifier"
        );
        assert!(JsRenderer
            .render_node(&Node::assign("this", Node::var("x")))
            .is_err());
        assert!(JsRenderer.render_node(&Node::lambda(vec!["class".into()], vec![])).is_err());
        assert_eq!(JsRenderer.render_node(&Node::var("newer")).unwrap(), "newer");
    }

    #[test]
    fn test_strict_equality() {
        let node = Node::Prim {
            op: BinOp::Eq,
            lhs: Box::new(Node::var("x")),
            rhs: Box::new(Node::Lit(Literal::Int(0))),
        };
        assert_eq!(JsRenderer.render_node(&node).unwrap(), "(x === 0)");
    }
}
