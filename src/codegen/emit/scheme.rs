//! Scheme emitter
//!
//! ```scheme
//! (define x '())
//! ((lambda (k1) ...) display)
//! ```

use super::{escape_string, Renderer};
use crate::codegen::error::CompileResult;
use crate::codegen::tree::{BinOp, CpsProgram, Literal, Node};

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemeRenderer;

impl SchemeRenderer {
    fn literal(lit: &Literal) -> String {
        match lit {
            Literal::Int(n) => n.to_string(),
            Literal::Bool(true) => "#t".into(),
            Literal::Bool(false) => "#f".into(),
            Literal::Str(s) => format!("\"{}\"", escape_string(s)),
            Literal::None => "'()".into(),
        }
    }

    fn primitive(op: BinOp) -> Option<&'static str> {
        match op {
            BinOp::Add => Some("+"),
            BinOp::Sub => Some("-"),
            BinOp::Eq => Some("equal?"),
            _ => None,
        }
    }
}

impl Renderer for SchemeRenderer {
    fn name(&self) -> &'static str {
        "scheme"
    }

    fn render_node(&self, node: &Node) -> CompileResult<String> {
        match node {
            Node::Var(name) => Ok(name.clone()),
            Node::Lit(lit) => Ok(Self::literal(lit)),
            Node::Op(op) => Ok(op.name().to_string()),

            Node::Function {
                params,
                locals,
                body,
            } => {
                let body = self.render_all(body)?.join(" ");
                if locals.is_empty() {
                    Ok(format!("(lambda ({}) {})", params.join(" "), body))
                } else {
                    let bindings: Vec<String> =
                        locals.iter().map(|l| format!("({} '())", l)).collect();
                    Ok(format!(
                        "(lambda ({}) (let ({}) {}))",
                        params.join(" "),
                        bindings.join(" "),
                        body
                    ))
                }
            }

            Node::Assign { target, value } => {
                Ok(format!("(set! {} {})", target, self.render_node(value)?))
            }

            // Only `#f` is false in Scheme; the source language also treats
            // `0`, `None` and `""` as false.
            Node::If { test, then, orelse } => Ok(format!(
                "(if (not (member {} '(#f 0 () \"\"))) {} {})",
                self.render_node(test)?,
                self.render_node(then)?,
                self.render_node(orelse)?
            )),

            Node::Call { callee, args } => {
                let mut parts = vec![self.render_node(callee)?];
                parts.extend(self.render_all(args)?);
                Ok(format!("({})", parts.join(" ")))
            }

            Node::Prim { op, lhs, rhs } => {
                let Some(op) = Self::primitive(*op) else {
                    return Err(self.mismatch(node));
                };
                Ok(format!(
                    "({} {} {})",
                    op,
                    self.render_node(lhs)?,
                    self.render_node(rhs)?
                ))
            }

            Node::Begin(_) | Node::Constant(_) | Node::Return(_) => Err(self.mismatch(node)),
        }
    }

    fn render_program(&self, program: &CpsProgram) -> CompileResult<String> {
        let mut out = String::new();
        for global in &program.globals {
            out.push_str(&format!("(define {} '())\n", global));
        }
        out.push_str(&format!(
            "({} {})\n",
            self.render_node(&program.entry)?,
            program.continuation
        ));
        Ok(out)
    }
}
