//! Text emitters for CPS programs
//!
//! Each output syntax implements [`Renderer`]. Renderers are stateless and
//! only understand the CPS vocabulary: `Var`, `Lit`, `Op`, `Assign`, `If`,
//! `Call`, `Function` and `Prim`. A `Begin`, `Constant` or `Return` reaching
//! an emitter means an earlier pass was skipped, and is reported as
//! [`CompileError::EmitterMismatch`] rather than stringified.

pub mod javascript;
pub mod scheme;

pub use javascript::JsRenderer;
pub use scheme::SchemeRenderer;

use super::error::{CompileError, CompileResult};
use super::tree::{CpsProgram, Node};

/// Renders the final CPS tree in one concrete syntax.
pub trait Renderer {
    /// Target name used in diagnostics
    fn name(&self) -> &'static str;

    fn render_node(&self, node: &Node) -> CompileResult<String>;

    /// Render declarations for the program's globals followed by the entry
    /// computation applied to the top-level continuation.
    fn render_program(&self, program: &CpsProgram) -> CompileResult<String>;

    fn mismatch(&self, node: &Node) -> CompileError {
        CompileError::EmitterMismatch {
            target: self.name(),
            node: node.to_string(),
        }
    }

    fn render_all(&self, nodes: &[Node]) -> CompileResult<Vec<String>> {
        nodes.iter().map(|n| self.render_node(n)).collect()
    }
}

/// Escape a string literal body for a double-quoted target string
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c => result.push(c),
        }
    }
    result
}
