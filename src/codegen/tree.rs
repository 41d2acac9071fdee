//! Lisp-like tree shared by every pass
//!
//! Ingest produces a `Node` tree in prefix form; each later pass consumes a
//! borrowed tree and builds a new one, so every intermediate stage stays
//! available for inspection. The only mutable state threaded through the
//! passes is the [`NameGen`] owned by one compilation.

use std::collections::HashSet;
use std::fmt;

// ============================================================================
// Atoms
// ============================================================================

/// Literal constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::None => write!(f, "None"),
        }
    }
}

/// Binary operators, named after the host operator classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl BinOp {
    pub const ALL: [BinOp; 12] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mult,
        BinOp::Div,
        BinOp::FloorDiv,
        BinOp::Mod,
        BinOp::Eq,
        BinOp::NotEq,
        BinOp::Lt,
        BinOp::LtE,
        BinOp::Gt,
        BinOp::GtE,
    ];

    /// Operators evaluated directly by the CPS pass instead of going through a call.
    pub fn is_primitive(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Eq)
    }

    /// Name of the runtime function implementing a non-primitive operator.
    pub fn name(self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Sub",
            BinOp::Mult => "Mult",
            BinOp::Div => "Div",
            BinOp::FloorDiv => "FloorDiv",
            BinOp::Mod => "Mod",
            BinOp::Eq => "Eq",
            BinOp::NotEq => "NotEq",
            BinOp::Lt => "Lt",
            BinOp::LtE => "LtE",
            BinOp::Gt => "Gt",
            BinOp::GtE => "GtE",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A node of the Lisp-like tree.
///
/// `Prim` only appears after the CPS pass; `Return` only before return
/// elimination. `Function::locals` is empty until the CPS pass fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Identifier reference
    Var(String),
    /// Raw literal atom
    Lit(Literal),
    /// Operator used in callee position
    Op(BinOp),
    /// Literal constant expression
    Constant(Literal),
    Begin(Vec<Node>),
    Assign {
        target: String,
        value: Box<Node>,
    },
    If {
        test: Box<Node>,
        then: Box<Node>,
        orelse: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Function {
        params: Vec<String>,
        locals: Vec<String>,
        body: Vec<Node>,
    },
    Return(Box<Node>),
    /// Direct application of a primitive operator to two values
    Prim {
        op: BinOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

impl Node {
    pub fn var(name: impl Into<String>) -> Node {
        Node::Var(name.into())
    }

    pub fn assign(target: impl Into<String>, value: Node) -> Node {
        Node::Assign {
            target: target.into(),
            value: Box::new(value),
        }
    }

    pub fn if_(test: Node, then: Node, orelse: Node) -> Node {
        Node::If {
            test: Box::new(test),
            then: Box::new(then),
            orelse: Box::new(orelse),
        }
    }

    pub fn call(callee: Node, args: Vec<Node>) -> Node {
        Node::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// A function without declared locals
    pub fn lambda(params: Vec<String>, body: Vec<Node>) -> Node {
        Node::Function {
            params,
            locals: Vec::new(),
            body,
        }
    }

    /// True for `Var`, `Lit` and `Op`
    pub fn is_atom(&self) -> bool {
        matches!(self, Node::Var(_) | Node::Lit(_) | Node::Op(_))
    }

    /// Tag of the node, as written in its s-expression form
    pub fn tag(&self) -> &'static str {
        match self {
            Node::Var(_) => "Var",
            Node::Lit(_) => "Lit",
            Node::Op(_) => "Op",
            Node::Constant(_) => "Constant",
            Node::Begin(_) => "Begin",
            Node::Assign { .. } => "Assign",
            Node::If { .. } => "If",
            Node::Call { .. } => "Call",
            Node::Function { .. } => "Function",
            Node::Return(_) => "Return",
            Node::Prim { .. } => "Prim",
        }
    }

    /// Visit this node and all of its descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        match self {
            Node::Var(_) | Node::Lit(_) | Node::Op(_) | Node::Constant(_) => {}
            Node::Begin(exprs) => exprs.iter().for_each(|e| e.walk(visit)),
            Node::Assign { value, .. } => value.walk(visit),
            Node::If { test, then, orelse } => {
                test.walk(visit);
                then.walk(visit);
                orelse.walk(visit);
            }
            Node::Call { callee, args } => {
                callee.walk(visit);
                args.iter().for_each(|a| a.walk(visit));
            }
            Node::Function { body, .. } => body.iter().for_each(|e| e.walk(visit)),
            Node::Return(expr) => expr.walk(visit),
            Node::Prim { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Var(name) => f.write_str(name),
            Node::Lit(lit) => write!(f, "{}", lit),
            Node::Op(op) => write!(f, "{}", op),
            Node::Constant(lit) => write!(f, "(Constant {})", lit),
            Node::Begin(exprs) => {
                f.write_str("(Begin")?;
                write_list(f, exprs)?;
                f.write_str(")")
            }
            Node::Assign { target, value } => write!(f, "(Assign {} {})", target, value),
            Node::If { test, then, orelse } => write!(f, "(If {} {} {})", test, then, orelse),
            Node::Call { callee, args } => {
                write!(f, "(Call {}", callee)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Node::Function {
                params,
                locals,
                body,
            } => {
                write!(f, "(Function ({})", params.join(" "))?;
                if !locals.is_empty() {
                    write!(f, " (locals {})", locals.join(" "))?;
                }
                write_list(f, body)?;
                f.write_str(")")
            }
            Node::Return(expr) => write!(f, "(Return {})", expr),
            Node::Prim { op, lhs, rhs } => write!(f, "(Prim {} {} {})", op, lhs, rhs),
        }
    }
}

/// Names assigned in `body`, in order of first assignment.
///
/// Nested function bodies are a separate scope and are not entered; the
/// name a function is assigned to does count.
pub fn assigned_names(body: &[Node]) -> Vec<String> {
    fn collect(node: &Node, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        match node {
            Node::Assign { target, value } => {
                if seen.insert(target.clone()) {
                    out.push(target.clone());
                }
                collect(value, seen, out);
            }
            Node::Begin(exprs) => exprs.iter().for_each(|e| collect(e, seen, out)),
            Node::If { test, then, orelse } => {
                collect(test, seen, out);
                collect(then, seen, out);
                collect(orelse, seen, out);
            }
            Node::Call { callee, args } => {
                collect(callee, seen, out);
                args.iter().for_each(|a| collect(a, seen, out));
            }
            Node::Return(expr) => collect(expr, seen, out),
            Node::Prim { lhs, rhs, .. } => {
                collect(lhs, seen, out);
                collect(rhs, seen, out);
            }
            Node::Function { .. }
            | Node::Var(_)
            | Node::Lit(_)
            | Node::Op(_)
            | Node::Constant(_) => {}
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for node in body {
        collect(node, &mut seen, &mut out);
    }
    out
}

/// Every identifier the tree mentions: references, assignment targets and
/// parameters.
pub fn identifiers(node: &Node) -> HashSet<String> {
    let mut names = HashSet::new();
    node.walk(&mut |n| match n {
        Node::Var(name) | Node::Assign { target: name, .. } => {
            names.insert(name.clone());
        }
        Node::Function { params, locals, .. } => {
            names.extend(params.iter().cloned());
            names.extend(locals.iter().cloned());
        }
        _ => {}
    });
    names
}

// ============================================================================
// CPS program
// ============================================================================

/// Output of the CPS pass: the program computation plus what the emitters
/// need to declare and start it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpsProgram {
    /// Names assigned at top level
    pub globals: Vec<String>,
    /// Continuation-accepting computation for the whole program
    pub entry: Node,
    /// Name of the continuation the entry is applied to
    pub continuation: String,
}

impl fmt::Display for CpsProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.globals.is_empty() {
            writeln!(f, "(globals {})", self.globals.join(" "))?;
        }
        write!(f, "(Call {} {})", self.entry, self.continuation)
    }
}

// ============================================================================
// Fresh names
// ============================================================================

/// Fresh-name generator owned by one compilation.
///
/// A single counter serves every hint, so `t1`, `k2`, `v3` are all distinct.
/// Source identifiers registered with [`NameGen::reserve`] are never handed out.
#[derive(Debug, Clone, Default)]
pub struct NameGen {
    next: u32,
    reserved: HashSet<String>,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark names that must never be generated.
    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
    }

    pub fn fresh(&mut self, hint: &str) -> String {
        loop {
            self.next += 1;
            let name = format!("{}{}", hint, self.next);
            if !self.reserved.contains(&name) {
                log::trace!("fresh name {}", name);
                return name;
            }
        }
    }

    /// Number of names handed out or skipped so far
    pub fn counter(&self) -> u32 {
        self.next
    }
}
