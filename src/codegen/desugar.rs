//! Normalization passes between ingest and CPS conversion
//!
//! Each pass is a total rewrite: it borrows the previous tree and builds a
//! new one. Run in [`PIPELINE`] order they establish what the CPS pass
//! relies on:
//!
//! 1. no `Return` nodes remain
//! 2. every `If` test is a bare variable
//! 3. every `Call` argument is a variable, and the callee is an atom
//! 4. no `Begin` is an immediate child of another `Begin`

use super::tree::{NameGen, Node};

/// A normalization pass, in the order the compiler runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    DropReturn,
    HoistIfPredicates,
    FlattenCallArguments,
    FlattenBegin,
}

pub const PIPELINE: [Pass; 4] = [
    Pass::DropReturn,
    Pass::HoistIfPredicates,
    Pass::FlattenCallArguments,
    Pass::FlattenBegin,
];

impl Pass {
    pub fn name(self) -> &'static str {
        match self {
            Pass::DropReturn => "drop-return",
            Pass::HoistIfPredicates => "hoist-if-predicates",
            Pass::FlattenCallArguments => "flatten-call-arguments",
            Pass::FlattenBegin => "flatten-begin",
        }
    }

    pub fn run(self, node: &Node, names: &mut NameGen) -> Node {
        match self {
            Pass::DropReturn => drop_return(node),
            Pass::HoistIfPredicates => hoist_if_predicates(node, names),
            Pass::FlattenCallArguments => flatten_call_arguments(node, names),
            Pass::FlattenBegin => flatten_begin(node),
        }
    }
}

/// Rebuild `node` with `f` applied to each direct child.
fn map_children(node: &Node, mut f: impl FnMut(&Node) -> Node) -> Node {
    match node {
        Node::Var(_) | Node::Lit(_) | Node::Op(_) | Node::Constant(_) => node.clone(),
        Node::Begin(exprs) => Node::Begin(exprs.iter().map(f).collect()),
        Node::Assign { target, value } => Node::assign(target.clone(), f(value)),
        Node::If { test, then, orelse } => {
            let test = f(test);
            let then = f(then);
            let orelse = f(orelse);
            Node::if_(test, then, orelse)
        }
        Node::Call { callee, args } => {
            let callee = f(callee);
            Node::call(callee, args.iter().map(f).collect())
        }
        Node::Function {
            params,
            locals,
            body,
        } => Node::Function {
            params: params.clone(),
            locals: locals.clone(),
            body: body.iter().map(f).collect(),
        },
        Node::Return(expr) => Node::Return(Box::new(f(expr))),
        Node::Prim { op, lhs, rhs } => {
            let lhs = f(lhs);
            let rhs = f(rhs);
            Node::Prim {
                op: *op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }
    }
}

// ============================================================================
// Return elimination
// ============================================================================

/// Replace every `(Return e)` with `e`.
///
/// Only a single return as the last statement of a body is meaningful; a
/// return anywhere else is still rewritten, but the statements after it
/// keep running, so it is reported with a warning.
pub fn drop_return(node: &Node) -> Node {
    match node {
        Node::Return(expr) => drop_return(expr),
        Node::Begin(exprs) => {
            let last = exprs.len().saturating_sub(1);
            for (i, expr) in exprs.iter().enumerate() {
                if i != last && matches!(expr, Node::Return(_)) {
                    log::warn!("return is not the last statement of its body: {}", expr);
                }
            }
            Node::Begin(exprs.iter().map(drop_return).collect())
        }
        _ => map_children(node, drop_return),
    }
}

// ============================================================================
// If-predicate hoisting
// ============================================================================

/// `(If p a b)` → `(Begin (Assign t p) (If t a' b'))` with a fresh `t`.
pub fn hoist_if_predicates(node: &Node, names: &mut NameGen) -> Node {
    match node {
        Node::If { test, then, orelse } => {
            let t = names.fresh("t");
            let test = hoist_if_predicates(test, names);
            let then = hoist_if_predicates(then, names);
            let orelse = hoist_if_predicates(orelse, names);
            Node::Begin(vec![
                Node::assign(t.clone(), test),
                Node::if_(Node::Var(t), then, orelse),
            ])
        }
        _ => map_children(node, |child| hoist_if_predicates(child, names)),
    }
}

// ============================================================================
// Call-argument flattening
// ============================================================================

/// `(Call f a b)` → `(Begin (Assign t1 a') (Assign t2 b') (Call f t1 t2))`.
///
/// Every argument gets a temporary, atoms included, so argument evaluation
/// order is spelled out left to right. A callee that is not an atom is
/// evaluated into a temporary before the arguments.
pub fn flatten_call_arguments(node: &Node, names: &mut NameGen) -> Node {
    match node {
        Node::Call { callee, args } => {
            let mut stmts = Vec::with_capacity(args.len() + 2);

            let callee = if callee.is_atom() {
                callee.as_ref().clone()
            } else {
                let f = names.fresh("t");
                let value = flatten_call_arguments(callee, names);
                stmts.push(Node::assign(f.clone(), value));
                Node::Var(f)
            };

            let temps: Vec<String> = args.iter().map(|_| names.fresh("t")).collect();
            for (t, arg) in temps.iter().zip(args) {
                let value = flatten_call_arguments(arg, names);
                stmts.push(Node::assign(t.clone(), value));
            }

            stmts.push(Node::call(callee, temps.into_iter().map(Node::Var).collect()));
            Node::Begin(stmts)
        }
        _ => map_children(node, |child| flatten_call_arguments(child, names)),
    }
}

// ============================================================================
// Begin flattening
// ============================================================================

/// Splice every `Begin` that is an immediate child of another `Begin`.
pub fn flatten_begin(node: &Node) -> Node {
    match node {
        Node::Begin(exprs) => {
            let mut out = Vec::with_capacity(exprs.len());
            for expr in exprs {
                match flatten_begin(expr) {
                    Node::Begin(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            Node::Begin(out)
        }
        _ => map_children(node, flatten_begin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::tree::{BinOp, Literal};

    fn c(n: i64) -> Node {
        Node::Constant(Literal::Int(n))
    }

    #[test]
    fn drop_return_unwraps_nested_returns() {
        let tree = Node::Begin(vec![Node::assign(
            "f",
            Node::lambda(
                vec!["a".into()],
                vec![Node::Begin(vec![Node::Return(Box::new(Node::var("a")))])],
            ),
        )]);
        assert_eq!(
            drop_return(&tree).to_string(),
            "(Begin (Assign f (Function (a) (Begin a))))"
        );
    }

    #[test]
    fn hoisting_allocates_before_recursing() {
        let mut names = NameGen::new();
        let inner = Node::if_(Node::var("q"), Node::Begin(vec![c(1)]), Node::Begin(vec![c(2)]));
        let tree = Node::if_(Node::var("p"), Node::Begin(vec![inner]), Node::Begin(vec![c(3)]));
        assert_eq!(
            hoist_if_predicates(&tree, &mut names).to_string(),
            "(Begin (Assign t1 p) \
             (If t1 (Begin (Begin (Assign t2 q) \
             (If t2 (Begin (Constant 1)) (Begin (Constant 2))))) \
             (Begin (Constant 3))))"
        );
    }

    #[test]
    fn flattening_names_arguments_left_to_right() {
        let mut names = NameGen::new();
        let tree = Node::call(
            Node::var("f"),
            vec![
                Node::call(Node::Op(BinOp::Add), vec![Node::var("a"), c(1)]),
                Node::var("b"),
            ],
        );
        assert_eq!(
            flatten_call_arguments(&tree, &mut names).to_string(),
            "(Begin (Assign t1 (Begin (Assign t3 a) (Assign t4 (Constant 1)) (Call Add t3 t4))) \
             (Assign t2 b) (Call f t1 t2))"
        );
    }

    #[test]
    fn non_atomic_callee_is_evaluated_first() {
        let mut names = NameGen::new();
        let tree = Node::call(Node::call(Node::var("g"), vec![]), vec![Node::var("x")]);
        assert_eq!(
            flatten_call_arguments(&tree, &mut names).to_string(),
            "(Begin (Assign t1 (Begin (Call g))) (Assign t2 x) (Call t1 t2))"
        );
    }

    #[test]
    fn flatten_begin_splices_and_is_idempotent() {
        let tree = Node::Begin(vec![
            Node::Begin(vec![c(1), Node::Begin(vec![c(2)])]),
            Node::assign("x", Node::Begin(vec![Node::Begin(vec![c(3)])])),
        ]);
        let once = flatten_begin(&tree);
        assert_eq!(
            once.to_string(),
            "(Begin (Constant 1) (Constant 2) (Assign x (Begin (Constant 3))))"
        );
        assert_eq!(flatten_begin(&once), once);
    }
}
