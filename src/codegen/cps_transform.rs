//! CPS Transformation Pass
//!
//! Turns the normalized direct-style tree into continuation-passing style.
//! Every term becomes a computation: a function taking a continuation `k`
//! and calling it with the term's value instead of returning.
//!
//! ## Transformation Rules
//!
//! Variables already hold computations, so `x` stays `x`.
//!
//! 1. Constant:
//!    `(Constant c)` → `(lambda (k) (k c))`
//!
//! 2. Assign: the variable is bound to a computation of the value.
//!    `(Assign x e)` → `(lambda (k) ([[e]] (lambda (v) (set! x (lambda (k2) (k2 v))) (k None))))`
//!
//! 3. Begin: non-final statements get a continuation that drops the value.
//!    `(Begin e1 e2)` → `(lambda (k) ([[e1]] (lambda (v) ([[e2]] k))))`
//!
//! 4. If (test is a variable after hoisting):
//!    `(If t a b)` → `(lambda (k) (t (lambda (v) (if v ([[a]] k) ([[b]] k)))))`
//!
//! 5. Function: the value gains a leading continuation parameter.
//!    `(Function (a) body)` → `(lambda (k) (k (lambda (k2 a) [[body]]_k2)))`
//!
//! 6. Call (arguments are variables after flattening):
//!    - primitive `(Call Add a b)` →
//!      `(lambda (k) (a (lambda (x) (b (lambda (y) (k (Prim Add x y)))))))`
//!    - other operator `(Call Mult a b)` → `(lambda (k) (Mult k a b))`
//!    - `(Call f a b)` → `(lambda (k) (f (lambda (fv) (fv k a b))))`
//!
//! Every binder introduced here comes from the compilation's [`NameGen`], so
//! nested continuations never shadow each other.

use super::error::{CompileError, CompileResult};
use super::tree::{assigned_names, CpsProgram, Literal, NameGen, Node};

const PASS: &str = "cps";

/// CPS transformation context
pub struct CpsTransformer<'a> {
    /// Shared with the earlier passes of the same compilation
    names: &'a mut NameGen,
}

impl<'a> CpsTransformer<'a> {
    pub fn new(names: &'a mut NameGen) -> Self {
        Self { names }
    }

    /// Transform a whole program and record what the emitters need to
    /// start it.
    pub fn transform_program(
        &mut self,
        program: &Node,
        continuation: impl Into<String>,
    ) -> CompileResult<CpsProgram> {
        let globals = match program {
            Node::Begin(exprs) => assigned_names(exprs),
            other => assigned_names(std::slice::from_ref(other)),
        };
        let entry = self.transform(program)?;
        Ok(CpsProgram {
            globals,
            entry,
            continuation: continuation.into(),
        })
    }

    /// Transform one term into a continuation-accepting computation.
    pub fn transform(&mut self, node: &Node) -> CompileResult<Node> {
        match node {
            Node::Var(_) => Ok(node.clone()),

            Node::Constant(lit) | Node::Lit(lit) => {
                let k = self.fresh("k");
                Ok(Node::lambda(
                    vec![k.clone()],
                    vec![Node::call(Node::Var(k), vec![Node::Lit(lit.clone())])],
                ))
            }

            Node::Assign { target, value } => {
                let k = self.fresh("k");
                let value = self.transform(value)?;
                let v = self.fresh("v");
                let k2 = self.fresh("k");
                let thunk = Node::lambda(
                    vec![k2.clone()],
                    vec![Node::call(Node::Var(k2), vec![Node::Var(v.clone())])],
                );
                let then = Node::lambda(
                    vec![v],
                    vec![Node::assign(target.clone(), thunk), return_none(&k)],
                );
                Ok(Node::lambda(vec![k], vec![Node::call(value, vec![then])]))
            }

            Node::Begin(exprs) => {
                let k = self.fresh("k");
                let body = self.sequence(exprs, &k)?;
                Ok(Node::lambda(vec![k], vec![body]))
            }

            Node::If { test, then, orelse } => {
                let Node::Var(test) = test.as_ref() else {
                    return Err(invariant("a variable as if test", test));
                };
                let k = self.fresh("k");
                let v = self.fresh("v");
                let then = self.transform(then)?;
                let orelse = self.transform(orelse)?;
                let branch = Node::if_(
                    Node::Var(v.clone()),
                    Node::call(then, vec![Node::Var(k.clone())]),
                    Node::call(orelse, vec![Node::Var(k.clone())]),
                );
                Ok(Node::lambda(
                    vec![k],
                    vec![Node::call(
                        Node::var(test.clone()),
                        vec![Node::lambda(vec![v], vec![branch])],
                    )],
                ))
            }

            Node::Function { params, body, .. } => {
                let k = self.fresh("k");
                let inner_k = self.fresh("k");
                let locals = assigned_names(body)
                    .into_iter()
                    .filter(|name| !params.contains(name))
                    .collect();
                let stmts = match body.as_slice() {
                    [Node::Begin(exprs)] => exprs.as_slice(),
                    _ => body.as_slice(),
                };
                let body = self.sequence(stmts, &inner_k)?;

                let mut cps_params = Vec::with_capacity(params.len() + 1);
                cps_params.push(inner_k);
                cps_params.extend(params.iter().cloned());
                let function = Node::Function {
                    params: cps_params,
                    locals,
                    body: vec![body],
                };
                Ok(Node::lambda(
                    vec![k.clone()],
                    vec![Node::call(Node::Var(k), vec![function])],
                ))
            }

            Node::Call { callee, args } => self.transform_call(callee, args),

            Node::Op(_) => Err(invariant("an operator only in callee position", node)),
            Node::Return(_) => Err(invariant("no return after return elimination", node)),
            Node::Prim { .. } => Err(invariant("a direct-style term", node)),
        }
    }

    fn transform_call(&mut self, callee: &Node, args: &[Node]) -> CompileResult<Node> {
        if let Some(arg) = args.iter().find(|a| !matches!(a, Node::Var(_))) {
            return Err(invariant("variables as call arguments", arg));
        }

        let k = self.fresh("k");
        let body = match (callee, args) {
            (Node::Op(op), [lhs, rhs]) if op.is_primitive() => {
                let x = self.fresh("x");
                let y = self.fresh("y");
                let result = Node::Prim {
                    op: *op,
                    lhs: Box::new(Node::Var(x.clone())),
                    rhs: Box::new(Node::Var(y.clone())),
                };
                let with_y = Node::lambda(
                    vec![y],
                    vec![Node::call(Node::Var(k.clone()), vec![result])],
                );
                let with_x = Node::lambda(vec![x], vec![Node::call(rhs.clone(), vec![with_y])]);
                Node::call(lhs.clone(), vec![with_x])
            }

            (Node::Op(op), _) => {
                let mut call_args = vec![Node::Var(k.clone())];
                call_args.extend(args.iter().cloned());
                Node::call(Node::Op(*op), call_args)
            }

            (Node::Var(f), _) => {
                let fv = self.fresh("f");
                let mut call_args = vec![Node::Var(k.clone())];
                call_args.extend(args.iter().cloned());
                let apply = Node::lambda(
                    vec![fv.clone()],
                    vec![Node::call(Node::Var(fv), call_args)],
                );
                Node::call(Node::var(f.clone()), vec![apply])
            }

            _ => return Err(invariant("an atomic callee", callee)),
        };
        Ok(Node::lambda(vec![k], vec![body]))
    }

    /// Thread continuation `k` through `exprs`: each non-final statement's
    /// value is discarded, the last one's goes to `k`.
    fn sequence(&mut self, exprs: &[Node], k: &str) -> CompileResult<Node> {
        let Some((last, init)) = exprs.split_last() else {
            return Ok(return_none(k));
        };

        let mut steps = Vec::with_capacity(init.len());
        for expr in init {
            let expr = self.transform(expr)?;
            let v = self.fresh("v");
            steps.push((expr, v));
        }
        let last = self.transform(last)?;

        let mut acc = Node::call(last, vec![Node::var(k)]);
        for (expr, v) in steps.into_iter().rev() {
            acc = Node::call(expr, vec![Node::lambda(vec![v], vec![acc])]);
        }
        Ok(acc)
    }

    fn fresh(&mut self, hint: &str) -> String {
        self.names.fresh(hint)
    }
}

/// `(k None)`
fn return_none(k: &str) -> Node {
    Node::call(Node::var(k), vec![Node::Lit(Literal::None)])
}

fn invariant(expected: &'static str, node: &Node) -> CompileError {
    CompileError::ViolatedPassInvariant {
        pass: PASS,
        expected,
        node: node.to_string(),
    }
}

/// Transform a normalized program with a fresh name generator.
pub fn cps_transform(program: &Node, continuation: &str) -> CompileResult<CpsProgram> {
    let mut names = NameGen::new();
    names.reserve(super::tree::identifiers(program));
    CpsTransformer::new(&mut names).transform_program(program, continuation)
}
