//! Test support infrastructure for the Fancyfly compiler pipeline.
//!
//! This module provides tools for:
//! - Inspecting intermediate pipeline stages (ingested tree, each pass, CPS)
//! - Compiling straight to text for snapshot tests
//! - Running CPS programs directly with [`CpsMachine`]
//!
//! # Philosophy
//! Emitted text is only checked for shape; what a program *means* is checked
//! by evaluating the CPS tree itself. The machine applies functions in a loop
//! instead of recursing, so it has proper tail calls just like the targets
//! the generated code is meant for, and deep recursion in the source program
//! does not grow the Rust stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::codegen::{
    parse_source, BinOp, CompileOptions, Compiler, CpsProgram, Literal, Node, Stages, Target,
};

// ============================================================================
// Pipeline Inspection
// ============================================================================

/// Parse and lower a program, returning every intermediate stage
pub fn lower_source(input: &str) -> Result<Stages, String> {
    let module = parse_source(input).map_err(|e| format!("Parse error: {}", e))?;
    Compiler::new(CompileOptions::default())
        .lower(&module)
        .map_err(|e| format!("Compile error: {}", e))
}

/// Compile a program to text for `target`
pub fn compile(input: &str, target: Target) -> Result<String, String> {
    crate::codegen::compile_source(input, &CompileOptions::new(target)).map_err(|e| e.to_string())
}

/// Lower and run a program, returning its result and the machine holding its
/// globals.
pub fn run_source(input: &str) -> Result<(Value, CpsMachine), String> {
    let stages = lower_source(input)?;
    let mut machine = CpsMachine::new();
    let value = machine
        .run(&stages.cps)
        .map_err(|e| format!("Runtime error: {}", e))?;
    Ok((value, machine))
}

// ============================================================================
// Values
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound variable: {0}")]
    UnboundVariable(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("cannot evaluate {0}")]
    Unsupported(String),
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
}

pub struct Closure {
    params: Vec<String>,
    locals: Vec<String>,
    body: Vec<Node>,
    scope: Scope,
}

/// Runtime value of the CPS machine
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
    Closure(Rc<Closure>),
    /// Continuation that stops the machine with its argument
    Halt,
    /// Runtime implementation of a non-primitive operator
    Operator(BinOp),
}

impl Value {
    fn from_literal(lit: &Literal) -> Value {
        match lit {
            Literal::Int(n) => Value::Int(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::None => Value::None,
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::None => false,
            Value::Closure(_) | Value::Halt | Value::Operator(_) => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Halt, Value::Halt) => true,
            (Value::Operator(a), Value::Operator(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::None => write!(f, "None"),
            Value::Closure(c) => write!(f, "<closure/{}>", c.params.len()),
            Value::Halt => write!(f, "<halt>"),
            Value::Operator(op) => write!(f, "<operator {}>", op),
        }
    }
}

// ============================================================================
// Scopes
// ============================================================================

#[derive(Clone, Default)]
struct Scope(Rc<ScopeInner>);

#[derive(Default)]
struct ScopeInner {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Scope>,
}

impl Scope {
    fn child(&self) -> Scope {
        Scope(Rc::new(ScopeInner {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    fn define(&self, name: &str, value: Value) {
        self.0.vars.borrow_mut().insert(name.to_string(), value);
    }

    fn contains(&self, name: &str) -> bool {
        self.0.vars.borrow().contains_key(name)
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = self.0.vars.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.0.parent {
            Some(parent) => parent.lookup(name),
            None => Err(EvalError::UnboundVariable(name.to_string())),
        }
    }

    /// Update the innermost declaration of `name`
    fn set(&self, name: &str, value: Value) -> Result<(), EvalError> {
        if let Some(slot) = self.0.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.0.parent {
            Some(parent) => parent.set(name, value),
            None => Err(EvalError::UnboundVariable(name.to_string())),
        }
    }
}

// ============================================================================
// Machine
// ============================================================================

/// What a function body does once its statements have run
enum Tail {
    Done(Value),
    Apply(Value, Vec<Value>),
}

/// Direct evaluator for CPS programs.
///
/// Variables hold computations, so reading a program variable means applying
/// it to a continuation; [`CpsMachine::force`] does that with a halting
/// continuation.
pub struct CpsMachine {
    globals: Scope,
    steps: usize,
    step_limit: usize,
}

impl Default for CpsMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CpsMachine {
    pub fn new() -> Self {
        Self {
            globals: Scope::default(),
            steps: 0,
            step_limit: 10_000_000,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Number of function applications performed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Bind a global to the computation producing `lit`, as an assignment
    /// would.
    pub fn bind_literal(&mut self, name: &str, lit: Literal) {
        let thunk = Closure {
            params: vec!["k".into()],
            locals: Vec::new(),
            body: vec![Node::call(Node::var("k"), vec![Node::Lit(lit)])],
            scope: self.globals.clone(),
        };
        self.globals.define(name, Value::Closure(Rc::new(thunk)));
    }

    /// Run the program's entry with a halting continuation.
    ///
    /// Globals already bound with [`CpsMachine::bind_literal`] keep their
    /// value; the others start out as `None`.
    pub fn run(&mut self, program: &CpsProgram) -> Result<Value, EvalError> {
        for global in &program.globals {
            if !self.globals.contains(global) {
                self.globals.define(global, Value::None);
            }
        }
        let scope = self.globals.clone();
        let entry = self.eval(&program.entry, &scope)?;
        self.apply(entry, vec![Value::Halt])
    }

    /// Value of the computation held by global `name`
    pub fn force(&mut self, name: &str) -> Result<Value, EvalError> {
        let computation = self.globals.lookup(name)?;
        self.force_value(computation)
    }

    fn force_value(&mut self, computation: Value) -> Result<Value, EvalError> {
        self.apply(computation, vec![Value::Halt])
    }

    fn apply(&mut self, mut func: Value, mut args: Vec<Value>) -> Result<Value, EvalError> {
        loop {
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(EvalError::StepLimit(self.step_limit));
            }

            let tail = match &func {
                Value::Closure(closure) => {
                    if closure.params.len() != args.len() {
                        return Err(EvalError::ArityMismatch {
                            expected: closure.params.len(),
                            got: args.len(),
                        });
                    }
                    let scope = closure.scope.child();
                    for (param, arg) in closure.params.iter().zip(args.drain(..)) {
                        scope.define(param, arg);
                    }
                    for local in &closure.locals {
                        scope.define(local, Value::None);
                    }
                    self.exec_body(&closure.body, &scope)?
                }

                Value::Halt => {
                    return match (args.len(), args.pop()) {
                        (1, Some(value)) => Ok(value),
                        (got, _) => Err(EvalError::ArityMismatch { expected: 1, got }),
                    };
                }

                Value::Operator(op) => {
                    let [k, lhs, rhs]: [Value; 3] =
                        std::mem::take(&mut args).try_into().map_err(|a: Vec<Value>| {
                            EvalError::ArityMismatch {
                                expected: 3,
                                got: a.len(),
                            }
                        })?;
                    let lhs = self.force_value(lhs)?;
                    let rhs = self.force_value(rhs)?;
                    Tail::Apply(k, vec![binary(*op, lhs, rhs)?])
                }

                other => {
                    return Err(EvalError::TypeError(format!(
                        "{:?} is not a function",
                        other
                    )))
                }
            };

            match tail {
                Tail::Done(value) => return Ok(value),
                Tail::Apply(next, next_args) => {
                    func = next;
                    args = next_args;
                }
            }
        }
    }

    fn exec_body(&mut self, body: &[Node], scope: &Scope) -> Result<Tail, EvalError> {
        let Some((last, init)) = body.split_last() else {
            return Ok(Tail::Done(Value::None));
        };
        for stmt in init {
            match stmt {
                Node::Assign { target, value } => {
                    let value = self.eval(value, scope)?;
                    scope.set(target, value)?;
                }
                other => return Err(EvalError::Unsupported(format!("non-tail {}", other))),
            }
        }
        self.exec_tail(last, scope)
    }

    fn exec_tail(&mut self, node: &Node, scope: &Scope) -> Result<Tail, EvalError> {
        match node {
            Node::Call { callee, args } => {
                let func = self.eval(callee, scope)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Tail::Apply(func, args))
            }
            Node::If { test, then, orelse } => {
                let branch = if self.eval(test, scope)?.truthy() {
                    then
                } else {
                    orelse
                };
                self.exec_tail(branch, scope)
            }
            other => Ok(Tail::Done(self.eval(other, scope)?)),
        }
    }

    fn eval(&mut self, node: &Node, scope: &Scope) -> Result<Value, EvalError> {
        match node {
            Node::Var(name) => scope.lookup(name),
            Node::Lit(lit) => Ok(Value::from_literal(lit)),
            Node::Op(op) => Ok(Value::Operator(*op)),
            Node::Function {
                params,
                locals,
                body,
            } => Ok(Value::Closure(Rc::new(Closure {
                params: params.clone(),
                locals: locals.clone(),
                body: body.clone(),
                scope: scope.clone(),
            }))),
            Node::Prim { op, lhs, rhs } => {
                let lhs = self.eval(lhs, scope)?;
                let rhs = self.eval(rhs, scope)?;
                binary(*op, lhs, rhs)
            }
            other => Err(EvalError::Unsupported(other.to_string())),
        }
    }
}

/// Apply a binary operator with Python semantics for integers. Results
/// outside `i64` wrap.
fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (op, &lhs, &rhs) {
        (BinOp::Eq, _, _) => Ok(Value::Bool(lhs == rhs)),
        (BinOp::NotEq, _, _) => Ok(Value::Bool(lhs != rhs)),
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (_, Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinOp::Add => Ok(Value::Int(a.wrapping_add(b))),
                BinOp::Sub => Ok(Value::Int(a.wrapping_sub(b))),
                BinOp::Mult => Ok(Value::Int(a.wrapping_mul(b))),
                BinOp::FloorDiv | BinOp::Mod if b == 0 => Err(EvalError::DivisionByZero),
                BinOp::FloorDiv => {
                    let q = a.wrapping_div(b);
                    let adjust = a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0));
                    Ok(Value::Int(if adjust { q - 1 } else { q }))
                }
                BinOp::Mod => {
                    let r = a.wrapping_rem(b);
                    let adjust = r != 0 && ((r < 0) != (b < 0));
                    Ok(Value::Int(if adjust { r + b } else { r }))
                }
                BinOp::Lt => Ok(Value::Bool(a < b)),
                BinOp::LtE => Ok(Value::Bool(a <= b)),
                BinOp::Gt => Ok(Value::Bool(a > b)),
                BinOp::GtE => Ok(Value::Bool(a >= b)),
                BinOp::Eq => Ok(Value::Bool(a == b)),
                BinOp::NotEq => Ok(Value::Bool(a != b)),
                BinOp::Div => Err(EvalError::Unsupported("true division".into())),
            }
        }
        _ => Err(EvalError::TypeError(format!(
            "unsupported operands for {}: {:?} and {:?}",
            op, lhs, rhs
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_division_semantics() {
        assert_eq!(binary(BinOp::FloorDiv, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-4)));
        assert_eq!(binary(BinOp::Mod, Value::Int(-7), Value::Int(2)), Ok(Value::Int(1)));
        assert_eq!(binary(BinOp::Mod, Value::Int(7), Value::Int(-2)), Ok(Value::Int(-1)));
        assert_eq!(
            binary(BinOp::FloorDiv, Value::Int(1), Value::Int(0)),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_division_overflow_wraps() {
        let min = Value::Int(i64::MIN);
        assert_eq!(binary(BinOp::FloorDiv, min.clone(), Value::Int(-1)), Ok(Value::Int(i64::MIN)));
        assert_eq!(binary(BinOp::Mod, min, Value::Int(-1)), Ok(Value::Int(0)));
    }

    #[test]
    fn test_floor_division_of_most_negative_value() {
        let src = "a = -9223372036854775807 - 1\nx = a // -1\ny = a % -1\n";
        let (_, mut machine) = run_source(src).unwrap();
        assert_eq!(machine.force("x"), Ok(Value::Int(i64::MIN)));
        assert_eq!(machine.force("y"), Ok(Value::Int(0)));
    }

    #[test]
    fn test_bind_literal_and_force() {
        let mut machine = CpsMachine::new();
        machine.bind_literal("n", Literal::Int(4));
        assert_eq!(machine.force("n"), Ok(Value::Int(4)));
        assert!(matches!(machine.force("m"), Err(EvalError::UnboundVariable(_))));
    }

    #[test]
    fn test_step_limit() {
        let (_, machine) = run_source("x = 1\n").unwrap();
        assert!(machine.steps() > 0);

        let stages = lower_source("def f(n):\n    return f(n)\nf(1)\n").unwrap();
        let mut machine = CpsMachine::new().with_step_limit(1_000);
        assert_eq!(machine.run(&stages.cps), Err(EvalError::StepLimit(1_000)));
    }
}
