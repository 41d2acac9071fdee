//! Fancyfly compiler backend: host AST → Lisp-like tree → CPS → text
//!
//! Pipeline:
//! 1. Ingest the host syntax tree into the prefix `Node` form
//! 2. Drop tail returns
//! 3. Hoist `if` predicates into fresh temporaries
//! 4. Flatten call arguments into fresh temporaries
//! 5. Flatten nested `Begin` sequences
//! 6. CPS transformation
//! 7. Emit Scheme or JavaScript text

pub mod cps_transform;
pub mod desugar;
pub mod emit;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod tree;

pub use cps_transform::{cps_transform, CpsTransformer};
pub use desugar::{
    drop_return, flatten_begin, flatten_call_arguments, hoist_if_predicates, Pass, PIPELINE,
};
pub use emit::{JsRenderer, Renderer, SchemeRenderer};
pub use error::{CompileError, CompileResult};
pub use ingest::ingest;
pub use pipeline::{
    compile_source, parse_source, CompileOptions, Compiler, ConfigError, SourceError, Stages,
    Target, CONTINUATION_VAR, TARGET_VAR,
};
pub use tree::{assigned_names, identifiers, BinOp, CpsProgram, Literal, NameGen, Node};
