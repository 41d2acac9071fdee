//! Fancyfly - compiles a small Python-like language to continuation-passing
//! style Scheme or JavaScript

pub mod ast;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod test_support;

pub use ast::{Position, SourceMap, Span};
pub use codegen::{
    compile_source, parse_source, CompileError, CompileOptions, Compiler, CpsProgram, NameGen,
    Node, SourceError, Target,
};
pub use errors::{format_header, format_location, format_snippet, format_source_error, Colors};
pub use lexer::Lexer;
pub use parser::Parser;
