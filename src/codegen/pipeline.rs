//! Compilation driver: source → host tree → normalized tree → CPS → text
//!
//! A [`Compiler`] owns the [`NameGen`] of one compilation run. Build a new
//! compiler per program; reusing one keeps its counter running, which is
//! harmless but makes the output depend on what was compiled before.

use std::str::FromStr;

use thiserror::Error;

use crate::ast::{Module, Span};
use crate::lexer::{LexError, Lexer};
use crate::parser::{ParseError, Parser};

use super::cps_transform::CpsTransformer;
use super::desugar::{Pass, PIPELINE};
use super::emit::{JsRenderer, Renderer, SchemeRenderer};
use super::error::{CompileError, CompileResult};
use super::ingest::ingest_reserving;
use super::tree::{identifiers, CpsProgram, NameGen, Node};

/// Environment variable selecting the output syntax
pub const TARGET_VAR: &str = "FANCYFLY_TARGET";
/// Environment variable overriding the top-level continuation
pub const CONTINUATION_VAR: &str = "FANCYFLY_CONTINUATION";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    #[default]
    Scheme,
    JavaScript,
}

impl Target {
    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            Target::Scheme => Box::new(SchemeRenderer),
            Target::JavaScript => Box::new(JsRenderer),
        }
    }

    /// Continuation the program is started with unless overridden
    pub fn default_continuation(self) -> &'static str {
        match self {
            Target::Scheme => "display",
            Target::JavaScript => "console.log",
        }
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheme" | "scm" => Ok(Target::Scheme),
            "javascript" | "js" => Ok(Target::JavaScript),
            _ => Err(ConfigError::UnknownTarget(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown target `{0}`, expected `scheme` or `javascript`")]
    UnknownTarget(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOptions {
    pub target: Target,
    /// Overrides [`Target::default_continuation`]
    pub continuation: Option<String>,
}

impl CompileOptions {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            continuation: None,
        }
    }

    pub fn with_continuation(mut self, name: impl Into<String>) -> Self {
        self.continuation = Some(name.into());
        self
    }

    /// Read `FANCYFLY_TARGET` and `FANCYFLY_CONTINUATION`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`CompileOptions::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let target = match lookup(TARGET_VAR) {
            Some(value) if !value.trim().is_empty() => value.trim().parse()?,
            _ => Target::default(),
        };
        let continuation = lookup(CONTINUATION_VAR).filter(|c| !c.trim().is_empty());
        Ok(Self {
            target,
            continuation,
        })
    }

    pub fn continuation(&self) -> &str {
        self.continuation
            .as_deref()
            .unwrap_or_else(|| self.target.default_continuation())
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Every intermediate tree of one compilation
#[derive(Debug, Clone)]
pub struct Stages {
    pub ingested: Node,
    /// Output of each normalization pass, in order
    pub passes: Vec<(Pass, Node)>,
    pub cps: CpsProgram,
}

impl Stages {
    pub fn after(&self, pass: Pass) -> Option<&Node> {
        self.passes
            .iter()
            .find(|(p, _)| *p == pass)
            .map(|(_, node)| node)
    }

    /// The tree handed to the CPS pass
    pub fn normalized(&self) -> &Node {
        self.passes
            .last()
            .map(|(_, node)| node)
            .unwrap_or(&self.ingested)
    }
}

pub struct Compiler {
    options: CompileOptions,
    names: NameGen,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            names: NameGen::new(),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Run every stage up to and including the CPS transform.
    pub fn lower(&mut self, module: &Module) -> CompileResult<Stages> {
        // A user `console` would capture `console.log` as well
        let continuation = self.options.continuation();
        let root = continuation.split('.').next().unwrap_or(continuation);
        let ingested = ingest_reserving(module, &[root])?;
        log::debug!("ingest: {}", ingested);

        self.names.reserve(identifiers(&ingested));
        self.names.reserve([self.options.continuation()]);

        let mut passes = Vec::with_capacity(PIPELINE.len());
        let mut current = ingested.clone();
        for pass in PIPELINE {
            current = pass.run(&current, &mut self.names);
            log::debug!("{}: {}", pass.name(), current);
            passes.push((pass, current.clone()));
        }

        let continuation = self.options.continuation().to_string();
        let cps = CpsTransformer::new(&mut self.names).transform_program(&current, continuation)?;
        log::debug!("cps: {}", cps);

        Ok(Stages {
            ingested,
            passes,
            cps,
        })
    }

    /// Lower `module` and render it with the configured target.
    pub fn compile(&mut self, module: &Module) -> CompileResult<String> {
        let stages = self.lower(module)?;
        self.options.target.renderer().render_program(&stages.cps)
    }
}

// ============================================================================
// Source-level entry points
// ============================================================================

/// Any error between source text and output text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl SourceError {
    pub fn span(&self) -> Option<&Span> {
        match self {
            SourceError::Lex(e) => Some(e.span()),
            SourceError::Parse(e) => Some(e.span()),
            SourceError::Compile(e) => e.span(),
        }
    }

    /// Header text for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Lex(_) => "SYNTAX ERROR",
            SourceError::Parse(_) => "PARSE ERROR",
            SourceError::Compile(CompileError::UnsupportedConstruct { .. }) => {
                "UNSUPPORTED CONSTRUCT"
            }
            SourceError::Compile(CompileError::ViolatedPassInvariant { .. }) => "INTERNAL ERROR",
            SourceError::Compile(CompileError::EmitterMismatch { .. }) => "EMITTER MISMATCH",
        }
    }
}

pub fn parse_source(source: &str) -> Result<Module, SourceError> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse_module()?)
}

/// Compile source text to the configured target. Nothing is returned unless
/// every stage succeeds.
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<String, SourceError> {
    let module = parse_source(source)?;
    Ok(Compiler::new(options.clone()).compile(&module)?)
}
