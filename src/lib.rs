//! Crate root: the `source -> assembly` pipeline.
//!
//! Each stage is a pure function of its input, and no state outlives one
//! compilation:
//! - `tokenizer` splits the source into positioned tokens ending in `Eof`.
//! - `parser` builds one root statement and rejects trailing input.
//! - `typeck` accepts or rejects the tree against the built-in signatures.
//! - `irgen` flattens structured control flow into labels and jumps.
//! - `codegen` lowers the IR into 32-bit x86 AT&T assembly.
//! - `builtins` holds the operator tables shared by `typeck` and `codegen`.
//! - `error` holds the per-stage error kinds and caret rendering.

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod irgen;
pub mod parser;
pub mod tokenizer;
pub mod ty;
pub mod typeck;

pub use builtins::Builtins;
pub use error::{CompileError, CompileResult, ErrorKind};

/// Compile a source string into assembly lines, with the standard I/O
/// primitives available.
pub fn compile(source: &str) -> CompileResult<Vec<String>> {
  compile_with(source, &Builtins::standard())
}

/// Compile a source string against an explicit built-in table.
pub fn compile_with(source: &str, builtins: &Builtins) -> CompileResult<Vec<String>> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse_statement(&tokens)?;
  typeck::check(&program, builtins)?;
  let ir = irgen::generate(&program);
  codegen::generate_program(&ir, builtins)
}

/// Join assembly lines into the text written to the output sink.
pub fn format_lines(lines: &[String]) -> String {
  let mut out = String::new();
  for line in lines {
    out.push_str(line);
    out.push('\n');
  }
  out
}
