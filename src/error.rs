//! Error type shared by every compilation stage.
//!
//! Every stage reports failures through [`CompileError`]. Front-end errors
//! carry the 1-based line and column of the offending token so the driver
//! can print the source line with a caret under it, chibicc style.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Which stage rejected the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lex,
  Parse,
  Type,
  Codegen,
  Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("lex error at line {line} col {col}: {message}"))]
  Lex {
    line: usize,
    col: usize,
    message: String,
  },

  #[snafu(display("parse error at line {line} col {col}: {message}"))]
  Parse {
    line: usize,
    col: usize,
    message: String,
  },

  #[snafu(display("type error: {message}"))]
  Type { message: String },

  /// Broken invariant between the IR generator and the code generator.
  #[snafu(display("internal compiler error: {message}"))]
  Codegen { message: String },

  /// A host tried to register a routine the assembler could not link to.
  #[snafu(display("invalid external symbol '{name}': {message}"))]
  Config {
    name: String,
    message: String,
  },
}

impl CompileError {
  pub fn lex(line: usize, col: usize, message: impl Into<String>) -> Self {
    Self::Lex {
      line,
      col,
      message: message.into(),
    }
  }

  pub fn parse(line: usize, col: usize, message: impl Into<String>) -> Self {
    Self::Parse {
      line,
      col,
      message: message.into(),
    }
  }

  pub fn type_error(message: impl Into<String>) -> Self {
    Self::Type {
      message: message.into(),
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Lex { .. } => ErrorKind::Lex,
      Self::Parse { .. } => ErrorKind::Parse,
      Self::Type { .. } => ErrorKind::Type,
      Self::Codegen { .. } => ErrorKind::Codegen,
      Self::Config { .. } => ErrorKind::Config,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Lex { message, .. }
      | Self::Parse { message, .. }
      | Self::Type { message }
      | Self::Codegen { message }
      | Self::Config { message, .. } => message,
    }
  }

  /// Position of the error in the source, if the stage knows it.
  pub fn location(&self) -> Option<(usize, usize)> {
    match self {
      Self::Lex { line, col, .. } | Self::Parse { line, col, .. } => Some((*line, *col)),
      Self::Type { .. } | Self::Codegen { .. } | Self::Config { .. } => None,
    }
  }

  /// Format the error against the source it came from, pointing at the
  /// offending column with a caret.
  pub fn render(&self, source: &str) -> String {
    let Some((line, col)) = self.location() else {
      return self.to_string();
    };
    let Some(text) = source.lines().nth(line.saturating_sub(1)) else {
      return self.to_string();
    };
    let text = text.trim_end_matches('\r');
    // Columns are counted in characters, tabs included.
    let marker = format!("{}^", " ".repeat(col.saturating_sub(1)));
    format!("{text}\n{marker} {self}")
  }
}
