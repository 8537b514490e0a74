//! Built-in operators and host primitives.
//!
//! A [`Builtins`] value pairs the signature table the type checker starts
//! from with the instruction recipes the code generator uses for operators.
//! Names that have a signature but no recipe (`printInt`, `readInt`, ...)
//! are external symbols and get called through the C calling convention.

use std::collections::HashMap;

use snafu::ensure;

use crate::error::{CompileResult, ConfigSnafu};
use crate::ir::is_generated_label;
use crate::ty::Type;

/// Symbols the program shell defines around the generated routine.
const SHELL_SYMBOLS: &[&str] = &["_start", "main"];

/// Built-in name of unary minus. `-` is taken by binary subtraction, and no
/// identifier can spell this one, so user code cannot call or shadow it.
pub const NEGATE: &str = "unary-";

/// Name under which a unary operator is resolved.
pub fn unary_operator_name(op: &str) -> &str {
  match op {
    "-" => NEGATE,
    other => other,
  }
}

fn is_identifier(name: &str) -> bool {
  let mut bytes = name.bytes();
  bytes
    .next()
    .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
    && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lowering {
  /// `movl a, %eax; <op> b, %eax`
  Arithmetic(&'static str),
  /// Signed division through `%edx:%eax`, quotient or remainder.
  Divide {
    remainder: bool,
  },
  /// Materialise a 0/1 flag with a conditional move.
  Compare(&'static str),
  Not,
  Negate,
}

/// Fixed instruction sequence for one built-in. The sequence leaves its
/// result in `%eax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
  pub arity: usize,
  lowering: Lowering,
}

impl Recipe {
  const fn new(arity: usize, lowering: Lowering) -> Self {
    Self { arity, lowering }
  }

  /// Instruction lines for the given assembly operands. Callers check the
  /// operand count against [`Recipe::arity`] first.
  pub fn lower(&self, args: &[String]) -> Vec<String> {
    match self.lowering {
      Lowering::Arithmetic(op) => vec![
        format!("movl {}, %eax", args[0]),
        format!("{op} {}, %eax", args[1]),
      ],
      Lowering::Divide { remainder } => {
        let mut lines = vec![
          format!("movl {}, %eax", args[0]),
          "cltd".to_string(),
          format!("movl {}, %ecx", args[1]),
          "idivl %ecx".to_string(),
        ];
        if remainder {
          lines.push("movl %edx, %eax".to_string());
        }
        lines
      }
      Lowering::Compare(cmov) => vec![
        "movl $0, %eax".to_string(),
        "movl $1, %edx".to_string(),
        format!("movl {}, %ecx", args[0]),
        format!("cmpl {}, %ecx", args[1]),
        format!("{cmov} %edx, %eax"),
      ],
      Lowering::Not => vec![
        format!("movl {}, %eax", args[0]),
        "xorl $1, %eax".to_string(),
      ],
      Lowering::Negate => vec![
        format!("movl {}, %eax", args[0]),
        "negl %eax".to_string(),
      ],
    }
  }
}

const ARITHMETIC: &[(&str, Lowering)] = &[
  ("+", Lowering::Arithmetic("addl")),
  ("-", Lowering::Arithmetic("subl")),
  ("*", Lowering::Arithmetic("imull")),
  ("/", Lowering::Divide { remainder: false }),
  ("%", Lowering::Divide { remainder: true }),
];

const COMPARISON: &[(&str, Lowering)] = &[
  ("<", Lowering::Compare("cmovl")),
  (">", Lowering::Compare("cmovg")),
  ("<=", Lowering::Compare("cmovle")),
  (">=", Lowering::Compare("cmovge")),
  ("==", Lowering::Compare("cmove")),
  ("<>", Lowering::Compare("cmovne")),
  ("!=", Lowering::Compare("cmovne")),
];

/// Immutable table of everything a program can call without declaring it.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
  signatures: HashMap<String, Type>,
  recipes: HashMap<String, Recipe>,
}

impl Builtins {
  /// Operators only; no host primitives.
  pub fn operators() -> Self {
    let mut builtins = Self::default();
    let int_pair = || vec![Type::Int, Type::Int];

    for &(name, lowering) in ARITHMETIC {
      builtins.insert(
        name,
        Type::function(int_pair(), Type::Int),
        Recipe::new(2, lowering),
      );
    }
    for &(name, lowering) in COMPARISON {
      builtins.insert(
        name,
        Type::function(int_pair(), Type::Bool),
        Recipe::new(2, lowering),
      );
    }
    builtins.insert(
      "!",
      Type::function(vec![Type::Bool], Type::Bool),
      Recipe::new(1, Lowering::Not),
    );
    builtins.insert(
      NEGATE,
      Type::function(vec![Type::Int], Type::Int),
      Recipe::new(1, Lowering::Negate),
    );
    builtins
  }

  /// Operators plus the I/O primitives provided by the runtime library.
  pub fn standard() -> Self {
    let mut builtins = Self::operators();
    builtins.insert_external("printInt", Type::function(vec![Type::Int], Type::Void));
    builtins.insert_external("readInt", Type::function(vec![], Type::Int));
    builtins
  }

  /// Declare a routine that is linked in from elsewhere. The name is emitted
  /// verbatim as a call target, so it must be a plain identifier that no
  /// label of the generated program can shadow.
  pub fn with_external(mut self, name: impl Into<String>, ty: Type) -> CompileResult<Self> {
    let name = name.into();
    ensure!(
      is_identifier(&name),
      ConfigSnafu {
        name: name.clone(),
        message: "not an identifier",
      }
    );
    ensure!(
      !SHELL_SYMBOLS.contains(&name.as_str()) && !is_generated_label(&name),
      ConfigSnafu {
        name: name.clone(),
        message: "clashes with a label of the generated program",
      }
    );
    self.insert_external(name, ty);
    Ok(self)
  }

  fn insert_external(&mut self, name: impl Into<String>, ty: Type) {
    self.signatures.insert(name.into(), ty);
  }

  fn insert(&mut self, name: &str, ty: Type, recipe: Recipe) {
    self.signatures.insert(name.to_string(), ty);
    self.recipes.insert(name.to_string(), recipe);
  }

  pub fn signature(&self, name: &str) -> Option<&Type> {
    self.signatures.get(name)
  }

  pub fn signatures(&self) -> impl Iterator<Item = (&str, &Type)> {
    self.signatures.iter().map(|(name, ty)| (name.as_str(), ty))
  }

  pub fn recipe(&self, name: &str) -> Option<&Recipe> {
    self.recipes.get(name)
  }
}
