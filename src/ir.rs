//! Flat three-address intermediate representation.
//!
//! A program is a single implicit routine: an ordered list of commands over
//! named variables, with structured control flow replaced by labels and
//! jumps. Booleans are plain `0`/`1` integers from here on.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RValue {
  IntConst(i32),
  Var(String),
}

impl RValue {
  pub fn var(name: impl Into<String>) -> Self {
    Self::Var(name.into())
  }
}

impl fmt::Display for RValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RValue::IntConst(value) => write!(f, "{value}"),
      RValue::Var(name) => f.write_str(name),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrCommand {
  Copy {
    dest: String,
    value: RValue,
  },
  Call {
    dest: String,
    func: String,
    args: Vec<RValue>,
  },
  Label(String),
  Goto(String),
  GotoIf {
    label: String,
    cond: RValue,
  },
  GotoIfNot {
    label: String,
    cond: RValue,
  },
}

impl IrCommand {
  pub fn copy(dest: impl Into<String>, value: RValue) -> Self {
    Self::Copy {
      dest: dest.into(),
      value,
    }
  }

  pub fn call(dest: impl Into<String>, func: impl Into<String>, args: Vec<RValue>) -> Self {
    Self::Call {
      dest: dest.into(),
      func: func.into(),
      args,
    }
  }

  pub fn label(name: impl Into<String>) -> Self {
    Self::Label(name.into())
  }

  pub fn goto(label: impl Into<String>) -> Self {
    Self::Goto(label.into())
  }

  pub fn goto_if(label: impl Into<String>, cond: RValue) -> Self {
    Self::GotoIf {
      label: label.into(),
      cond,
    }
  }

  pub fn goto_if_not(label: impl Into<String>, cond: RValue) -> Self {
    Self::GotoIfNot {
      label: label.into(),
      cond,
    }
  }

  /// Variable written by this command, if any.
  pub fn assigned_var(&self) -> Option<&str> {
    match self {
      IrCommand::Copy { dest, .. } | IrCommand::Call { dest, .. } => Some(dest.as_str()),
      _ => None,
    }
  }

  /// Label this command may transfer control to, if any.
  pub fn jump_target(&self) -> Option<&str> {
    match self {
      IrCommand::Goto(label)
      | IrCommand::GotoIf { label, .. }
      | IrCommand::GotoIfNot { label, .. } => Some(label.as_str()),
      _ => None,
    }
  }
}

impl fmt::Display for IrCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IrCommand::Copy { dest, value } => write!(f, "{dest} := {value}"),
      IrCommand::Call { dest, func, args } => {
        write!(f, "{dest} := {func}(")?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{arg}")?;
        }
        f.write_str(")")
      }
      IrCommand::Label(name) => write!(f, "{name}:"),
      IrCommand::Goto(label) => write!(f, "goto {label}"),
      IrCommand::GotoIf { label, cond } => write!(f, "if {cond} goto {label}"),
      IrCommand::GotoIfNot { label, cond } => write!(f, "if not {cond} goto {label}"),
    }
  }
}

/// Prefixes of the control-flow labels the IR generator numbers.
pub const ELSE_LABEL: &str = "else";
pub const IF_END_LABEL: &str = "ifEnd";
pub const WHILE_HEAD_LABEL: &str = "whileHead";
pub const WHILE_END_LABEL: &str = "whileEnd";
pub const LABEL_PREFIXES: &[&str] = &[ELSE_LABEL, IF_END_LABEL, WHILE_HEAD_LABEL, WHILE_END_LABEL];

/// Whether `name` has the shape of a label the IR generator can produce,
/// i.e. one of [`LABEL_PREFIXES`] followed by a decimal counter.
pub fn is_generated_label(name: &str) -> bool {
  LABEL_PREFIXES.iter().any(|prefix| {
    name
      .strip_prefix(prefix)
      .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
  })
}

/// Makes distinct names like `else1`, `else2`, `whileHead1`, ... Each prefix
/// counts independently from 1.
#[derive(Debug, Default)]
pub struct NameMaker {
  next: HashMap<String, u32>,
}

impl NameMaker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn make(&mut self, prefix: &str) -> String {
    let counter = self.next.entry(prefix.to_string()).or_insert(1);
    let name = format!("{prefix}{counter}");
    *counter += 1;
    name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn name_maker_counts_per_prefix() {
    let mut names = NameMaker::new();
    assert_eq!(names.make("$resultOf_+_"), "$resultOf_+_1");
    assert_eq!(names.make("whileHead"), "whileHead1");
    assert_eq!(names.make("$resultOf_+_"), "$resultOf_+_2");
    assert_eq!(names.make("whileHead"), "whileHead2");
  }

  #[test]
  fn generated_label_shape() {
    assert!(is_generated_label("else1"));
    assert!(is_generated_label("whileHead12"));
    assert!(!is_generated_label("whileHead"));
    assert!(!is_generated_label("elsewhere"));
    assert!(!is_generated_label("putChar"));
  }

  #[test]
  fn command_display() {
    let cmds = [
      IrCommand::copy("x", RValue::IntConst(0)),
      IrCommand::call("t1", "+", vec![RValue::var("x"), RValue::IntConst(1)]),
      IrCommand::label("L"),
      IrCommand::goto("L"),
      IrCommand::goto_if("L", RValue::var("c")),
      IrCommand::goto_if_not("L", RValue::var("c")),
    ];
    let text: Vec<String> = cmds.iter().map(ToString::to_string).collect();
    assert_eq!(
      text,
      vec![
        "x := 0",
        "t1 := +(x, 1)",
        "L:",
        "goto L",
        "if c goto L",
        "if not c goto L"
      ]
    );
  }

  #[test]
  fn assigned_and_jump_targets() {
    let copy = IrCommand::copy("x", RValue::IntConst(1));
    assert_eq!(copy.assigned_var(), Some("x"));
    assert_eq!(IrCommand::goto("L").assigned_var(), None);
    let branch = IrCommand::goto_if_not("E", RValue::IntConst(0));
    assert_eq!(branch.jump_target(), Some("E"));
    assert_eq!(IrCommand::label("E").jump_target(), None);
  }
}
