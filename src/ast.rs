//! Syntax tree produced by the parser.
//!
//! Operators are stored by their source spelling and carry no meaning of
//! their own: later stages resolve `"+"` or `"!"` by looking the name up in
//! the built-in tables, exactly like a call to a named function.

use std::fmt;

use crate::ty::Type;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
  IntConst(i32),
  BoolConst(bool),
  Var(String),
  UnaryOp {
    op: String,
    operand: Box<Expr>,
  },
  BinaryOp {
    lhs: Box<Expr>,
    op: String,
    rhs: Box<Expr>,
  },
  Call {
    name: String,
    args: Vec<Expr>,
  },
}

impl Expr {
  pub fn int(value: i32) -> Self {
    Self::IntConst(value)
  }

  pub fn bool(value: bool) -> Self {
    Self::BoolConst(value)
  }

  pub fn var(name: impl Into<String>) -> Self {
    Self::Var(name.into())
  }

  pub fn unary(op: impl Into<String>, operand: Expr) -> Self {
    Self::UnaryOp {
      op: op.into(),
      operand: Box::new(operand),
    }
  }

  pub fn binary(lhs: Expr, op: impl Into<String>, rhs: Expr) -> Self {
    Self::BinaryOp {
      lhs: Box::new(lhs),
      op: op.into(),
      rhs: Box::new(rhs),
    }
  }

  pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
    Self::Call {
      name: name.into(),
      args,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
  /// Stands in for a missing `else` branch.
  Empty,
  Block(Vec<Statement>),
  Declaration {
    name: String,
    ty: Type,
    init: Expr,
  },
  Assignment {
    name: String,
    value: Expr,
  },
  If {
    cond: Expr,
    then_branch: Box<Statement>,
    else_branch: Box<Statement>,
  },
  While {
    cond: Expr,
    body: Box<Statement>,
  },
  Expr(Expr),
}

impl Statement {
  pub fn block(stmts: Vec<Statement>) -> Self {
    Self::Block(stmts)
  }

  pub fn declaration(name: impl Into<String>, ty: Type, init: Expr) -> Self {
    Self::Declaration {
      name: name.into(),
      ty,
      init,
    }
  }

  pub fn assignment(name: impl Into<String>, value: Expr) -> Self {
    Self::Assignment {
      name: name.into(),
      value,
    }
  }

  pub fn if_else(cond: Expr, then_branch: Statement, else_branch: Statement) -> Self {
    Self::If {
      cond,
      then_branch: Box::new(then_branch),
      else_branch: Box::new(else_branch),
    }
  }

  pub fn if_then(cond: Expr, then_branch: Statement) -> Self {
    Self::if_else(cond, then_branch, Statement::Empty)
  }

  pub fn while_loop(cond: Expr, body: Statement) -> Self {
    Self::While {
      cond,
      body: Box::new(body),
    }
  }

  /// Short name used in log output.
  pub fn kind_name(&self) -> &'static str {
    match self {
      Statement::Empty => "empty",
      Statement::Block(_) => "block",
      Statement::Declaration { .. } => "declaration",
      Statement::Assignment { .. } => "assignment",
      Statement::If { .. } => "if",
      Statement::While { .. } => "while",
      Statement::Expr(_) => "expression",
    }
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expr::IntConst(value) => write!(f, "{value}"),
      Expr::BoolConst(value) => write!(f, "{value}"),
      Expr::Var(name) => f.write_str(name),
      Expr::UnaryOp { op, operand } => write!(f, "{op}{operand}"),
      Expr::BinaryOp { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
      Expr::Call { name, args } => {
        write!(f, "{name}(")?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{arg}")?;
        }
        f.write_str(")")
      }
    }
  }
}

impl fmt::Display for Statement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Statement::Empty => f.write_str("{}"),
      Statement::Block(stmts) => {
        f.write_str("{")?;
        for stmt in stmts {
          write!(f, " {stmt}")?;
        }
        f.write_str(" }")
      }
      Statement::Declaration { name, ty, init } => write!(f, "{name} : {ty} := {init};"),
      Statement::Assignment { name, value } => write!(f, "{name} := {value};"),
      Statement::If {
        cond,
        then_branch,
        else_branch,
      } => match else_branch.as_ref() {
        Statement::Empty => write!(f, "if ({cond}) {then_branch}"),
        other => write!(f, "if ({cond}) {then_branch} else {other}"),
      },
      Statement::While { cond, body } => write!(f, "while ({cond}) {body}"),
      Statement::Expr(expr) => write!(f, "{expr};"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_parenthesizes_binary_ops() {
    let product = Expr::binary(Expr::int(2), "*", Expr::int(3));
    let sum = Expr::binary(Expr::int(1), "+", product);
    let expr = Expr::binary(sum, "==", Expr::int(7));
    assert_eq!(expr.to_string(), "((1 + (2 * 3)) == 7)");
  }

  #[test]
  fn display_statements() {
    let args = vec![Expr::int(1), Expr::unary("-", Expr::var("y"))];
    let stmt = Statement::if_else(
      Expr::var("c"),
      Statement::Expr(Expr::call("printInt", args)),
      Statement::block(vec![Statement::assignment("x", Expr::bool(true))]),
    );
    assert_eq!(
      stmt.to_string(),
      "if (c) printInt(1, -y); else { x := true; }"
    );
    assert_eq!(
      Statement::if_then(Expr::var("c"), Statement::Empty).to_string(),
      "if (c) {}"
    );
  }
}
