//! Static type checking over a scoped name environment.
//!
//! The checker only accepts or rejects a program; it annotates nothing. The
//! type of an expression is recomputed by structural recursion wherever it
//! is needed. Operators and calls are checked uniformly: `a + b` is a call
//! to whatever `+` is bound to.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{Expr, Statement};
use crate::builtins::{Builtins, unary_operator_name};
use crate::error::{CompileError, CompileResult};
use crate::ty::Type;

/// Check a whole program against the given built-in table.
pub fn check(stmt: &Statement, builtins: &Builtins) -> CompileResult<()> {
  let mut checker = TypeChecker::new(builtins);
  checker.check_stmt(stmt)?;
  debug!(kind = stmt.kind_name(), "type check passed");
  Ok(())
}

/// Stack of lexical scopes. The bottom frame holds the built-ins.
///
/// A nested frame sees every binding of the frames below it, and popping a
/// frame restores exactly the bindings that existed when it was pushed.
#[derive(Debug)]
pub struct Scopes {
  frames: Vec<HashMap<String, Type>>,
}

impl Scopes {
  pub fn new(builtins: &Builtins) -> Self {
    let root = builtins
      .signatures()
      .map(|(name, ty)| (name.to_string(), ty.clone()))
      .collect();
    Self { frames: vec![root] }
  }

  pub fn push(&mut self) {
    self.frames.push(HashMap::new());
  }

  pub fn pop(&mut self) {
    // The root frame outlives every push/pop pair.
    if self.frames.len() > 1 {
      self.frames.pop();
    }
  }

  pub fn depth(&self) -> usize {
    self.frames.len()
  }

  pub fn lookup(&self, name: &str) -> Option<&Type> {
    self.frames.iter().rev().find_map(|frame| frame.get(name))
  }

  pub fn is_bound(&self, name: &str) -> bool {
    self.lookup(name).is_some()
  }

  pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
    if let Some(top) = self.frames.last_mut() {
      top.insert(name.into(), ty);
    }
  }
}

struct TypeChecker {
  scopes: Scopes,
}

impl TypeChecker {
  fn new(builtins: &Builtins) -> Self {
    Self {
      scopes: Scopes::new(builtins),
    }
  }

  fn check_stmt(&mut self, stmt: &Statement) -> CompileResult<()> {
    match stmt {
      Statement::Empty => Ok(()),
      Statement::Block(stmts) => self.in_scope(|checker| {
        stmts.iter().try_for_each(|stmt| checker.check_stmt(stmt))
      }),
      Statement::Declaration { name, ty, init } => {
        // Every enclosing binding is visible here, so redeclaring one of
        // them (or a built-in) is rejected too.
        if self.scopes.is_bound(name) {
          return Err(CompileError::type_error(format!(
            "Variable {name} already declared."
          )));
        }
        let init_ty = self.type_of(init)?;
        if !init_ty.can_be_assigned_to(ty) {
          return Err(CompileError::type_error(format!(
            "Variable '{name}' cannot be initialized with a {init_ty}"
          )));
        }
        self.scopes.declare(name.clone(), ty.clone());
        Ok(())
      }
      Statement::Assignment { name, value } => {
        let Some(var_ty) = self.scopes.lookup(name).cloned() else {
          return Err(CompileError::type_error(format!(
            "Assignment to undeclared variable: {name}"
          )));
        };
        let value_ty = self.type_of(value)?;
        if !value_ty.can_be_assigned_to(&var_ty) {
          return Err(CompileError::type_error(format!(
            "Cannot assign {value_ty} to '{name}' (of type {var_ty})"
          )));
        }
        Ok(())
      }
      Statement::If {
        cond,
        then_branch,
        else_branch,
      } => {
        let cond_ty = self.type_of(cond)?;
        if cond_ty != Type::Bool {
          return Err(CompileError::type_error(format!(
            "If condition was {cond_ty} instead of bool"
          )));
        }
        self.in_scope(|checker| checker.check_stmt(then_branch))?;
        self.in_scope(|checker| checker.check_stmt(else_branch))
      }
      Statement::While { cond, body } => {
        let cond_ty = self.type_of(cond)?;
        if cond_ty != Type::Bool {
          return Err(CompileError::type_error(format!(
            "While loop condition was {cond_ty} instead of bool"
          )));
        }
        self.in_scope(|checker| checker.check_stmt(body))
      }
      Statement::Expr(expr) => self.type_of(expr).map(|_| ()),
    }
  }

  fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
    self.scopes.push();
    let result = f(self);
    self.scopes.pop();
    result
  }

  fn type_of(&mut self, expr: &Expr) -> CompileResult<Type> {
    match expr {
      Expr::IntConst(_) => Ok(Type::Int),
      Expr::BoolConst(_) => Ok(Type::Bool),
      Expr::Var(name) => self
        .scopes
        .lookup(name)
        .cloned()
        .ok_or_else(|| CompileError::type_error(format!("Unknown variable: {name}"))),
      Expr::UnaryOp { op, operand } => {
        let operand_ty = self.type_of(operand)?;
        self.check_call(unary_operator_name(op), &[operand_ty])
      }
      Expr::BinaryOp { lhs, op, rhs } => {
        let lhs_ty = self.type_of(lhs)?;
        let rhs_ty = self.type_of(rhs)?;
        self.check_call(op, &[lhs_ty, rhs_ty])
      }
      Expr::Call { name, args } => {
        let arg_tys = args
          .iter()
          .map(|arg| self.type_of(arg))
          .collect::<CompileResult<Vec<_>>>()?;
        self.check_call(name, &arg_tys)
      }
    }
  }

  fn check_call(&self, name: &str, given: &[Type]) -> CompileResult<Type> {
    let Some(Type::Function { args, ret }) = self.scopes.lookup(name) else {
      return Err(CompileError::type_error(format!(
        "{name} is not a known function or operator"
      )));
    };

    if args.len() != given.len() {
      return Err(CompileError::type_error(format!(
        "{name} expects {} arguments but {} given",
        args.len(),
        given.len()
      )));
    }

    for (i, (expected, given)) in args.iter().zip(given).enumerate() {
      if !given.can_be_assigned_to(expected) {
        return Err(CompileError::type_error(format!(
          "{name} argument {} expects {expected} but {given} given",
          i + 1
        )));
      }
    }

    Ok((**ret).clone())
  }
}
