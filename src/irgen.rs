//! Lowering of the syntax tree to linear IR.
//!
//! The input must already have passed the type checker; nothing is
//! re-validated here. Every expression evaluates to an [`RValue`]: constants
//! and variables directly, everything else through a call whose result lands
//! in a fresh `$resultOf_<op>_N` temporary. Operands are always evaluated
//! left to right.

use tracing::{debug, trace};

use crate::ast::{Expr, Statement};
use crate::builtins::unary_operator_name;
use crate::ir::{
  ELSE_LABEL, IF_END_LABEL, IrCommand, NameMaker, RValue, WHILE_END_LABEL, WHILE_HEAD_LABEL,
};

/// Generate the IR for a whole program.
pub fn generate(stmt: &Statement) -> Vec<IrCommand> {
  let mut generator = IrGenerator::default();
  generator.gen_stmt(stmt);
  debug!(commands = generator.output.len(), "generated IR");
  generator.output
}

#[derive(Default)]
struct IrGenerator {
  output: Vec<IrCommand>,
  names: NameMaker,
}

impl IrGenerator {
  fn emit(&mut self, cmd: IrCommand) {
    trace!(%cmd, "emit");
    self.output.push(cmd);
  }

  fn gen_stmt(&mut self, stmt: &Statement) {
    match stmt {
      Statement::Empty => {}
      Statement::Block(stmts) => {
        for stmt in stmts {
          self.gen_stmt(stmt);
        }
      }
      Statement::Declaration { name, init, .. } => {
        let value = self.gen_expr(init);
        self.emit(IrCommand::copy(name.clone(), value));
      }
      Statement::Assignment { name, value } => {
        let value = self.gen_expr(value);
        self.emit(IrCommand::copy(name.clone(), value));
      }
      Statement::If {
        cond,
        then_branch,
        else_branch,
      } => {
        let else_label = self.names.make(ELSE_LABEL);
        let end_label = self.names.make(IF_END_LABEL);
        let has_else = !matches!(else_branch.as_ref(), Statement::Empty);

        let cond = self.gen_expr(cond);
        let skip_then = if has_else { &else_label } else { &end_label };
        self.emit(IrCommand::goto_if_not(skip_then.clone(), cond));

        self.gen_stmt(then_branch);
        if has_else {
          self.emit(IrCommand::goto(end_label.clone()));
          self.emit(IrCommand::label(else_label));
          self.gen_stmt(else_branch);
        }
        self.emit(IrCommand::label(end_label));
      }
      Statement::While { cond, body } => {
        let head_label = self.names.make(WHILE_HEAD_LABEL);
        let end_label = self.names.make(WHILE_END_LABEL);

        self.emit(IrCommand::label(head_label.clone()));
        let cond = self.gen_expr(cond);
        self.emit(IrCommand::goto_if_not(end_label.clone(), cond));

        self.gen_stmt(body);
        self.emit(IrCommand::goto(head_label));
        self.emit(IrCommand::label(end_label));
      }
      Statement::Expr(expr) => {
        self.gen_expr(expr);
      }
    }
  }

  fn gen_expr(&mut self, expr: &Expr) -> RValue {
    match expr {
      Expr::IntConst(value) => RValue::IntConst(*value),
      Expr::BoolConst(value) => RValue::IntConst(i32::from(*value)),
      Expr::Var(name) => RValue::var(name.clone()),
      Expr::UnaryOp { op, operand } => {
        let operand = self.gen_expr(operand);
        self.gen_call(unary_operator_name(op), vec![operand])
      }
      Expr::BinaryOp { lhs, op, rhs } => {
        let lhs = self.gen_expr(lhs);
        let rhs = self.gen_expr(rhs);
        self.gen_call(op, vec![lhs, rhs])
      }
      Expr::Call { name, args } => {
        let args = args.iter().map(|arg| self.gen_expr(arg)).collect();
        self.gen_call(name, args)
      }
    }
  }

  fn gen_call(&mut self, func: &str, args: Vec<RValue>) -> RValue {
    let dest = self.names.make(&format!("$resultOf_{func}_"));
    self.emit(IrCommand::call(dest.clone(), func, args));
    RValue::Var(dest)
  }
}
