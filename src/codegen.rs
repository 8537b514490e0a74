//! Code generation: lower the linear IR into 32-bit AT&T x86 assembly.
//!
//! The emitter makes no attempt at register allocation. Every IR variable
//! lives in its own 4-byte slot below `%ebp`, and each command loads its
//! operands into scratch registers, works on them and stores the result
//! straight back. Operators with a built-in recipe are expanded inline;
//! anything else is an external routine called with arguments pushed right
//! to left and popped by the caller.

use std::collections::{BTreeSet, HashMap};

use snafu::{OptionExt, ensure};
use tracing::{debug, trace};

use crate::builtins::Builtins;
use crate::error::{CodegenSnafu, CompileResult};
use crate::ir::{IrCommand, RValue};

const SLOT_SIZE: usize = 4;
const INDENT: &str = "    ";

/// Stack slots for the routine's variables plus the external symbols it
/// references.
#[derive(Debug, Default)]
pub struct SymbolTable {
  slots: HashMap<String, usize>,
  frame_size: usize,
  externals: BTreeSet<String>,
}

impl SymbolTable {
  /// Reserve a slot for every assigned variable, in order of first
  /// assignment.
  pub fn for_commands(ir: &[IrCommand]) -> Self {
    let mut table = Self::default();
    for var in ir.iter().filter_map(IrCommand::assigned_var) {
      if !table.slots.contains_key(var) {
        table.reserve(var);
      }
    }
    table
  }

  fn reserve(&mut self, var: &str) {
    self.frame_size += SLOT_SIZE;
    self.slots.insert(var.to_string(), self.frame_size);
  }

  /// Bytes of locals below the saved frame pointer.
  pub fn frame_size(&self) -> usize {
    self.frame_size
  }

  pub fn offset_of(&self, var: &str) -> Option<usize> {
    self.slots.get(var).copied()
  }

  pub fn local_var(&self, var: &str) -> CompileResult<String> {
    let offset = self.offset_of(var).with_context(|| CodegenSnafu {
      message: format!("Reading unknown variable: {var}"),
    })?;
    Ok(format!("-{offset}(%ebp)"))
  }

  pub fn rvalue(&self, value: &RValue) -> CompileResult<String> {
    match value {
      RValue::IntConst(value) => Ok(format!("${value}")),
      RValue::Var(name) => self.local_var(name),
    }
  }

  fn add_external(&mut self, symbol: &str) {
    self.externals.insert(symbol.to_string());
  }

  /// External symbols in sorted order.
  pub fn external_symbols(&self) -> impl Iterator<Item = &str> {
    self.externals.iter().map(String::as_str)
  }
}

/// Unindented instruction lines for one routine and the symbols it needs
/// from elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionAsm {
  pub lines: Vec<String>,
  pub external_symbols: Vec<String>,
}

/// Emit a routine: prologue, one lowering per command, epilogue.
pub fn generate_function_body(ir: &[IrCommand], builtins: &Builtins) -> CompileResult<FunctionAsm> {
  let mut emitter = Emitter {
    symbols: SymbolTable::for_commands(ir),
    builtins,
    lines: Vec::new(),
  };

  emitter.prologue();
  for cmd in ir {
    emitter.lower(cmd)?;
  }
  emitter.epilogue();

  let external_symbols: Vec<String> = emitter
    .symbols
    .external_symbols()
    .map(str::to_string)
    .collect();
  debug!(
    frame_size = emitter.symbols.frame_size(),
    lines = emitter.lines.len(),
    externals = external_symbols.len(),
    "generated function body"
  );
  Ok(FunctionAsm {
    lines: emitter.lines,
    external_symbols,
  })
}

/// Emit a complete translation unit whose entry point calls the routine and
/// exits with status 0. Lines come back already indented.
pub fn generate_program(ir: &[IrCommand], builtins: &Builtins) -> CompileResult<Vec<String>> {
  let body = generate_function_body(ir, builtins)?;

  let mut asm: Vec<String> = body
    .external_symbols
    .iter()
    .map(|symbol| format!(".extern {symbol}"))
    .collect();
  asm.extend(
    [
      ".globl _start",
      ".type _start, @function",
      ".text",
      "_start:",
      "call main",
      "movl $1, %eax",
      "movl $0, %ebx",
      "int $0x80",
      ".type main, @function",
      "main:",
    ]
    .map(str::to_string),
  );
  asm.extend(body.lines);

  Ok(asm.iter().map(|line| indent(line)).collect())
}

/// Labels and directives sit in column zero, instructions are indented.
pub fn indent(line: &str) -> String {
  if line.ends_with(':') || line.starts_with('.') {
    line.to_string()
  } else {
    format!("{INDENT}{line}")
  }
}

struct Emitter<'a> {
  symbols: SymbolTable,
  builtins: &'a Builtins,
  lines: Vec<String>,
}

impl Emitter<'_> {
  fn emit(&mut self, line: impl Into<String>) {
    self.lines.push(line.into());
  }

  fn prologue(&mut self) {
    self.emit("pushl %ebp");
    self.emit("movl %esp, %ebp");
    let frame_size = self.symbols.frame_size();
    if frame_size > 0 {
      self.emit(format!("subl ${frame_size}, %esp"));
    }
  }

  fn epilogue(&mut self) {
    self.emit("movl %ebp, %esp");
    self.emit("popl %ebp");
    self.emit("ret");
  }

  fn lower(&mut self, cmd: &IrCommand) -> CompileResult<()> {
    trace!(%cmd, "lowering");
    match cmd {
      IrCommand::Copy { dest, value } => {
        let src = self.symbols.rvalue(value)?;
        let dest = self.symbols.local_var(dest)?;
        self.emit(format!("movl {src}, %eax"));
        self.emit(format!("movl %eax, {dest}"));
      }
      IrCommand::Call { dest, func, args } => match self.builtins.recipe(func).copied() {
        Some(recipe) => {
          ensure!(
            recipe.arity == args.len(),
            CodegenSnafu {
              message: format!(
                "Call to builtin {func} takes {} args but {} given.",
                recipe.arity,
                args.len()
              ),
            }
          );
          let operands = args
            .iter()
            .map(|arg| self.symbols.rvalue(arg))
            .collect::<CompileResult<Vec<_>>>()?;
          for line in recipe.lower(&operands) {
            self.emit(line);
          }
          self.store_result(dest)?;
        }
        None => self.lower_external_call(dest, func, args)?,
      },
      IrCommand::Label(name) => self.emit(format!("{name}:")),
      IrCommand::Goto(label) => self.emit(format!("jmp {label}")),
      IrCommand::GotoIf { label, cond } => self.lower_branch(label, cond, "jne")?,
      IrCommand::GotoIfNot { label, cond } => self.lower_branch(label, cond, "je")?,
    }
    Ok(())
  }

  fn lower_branch(&mut self, label: &str, cond: &RValue, jump: &str) -> CompileResult<()> {
    let cond = self.symbols.rvalue(cond)?;
    self.emit(format!("movl {cond}, %eax"));
    self.emit("cmpl $0, %eax");
    self.emit(format!("{jump} {label}"));
    Ok(())
  }

  fn lower_external_call(&mut self, dest: &str, func: &str, args: &[RValue]) -> CompileResult<()> {
    self.symbols.add_external(func);

    for arg in args.iter().rev() {
      let operand = self.symbols.rvalue(arg)?;
      self.emit(format!("pushl {operand}"));
    }
    self.emit(format!("call {func}"));
    let arg_bytes = args.len() * SLOT_SIZE;
    if arg_bytes > 0 {
      self.emit(format!("addl ${arg_bytes}, %esp"));
    }
    self.store_result(dest)
  }

  fn store_result(&mut self, dest: &str) -> CompileResult<()> {
    let dest = self.symbols.local_var(dest)?;
    self.emit(format!("movl %eax, {dest}"));
    Ok(())
  }
}
