//! Test support: a tiny interpreter for the IA-32 subset the code generator
//! emits, so compiled programs can be run without an assembler or a 32-bit
//! linker. `printInt` and `readInt` are serviced by the host.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fmt;

const STACK_TOP: u32 = 0x0010_0000;
const MAX_STEPS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
  UnknownLabel(String),
  UnknownInstruction(String),
  BadOperand(String),
  UnknownExternal(String),
  InputExhausted,
  DivideByZero,
  StepLimit,
}

impl fmt::Display for RuntimeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RuntimeError::UnknownLabel(l) => write!(f, "unknown label '{l}'"),
      RuntimeError::UnknownInstruction(i) => write!(f, "unknown instruction '{i}'"),
      RuntimeError::BadOperand(o) => write!(f, "bad operand '{o}'"),
      RuntimeError::UnknownExternal(s) => write!(f, "unresolved external '{s}'"),
      RuntimeError::InputExhausted => write!(f, "readInt past end of input"),
      RuntimeError::DivideByZero => write!(f, "division by zero"),
      RuntimeError::StepLimit => write!(f, "step limit exceeded"),
    }
  }
}

#[derive(Debug, Clone)]
struct Instr {
  op: String,
  args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
  Imm(i32),
  Reg(usize),
  Mem { base: usize, disp: i32 },
}

const EAX: usize = 0;
const EBX: usize = 1;
const ECX: usize = 2;
const EDX: usize = 3;
const ESP: usize = 4;
const EBP: usize = 5;

fn register(name: &str) -> Option<usize> {
  match name {
    "%eax" => Some(EAX),
    "%ebx" => Some(EBX),
    "%ecx" => Some(ECX),
    "%edx" => Some(EDX),
    "%esp" => Some(ESP),
    "%ebp" => Some(EBP),
    _ => None,
  }
}

fn operand(text: &str) -> Result<Operand, RuntimeError> {
  let bad = || RuntimeError::BadOperand(text.to_string());
  if let Some(imm) = text.strip_prefix('$') {
    return imm.parse().map(Operand::Imm).map_err(|_| bad());
  }
  if let Some(reg) = register(text) {
    return Ok(Operand::Reg(reg));
  }
  let (disp, rest) = text.split_once('(').ok_or_else(bad)?;
  let base = rest.strip_suffix(')').and_then(register).ok_or_else(bad)?;
  let disp = if disp.is_empty() {
    0
  } else {
    disp.parse().map_err(|_| bad())?
  };
  Ok(Operand::Mem { base, disp })
}

/// Observable result of running a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
  pub exit_status: i32,
  pub output: Vec<i32>,
}

struct Machine {
  code: Vec<Instr>,
  labels: HashMap<String, usize>,
  regs: [i32; 6],
  memory: HashMap<u32, i32>,
  /// Operands of the last `cmpl src, dst` as (dst, src).
  flags: (i32, i32),
  pc: usize,
  input: VecDeque<i32>,
  output: Vec<i32>,
}

impl Machine {
  fn load(asm: &[String]) -> Self {
    let mut code = Vec::new();
    let mut labels = HashMap::new();
    for line in asm {
      let line = line.trim();
      if line.is_empty() || line.starts_with('.') {
        continue;
      }
      if let Some(label) = line.strip_suffix(':') {
        labels.insert(label.to_string(), code.len());
        continue;
      }
      let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
      let args = rest
        .split(", ")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
      code.push(Instr {
        op: op.to_string(),
        args,
      });
    }
    let mut regs = [0; 6];
    regs[ESP] = STACK_TOP as i32;
    Self {
      code,
      labels,
      regs,
      memory: HashMap::new(),
      flags: (0, 0),
      pc: 0,
      input: VecDeque::new(),
      output: Vec::new(),
    }
  }

  fn address(&self, base: usize, disp: i32) -> u32 {
    self.regs[base].wrapping_add(disp) as u32
  }

  fn read(&self, op: Operand) -> i32 {
    match op {
      Operand::Imm(v) => v,
      Operand::Reg(r) => self.regs[r],
      Operand::Mem { base, disp } => *self.memory.get(&self.address(base, disp)).unwrap_or(&0),
    }
  }

  fn write(&mut self, op: Operand, value: i32) -> Result<(), RuntimeError> {
    match op {
      Operand::Imm(v) => return Err(RuntimeError::BadOperand(format!("${v}"))),
      Operand::Reg(r) => self.regs[r] = value,
      Operand::Mem { base, disp } => {
        let addr = self.address(base, disp);
        self.memory.insert(addr, value);
      }
    }
    Ok(())
  }

  fn push(&mut self, value: i32) {
    self.regs[ESP] = self.regs[ESP].wrapping_sub(4);
    let addr = self.regs[ESP] as u32;
    self.memory.insert(addr, value);
  }

  fn pop(&mut self) -> i32 {
    let addr = self.regs[ESP] as u32;
    self.regs[ESP] = self.regs[ESP].wrapping_add(4);
    *self.memory.get(&addr).unwrap_or(&0)
  }

  fn label(&self, name: &str) -> Result<usize, RuntimeError> {
    self
      .labels
      .get(name)
      .copied()
      .ok_or_else(|| RuntimeError::UnknownLabel(name.to_string()))
  }

  fn call_external(&mut self, name: &str) -> Result<(), RuntimeError> {
    match name {
      "printInt" => {
        let arg = self.read(Operand::Mem { base: ESP, disp: 0 });
        self.output.push(arg);
      }
      "readInt" => {
        let value = self.input.pop_front().ok_or(RuntimeError::InputExhausted)?;
        self.regs[EAX] = value;
      }
      other => return Err(RuntimeError::UnknownExternal(other.to_string())),
    }
    Ok(())
  }

  fn run(&mut self) -> Result<i32, RuntimeError> {
    self.pc = self.label("_start")?;
    for _ in 0..MAX_STEPS {
      let instr = self
        .code
        .get(self.pc)
        .cloned()
        .ok_or_else(|| RuntimeError::UnknownInstruction(format!("pc={}", self.pc)))?;
      self.pc += 1;

      let arg = |i: usize| -> Result<Operand, RuntimeError> {
        instr
          .args
          .get(i)
          .ok_or_else(|| RuntimeError::BadOperand(instr.op.clone()))
          .and_then(|a| operand(a))
      };

      match instr.op.as_str() {
        "movl" => {
          let value = self.read(arg(0)?);
          self.write(arg(1)?, value)?;
        }
        "addl" | "subl" | "imull" | "xorl" => {
          let src = self.read(arg(0)?);
          let dst = arg(1)?;
          let cur = self.read(dst);
          let value = match instr.op.as_str() {
            "addl" => cur.wrapping_add(src),
            "subl" => cur.wrapping_sub(src),
            "imull" => cur.wrapping_mul(src),
            _ => cur ^ src,
          };
          self.write(dst, value)?;
        }
        "negl" => {
          let dst = arg(0)?;
          let value = self.read(dst).wrapping_neg();
          self.write(dst, value)?;
        }
        "cltd" => self.regs[EDX] = if self.regs[EAX] < 0 { -1 } else { 0 },
        "idivl" => {
          let divisor = self.read(arg(0)?);
          if divisor == 0 {
            return Err(RuntimeError::DivideByZero);
          }
          let dividend = (i64::from(self.regs[EDX]) << 32) | i64::from(self.regs[EAX] as u32);
          self.regs[EAX] = (dividend / i64::from(divisor)) as i32;
          self.regs[EDX] = (dividend % i64::from(divisor)) as i32;
        }
        "cmpl" => {
          let src = self.read(arg(0)?);
          let dst = self.read(arg(1)?);
          self.flags = (dst, src);
        }
        op if op.starts_with("cmov") => {
          let (a, b) = self.flags;
          let taken = match &op[4..] {
            "l" => a < b,
            "g" => a > b,
            "le" => a <= b,
            "ge" => a >= b,
            "e" => a == b,
            "ne" => a != b,
            _ => return Err(RuntimeError::UnknownInstruction(op.to_string())),
          };
          if taken {
            let value = self.read(arg(0)?);
            self.write(arg(1)?, value)?;
          }
        }
        "jmp" | "je" | "jne" => {
          let (a, b) = self.flags;
          let taken = match instr.op.as_str() {
            "je" => a == b,
            "jne" => a != b,
            _ => true,
          };
          if taken {
            self.pc = self.label(&instr.args[0])?;
          }
        }
        "pushl" => {
          let value = self.read(arg(0)?);
          self.push(value);
        }
        "popl" => {
          let value = self.pop();
          self.write(arg(0)?, value)?;
        }
        "call" => {
          let target = &instr.args[0];
          match self.labels.get(target).copied() {
            Some(addr) => {
              self.push(self.pc as i32);
              self.pc = addr;
            }
            None => self.call_external(target)?,
          }
        }
        "ret" => self.pc = self.pop() as usize,
        "int" => {
          // Only the exit system call is ever issued.
          if self.regs[EAX] == 1 {
            return Ok(self.regs[EBX]);
          }
          let eax = self.regs[EAX];
          return Err(RuntimeError::UnknownInstruction(format!("int with eax={eax}")));
        }
        other => return Err(RuntimeError::UnknownInstruction(other.to_string())),
      }
    }
    Err(RuntimeError::StepLimit)
  }
}

/// Run a compiled program, feeding `input` to successive `readInt` calls.
pub fn run_program(asm: &[String], input: &[i32]) -> Result<Outcome, RuntimeError> {
  let mut machine = Machine::load(asm);
  machine.input = input.iter().copied().collect();
  let exit_status = machine.run()?;
  Ok(Outcome {
    exit_status,
    output: machine.output,
  })
}

/// Compile `source` with the standard built-ins and run it.
pub fn compile_and_run(source: &str, input: &[i32]) -> Vec<i32> {
  let asm = rminic::compile(source).unwrap_or_else(|err| panic!("{}", err.render(source)));
  let outcome = run_program(&asm, input).unwrap_or_else(|err| panic!("runtime error: {err}"));
  assert_eq!(outcome.exit_status, 0);
  outcome.output
}
