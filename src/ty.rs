use std::fmt;

/// Static types. Operators, library routines and (hypothetical) user
/// functions all share the `Function` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
  Int,
  Bool,
  Void,
  Function { args: Vec<Type>, ret: Box<Type> },
}

impl Type {
  pub fn function(args: Vec<Type>, ret: Type) -> Self {
    Self::Function {
      args,
      ret: Box::new(ret),
    }
  }

  /// Resolve a type name written in a declaration.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "int" => Some(Self::Int),
      "bool" => Some(Self::Bool),
      _ => None,
    }
  }

  /// No subtyping and no coercions: a value fits a slot only if the types
  /// are identical.
  pub fn can_be_assigned_to(&self, target: &Type) -> bool {
    self == target
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Int => f.write_str("int"),
      Type::Bool => f.write_str("bool"),
      Type::Void => f.write_str("void"),
      Type::Function { args, ret } => {
        f.write_str("(")?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{arg}")?;
        }
        write!(f, ") -> {ret}")
      }
    }
  }
}
