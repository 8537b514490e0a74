use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: rminic [input-file [output-file]]
   or  rminic < input-file > output-file";

#[derive(Debug, PartialEq, Eq)]
enum Invocation {
  Help,
  Usage,
  Compile {
    input: Option<String>,
    output: Option<String>,
  },
}

fn parse_args(args: &[String]) -> Invocation {
  if args.iter().any(|arg| arg == "-h" || arg == "--help") {
    return Invocation::Help;
  }
  match args {
    [] => Invocation::Compile {
      input: None,
      output: None,
    },
    [input] => Invocation::Compile {
      input: Some(input.clone()),
      output: None,
    },
    [input, output] => Invocation::Compile {
      input: Some(input.clone()),
      output: Some(output.clone()),
    },
    _ => Invocation::Usage,
  }
}

fn read_source(input: Option<&str>) -> Result<String> {
  match input {
    Some(path) => fs::read_to_string(path).with_context(|| format!("cannot read {path}")),
    None => {
      let mut source = String::new();
      io::stdin()
        .read_to_string(&mut source)
        .context("cannot read standard input")?;
      Ok(source)
    }
  }
}

fn write_asm(output: Option<&str>, asm: &str) -> Result<()> {
  match output {
    Some(path) => fs::write(path, asm).with_context(|| format!("cannot write {path}")),
    None => {
      let mut stdout = io::stdout().lock();
      stdout
        .write_all(asm.as_bytes())
        .and_then(|()| stdout.flush())
        .context("cannot write standard output")
    }
  }
}

/// Returns `Ok(false)` when the program itself was rejected; the diagnostic
/// has already been printed by then.
fn run(input: Option<&str>, output: Option<&str>) -> Result<bool> {
  let source = read_source(input)?;
  info!(
    input = input.unwrap_or("<stdin>"),
    bytes = source.len(),
    "compiling"
  );

  match rminic::compile(&source) {
    Ok(lines) => {
      write_asm(output, &rminic::format_lines(&lines))?;
      Ok(true)
    }
    Err(err) => {
      eprintln!("{}", err.render(&source));
      Ok(false)
    }
  }
}

fn main() -> ExitCode {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();

  let args: Vec<String> = env::args().skip(1).collect();
  match parse_args(&args) {
    Invocation::Help => {
      println!("{USAGE}");
      ExitCode::SUCCESS
    }
    Invocation::Usage => {
      eprintln!("{USAGE}");
      ExitCode::FAILURE
    }
    Invocation::Compile { input, output } => match run(input.as_deref(), output.as_deref()) {
      Ok(true) => ExitCode::SUCCESS,
      Ok(false) => ExitCode::FAILURE,
      Err(err) => {
        eprintln!("rminic: {err:#}");
        ExitCode::FAILURE
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
  }

  #[test]
  fn argument_shapes() {
    assert_eq!(
      parse_args(&args(&[])),
      Invocation::Compile {
        input: None,
        output: None
      }
    );
    assert_eq!(
      parse_args(&args(&["a.mini", "a.s"])),
      Invocation::Compile {
        input: Some("a.mini".into()),
        output: Some("a.s".into())
      }
    );
    assert_eq!(parse_args(&args(&["a", "b", "c"])), Invocation::Usage);
    assert_eq!(parse_args(&args(&["a.mini", "--help"])), Invocation::Help);
    assert_eq!(parse_args(&args(&["-h", "x", "y", "z"])), Invocation::Help);
  }
}
