//! Recursive-descent parser producing a statement tree.
//!
//! Statements are dispatched on the first token, plus the second one to tell
//! a declaration (`x : int := ...`) from an assignment (`x := ...`).
//! Expressions use three precedence tiers, tightest first:
//!
//! ```text
//! atom       ::= '(' expr ')' | '-' atom | '!' atom | INT | BOOL | IDENT | IDENT '(' args ')'
//! product    ::= atom (('*' | '/' | '%') atom)*
//! sum        ::= product (('+' | '-') product)*
//! expr       ::= sum (('==' | '<>' | '<' | '>' | '<=' | '>=') sum)?
//! ```
//!
//! Comparisons are deliberately non-associative: `a < b < c` leaves a
//! dangling `<` that no rule accepts.

use tracing::debug;

use crate::ast::{Expr, Statement};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind};
use crate::ty::Type;

/// Parse a complete statement. The whole token stream must be consumed.
pub fn parse_statement(tokens: &[Token]) -> CompileResult<Statement> {
  let mut stream = TokenStream::new(tokens);
  let stmt = parse_stmt(&mut stream)?;
  stream.expect(TokenKind::Eof)?;
  debug!(kind = stmt.kind_name(), "parsed statement");
  Ok(stmt)
}

/// Parse a complete expression. The whole token stream must be consumed.
pub fn parse_expr(tokens: &[Token]) -> CompileResult<Expr> {
  let mut stream = TokenStream::new(tokens);
  let expr = parse_comparison(&mut stream)?;
  stream.expect(TokenKind::Eof)?;
  Ok(expr)
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Statement> {
  match (stream.peek().kind, stream.peek_second().kind) {
    (TokenKind::LBrace, _) => parse_block(stream),
    (TokenKind::While, _) => parse_while(stream),
    (TokenKind::If, _) => parse_if(stream),
    (TokenKind::Identifier, TokenKind::Colon) => parse_declaration(stream),
    (TokenKind::Identifier, TokenKind::Assign) => parse_assignment(stream),
    _ => {
      let expr = parse_comparison(stream)?;
      stream.expect(TokenKind::Semicolon)?;
      Ok(Statement::Expr(expr))
    }
  }
}

fn parse_block(stream: &mut TokenStream) -> CompileResult<Statement> {
  stream.expect(TokenKind::LBrace)?;
  let mut stmts = Vec::new();
  while !stream.equal(TokenKind::RBrace) {
    stmts.push(parse_stmt(stream)?);
  }
  Ok(Statement::block(stmts))
}

fn parse_while(stream: &mut TokenStream) -> CompileResult<Statement> {
  stream.expect(TokenKind::While)?;
  let cond = parse_comparison(stream)?;
  stream.expect(TokenKind::Do)?;
  let body = parse_stmt(stream)?;
  Ok(Statement::while_loop(cond, body))
}

fn parse_if(stream: &mut TokenStream) -> CompileResult<Statement> {
  stream.expect(TokenKind::If)?;
  let cond = parse_comparison(stream)?;
  stream.expect(TokenKind::Then)?;
  let then_branch = parse_stmt(stream)?;
  // A dangling else binds to the nearest if.
  if stream.equal(TokenKind::Else) {
    let else_branch = parse_stmt(stream)?;
    Ok(Statement::if_else(cond, then_branch, else_branch))
  } else {
    Ok(Statement::if_then(cond, then_branch))
  }
}

fn parse_declaration(stream: &mut TokenStream) -> CompileResult<Statement> {
  let name = stream.expect(TokenKind::Identifier)?.text.clone();
  stream.expect(TokenKind::Colon)?;
  let ty = parse_type(stream)?;
  stream.expect(TokenKind::Assign)?;
  let init = parse_comparison(stream)?;
  stream.expect(TokenKind::Semicolon)?;
  Ok(Statement::declaration(name, ty, init))
}

fn parse_assignment(stream: &mut TokenStream) -> CompileResult<Statement> {
  let name = stream.expect(TokenKind::Identifier)?.text.clone();
  stream.expect(TokenKind::Assign)?;
  let value = parse_comparison(stream)?;
  stream.expect(TokenKind::Semicolon)?;
  Ok(Statement::assignment(name, value))
}

fn parse_type(stream: &mut TokenStream) -> CompileResult<Type> {
  let token = stream.expect(TokenKind::Identifier)?;
  Type::from_name(&token.text)
    .ok_or_else(|| CompileError::type_error(format!("{} is not a known type", token.text)))
}

fn parse_comparison(stream: &mut TokenStream) -> CompileResult<Expr> {
  let lhs = parse_sum(stream)?;

  let op = stream.peek();
  if matches!(
    op.kind,
    TokenKind::Eq | TokenKind::Neq | TokenKind::Lt | TokenKind::Gt | TokenKind::Lte | TokenKind::Gte
  ) {
    let op = stream.advance().text.clone();
    let rhs = parse_sum(stream)?;
    return Ok(Expr::binary(lhs, op, rhs));
  }

  Ok(lhs)
}

fn parse_sum(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_product(stream)?;

  while matches!(stream.peek().kind, TokenKind::Plus | TokenKind::Minus) {
    let op = stream.advance().text.clone();
    let rhs = parse_product(stream)?;
    node = Expr::binary(node, op, rhs);
  }

  Ok(node)
}

fn parse_product(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_atom(stream)?;

  while matches!(
    stream.peek().kind,
    TokenKind::Times | TokenKind::Div | TokenKind::Mod
  ) {
    let op = stream.advance().text.clone();
    let rhs = parse_atom(stream)?;
    node = Expr::binary(node, op, rhs);
  }

  Ok(node)
}

fn parse_atom(stream: &mut TokenStream) -> CompileResult<Expr> {
  let token = stream.peek().clone();
  match token.kind {
    TokenKind::LParen => {
      stream.advance();
      let node = parse_comparison(stream)?;
      stream.expect(TokenKind::RParen)?;
      Ok(node)
    }
    TokenKind::Minus | TokenKind::Not => {
      stream.advance();
      let operand = parse_atom(stream)?;
      Ok(Expr::unary(token.text, operand))
    }
    TokenKind::IntConst => {
      stream.advance();
      let value = token.text.parse::<i32>().map_err(|err| {
        CompileError::parse(
          token.line,
          token.col,
          format!("invalid integer literal {}: {err}", token.text),
        )
      })?;
      Ok(Expr::int(value))
    }
    TokenKind::BoolConst => {
      stream.advance();
      Ok(Expr::bool(token.text == "true"))
    }
    TokenKind::Identifier => {
      stream.advance();
      if stream.equal(TokenKind::LParen) {
        let args = parse_arguments(stream)?;
        Ok(Expr::call(token.text, args))
      } else {
        Ok(Expr::var(token.text))
      }
    }
    _ => Err(stream.error_here(format!(
      "integer or boolean or variable expected instead of \"{}\"",
      describe_token(&token)
    ))),
  }
}

/// Comma-separated arguments after the opening parenthesis, up to and
/// including the closing one.
fn parse_arguments(stream: &mut TokenStream) -> CompileResult<Vec<Expr>> {
  let mut args = Vec::new();
  if stream.equal(TokenKind::RParen) {
    return Ok(args);
  }

  loop {
    args.push(parse_comparison(stream)?);
    if stream.equal(TokenKind::Comma) {
      continue;
    }
    stream.expect(TokenKind::RParen)?;
    return Ok(args);
  }
}

/// Human-friendly description used in diagnostics.
fn describe_token(token: &Token) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    _ => token.text.clone(),
  }
}

/// Lightweight cursor over the token slice.
struct TokenStream<'a> {
  tokens: &'a [Token],
  pos: usize,
  eof: Token,
}

impl<'a> TokenStream<'a> {
  /// Streams without a trailing `Eof` token get a synthetic one placed just
  /// past the last real token.
  fn new(tokens: &'a [Token]) -> Self {
    let eof = match tokens.last() {
      Some(last) if last.kind == TokenKind::Eof => last.clone(),
      Some(last) => Token::new(TokenKind::Eof, "", last.line, last.end_col),
      None => Token::new(TokenKind::Eof, "", 1, 1),
    };
    Self {
      tokens,
      pos: 0,
      eof,
    }
  }

  fn peek_at(&self, offset: usize) -> &Token {
    self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
  }

  fn peek(&self) -> &Token {
    self.peek_at(0)
  }

  fn peek_second(&self) -> &Token {
    self.peek_at(1)
  }

  /// Consume the current token whatever it is. `Eof` is never stepped over.
  fn advance(&mut self) -> &Token {
    let pos = self.pos;
    if self.peek().kind != TokenKind::Eof {
      self.pos += 1;
    }
    self.tokens.get(pos).unwrap_or(&self.eof)
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.peek().kind == kind && kind != TokenKind::Eof {
      self.pos += 1;
      return true;
    }
    false
  }

  fn expect(&mut self, kind: TokenKind) -> CompileResult<&Token> {
    if self.peek().kind != kind {
      let got = describe_token(self.peek());
      let message = format!("expected {kind}, but got \"{got}\"");
      return Err(self.error_here(message));
    }
    Ok(self.advance())
  }

  fn error_here(&self, message: String) -> CompileError {
    let token = self.peek();
    CompileError::parse(token.line, token.col, message)
  }
}
