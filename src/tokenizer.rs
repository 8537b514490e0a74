//! Lexical analysis: source text to a flat, positioned token vector.
//!
//! The tokenizer knows nothing about semantics beyond recognising
//! punctuators, literals, identifiers and keywords. Multi-character
//! punctuators are matched before their single-character prefixes so that
//! `:=` never splits into `:` and `=`.

use std::fmt;

use tracing::debug;

use crate::error::{CompileError, CompileResult};

/// Token categories. Operators and keywords each get their own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  LParen,
  RParen,
  LBrace,
  RBrace,
  Semicolon,
  Comma,
  Colon,
  Assign,
  Plus,
  Minus,
  Times,
  Div,
  Mod,
  Not,
  Eq,
  Neq,
  Lt,
  Gt,
  Lte,
  Gte,
  If,
  Then,
  Else,
  While,
  Do,
  IntConst,
  BoolConst,
  Identifier,
  Eof,
}

impl TokenKind {
  /// Whether the token text is worth showing next to the kind in diagnostics.
  fn carries_text(self) -> bool {
    matches!(
      self,
      TokenKind::IntConst | TokenKind::BoolConst | TokenKind::Identifier
    )
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TokenKind::LParen => "'('",
      TokenKind::RParen => "')'",
      TokenKind::LBrace => "'{'",
      TokenKind::RBrace => "'}'",
      TokenKind::Semicolon => "';'",
      TokenKind::Comma => "','",
      TokenKind::Colon => "':'",
      TokenKind::Assign => "':='",
      TokenKind::Plus => "'+'",
      TokenKind::Minus => "'-'",
      TokenKind::Times => "'*'",
      TokenKind::Div => "'/'",
      TokenKind::Mod => "'%'",
      TokenKind::Not => "'!'",
      TokenKind::Eq => "'=='",
      TokenKind::Neq => "'<>'",
      TokenKind::Lt => "'<'",
      TokenKind::Gt => "'>'",
      TokenKind::Lte => "'<='",
      TokenKind::Gte => "'>='",
      TokenKind::If => "'if'",
      TokenKind::Then => "'then'",
      TokenKind::Else => "'else'",
      TokenKind::While => "'while'",
      TokenKind::Do => "'do'",
      TokenKind::IntConst => "integer",
      TokenKind::BoolConst => "boolean",
      TokenKind::Identifier => "identifier",
      TokenKind::Eof => "end of input",
    };
    f.write_str(name)
  }
}

/// A single lexeme together with where it started. Columns are 1-based and
/// `end_col` points one past the last character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: usize,
  pub col: usize,
  pub end_col: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
    let text = text.into();
    let end_col = col + text.chars().count();
    Self {
      kind,
      text,
      line,
      col,
      end_col,
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Token {
      kind,
      text,
      line,
      col,
      ..
    } = self;
    if kind.carries_text() {
      write!(f, "{kind:?}({text})@{line}:{col}")
    } else {
      write!(f, "{kind:?}@{line}:{col}")
    }
  }
}

/// Fixed-text tokens in trial order. Longer spellings precede their prefixes.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
  (":=", TokenKind::Assign),
  ("==", TokenKind::Eq),
  ("<>", TokenKind::Neq),
  ("!=", TokenKind::Neq),
  ("<=", TokenKind::Lte),
  (">=", TokenKind::Gte),
  (":", TokenKind::Colon),
  ("<", TokenKind::Lt),
  (">", TokenKind::Gt),
  ("!", TokenKind::Not),
  ("(", TokenKind::LParen),
  (")", TokenKind::RParen),
  ("{", TokenKind::LBrace),
  ("}", TokenKind::RBrace),
  (";", TokenKind::Semicolon),
  (",", TokenKind::Comma),
  ("+", TokenKind::Plus),
  ("-", TokenKind::Minus),
  ("*", TokenKind::Times),
  ("/", TokenKind::Div),
  ("%", TokenKind::Mod),
];

/// Boolean literals are tried before the identifier scan, so `trueish` lexes
/// as `true` followed by `ish`.
const BOOL_LITERALS: &[&str] = &["true", "false"];

/// Identifiers that are reclassified after matching.
fn keyword(ident: &str) -> Option<TokenKind> {
  match ident {
    "if" => Some(TokenKind::If),
    "then" => Some(TokenKind::Then),
    "else" => Some(TokenKind::Else),
    "while" => Some(TokenKind::While),
    "do" => Some(TokenKind::Do),
    _ => None,
  }
}

/// Cursor that keeps the line/column bookkeeping in one place.
struct Cursor<'a> {
  input: &'a str,
  pos: usize,
  line: usize,
  col: usize,
}

impl<'a> Cursor<'a> {
  fn new(input: &'a str) -> Self {
    Self {
      input,
      pos: 0,
      line: 1,
      col: 1,
    }
  }

  fn rest(&self) -> &'a str {
    &self.input[self.pos..]
  }

  /// Move past `len` bytes. `\n` starts a new line and `\r` takes no column.
  fn advance(&mut self, len: usize) {
    let consumed = &self.input[self.pos..self.pos + len];
    for c in consumed.chars() {
      match c {
        '\n' => {
          self.line += 1;
          self.col = 1;
        }
        '\r' => {}
        _ => self.col += 1,
      }
    }
    self.pos += len;
  }

  fn skip_whitespace(&mut self) {
    let len = self
      .rest()
      .find(|c: char| !c.is_whitespace())
      .unwrap_or(self.rest().len());
    self.advance(len);
  }

  /// Length of the leading run of bytes satisfying `pred`, given that the
  /// first byte satisfies `first`.
  fn scan(&self, first: impl Fn(u8) -> bool, pred: impl Fn(u8) -> bool) -> usize {
    let bytes = self.rest().as_bytes();
    match bytes.first() {
      Some(&b) if first(b) => 1 + bytes[1..].iter().take_while(|&&b| pred(b)).count(),
      _ => 0,
    }
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let mut cur = Cursor::new(input);

  cur.skip_whitespace();
  while !cur.rest().is_empty() {
    let (line, col) = (cur.line, cur.col);

    if let Some(&(text, kind)) = PUNCTUATORS
      .iter()
      .find(|(text, _)| cur.rest().starts_with(text))
    {
      tokens.push(Token::new(kind, text, line, col));
      cur.advance(text.len());
      cur.skip_whitespace();
      continue;
    }

    let digits = cur.scan(|b| b.is_ascii_digit(), |b| b.is_ascii_digit());
    if digits > 0 {
      let text = &cur.rest()[..digits];
      tokens.push(Token::new(TokenKind::IntConst, text, line, col));
      cur.advance(digits);
      cur.skip_whitespace();
      continue;
    }

    if let Some(&text) = BOOL_LITERALS
      .iter()
      .find(|text| cur.rest().starts_with(*text))
    {
      tokens.push(Token::new(TokenKind::BoolConst, text, line, col));
      cur.advance(text.len());
      cur.skip_whitespace();
      continue;
    }

    let ident = cur.scan(
      |b| b.is_ascii_alphabetic() || b == b'_',
      |b| b.is_ascii_alphanumeric() || b == b'_',
    );
    if ident > 0 {
      let text = &cur.rest()[..ident];
      let kind = keyword(text).unwrap_or(TokenKind::Identifier);
      tokens.push(Token::new(kind, text, line, col));
      cur.advance(ident);
      cur.skip_whitespace();
      continue;
    }

    let invalid_char = cur.rest().chars().next().unwrap_or('\0');
    return Err(CompileError::lex(
      line,
      col,
      format!("cannot tokenize at '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, "", cur.line, cur.col));
  debug!(count = tokens.len(), "tokenized source");
  Ok(tokens)
}
