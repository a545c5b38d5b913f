/*!

Hand-written lexer for the surface syntax. Symbols are recognized longest-first, so `...` shadows
`..`. Names and keywords share one token shape; `true`/`false` are turned into bool literals.

*/

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
  Name(String),
  IntegerLiteral(i64),
  BoolLiteral(bool),

  LeftParenthesis,
  RightParenthesis,
  LeftBracket,
  RightBracket,

  Comma,

  Plus,
  Minus,
  Star,
  Slash,
  Caret,

  /// `...`
  ZeroToMany,
  /// `..`
  OneToMany,
  /// `?`
  ZeroToOne,

  EndOfSource,
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TokenKind::Name(name) => write!(f, "{}", name),
      TokenKind::IntegerLiteral(value) => write!(f, "{}", value),
      TokenKind::BoolLiteral(value) => write!(f, "{}", value),
      TokenKind::LeftParenthesis => write!(f, "("),
      TokenKind::RightParenthesis => write!(f, ")"),
      TokenKind::LeftBracket => write!(f, "["),
      TokenKind::RightBracket => write!(f, "]"),
      TokenKind::Comma => write!(f, ","),
      TokenKind::Plus => write!(f, "+"),
      TokenKind::Minus => write!(f, "-"),
      TokenKind::Star => write!(f, "*"),
      TokenKind::Slash => write!(f, "/"),
      TokenKind::Caret => write!(f, "^"),
      TokenKind::ZeroToMany => write!(f, "..."),
      TokenKind::OneToMany => write!(f, ".."),
      TokenKind::ZeroToOne => write!(f, "?"),
      TokenKind::EndOfSource => write!(f, "<end of source>"),
    }
  }
}

#[derive(Clone, Debug)]
pub struct Token {
  pub kind: TokenKind,
  pub line: u32,
  pub column: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
  pub message: String,
  pub line: u32,
  pub column: u32,
}

impl ParseError {
  pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
    ParseError { message: message.into(), line, column }
  }
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}: {}", self.line, self.column, self.message)
  }
}

impl std::error::Error for ParseError {}

struct Scanner<'s> {
  rest: &'s str,
  line: u32,
  column: u32,
}

impl<'s> Scanner<'s> {
  fn peek(&self) -> Option<char> {
    self.rest.chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let ch = self.rest.chars().next()?;
    self.rest = &self.rest[ch.len_utf8()..];
    if ch == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(ch)
  }

  fn eat(&mut self, prefix: &str) -> bool {
    if self.rest.starts_with(prefix) {
      for _ in 0..prefix.chars().count() {
        self.bump();
      }
      true
    } else {
      false
    }
  }
}

fn is_name_start(ch: char) -> bool {
  ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_continuation(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_'
}

/// Tokenizes the whole source, appending an `EndOfSource` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
  let mut scanner = Scanner { rest: source, line: 1, column: 1 };
  let mut tokens = Vec::new();

  loop {
    while matches!(scanner.peek(), Some(ch) if ch.is_whitespace()) {
      scanner.bump();
    }

    let line = scanner.line;
    let column = scanner.column;

    let ch = match scanner.peek() {
      None => {
        tokens.push(Token { kind: TokenKind::EndOfSource, line, column });
        return Ok(tokens);
      }
      Some(ch) => ch,
    };

    // Multi-character symbols first, so `...` shadows `..`.
    let symbol = if scanner.eat("...") {
      Some(TokenKind::ZeroToMany)
    } else if scanner.eat("..") {
      Some(TokenKind::OneToMany)
    } else if scanner.eat("?") {
      Some(TokenKind::ZeroToOne)
    } else if scanner.eat("(") {
      Some(TokenKind::LeftParenthesis)
    } else if scanner.eat(")") {
      Some(TokenKind::RightParenthesis)
    } else if scanner.eat("[") {
      Some(TokenKind::LeftBracket)
    } else if scanner.eat("]") {
      Some(TokenKind::RightBracket)
    } else if scanner.eat(",") {
      Some(TokenKind::Comma)
    } else if scanner.eat("+") {
      Some(TokenKind::Plus)
    } else if scanner.eat("-") {
      Some(TokenKind::Minus)
    } else if scanner.eat("*") {
      Some(TokenKind::Star)
    } else if scanner.eat("/") {
      Some(TokenKind::Slash)
    } else if scanner.eat("^") {
      Some(TokenKind::Caret)
    } else {
      None
    };
    if let Some(kind) = symbol {
      tokens.push(Token { kind, line, column });
      continue;
    }

    if ch.is_ascii_digit() {
      let mut text = String::new();
      while matches!(scanner.peek(), Some(digit) if digit.is_ascii_digit()) {
        text.push(scanner.bump().unwrap());
      }
      let value = text
          .parse::<i64>()
          .map_err(|_| ParseError::new(format!("integer literal out of range: {}", text), line, column))?;
      tokens.push(Token { kind: TokenKind::IntegerLiteral(value), line, column });
      continue;
    }

    if is_name_start(ch) {
      let mut text = String::new();
      while matches!(scanner.peek(), Some(next) if is_name_continuation(next)) {
        text.push(scanner.bump().unwrap());
      }
      let kind = match text.as_str() {
        "true" => TokenKind::BoolLiteral(true),
        "false" => TokenKind::BoolLiteral(false),
        _ => TokenKind::Name(text),
      };
      tokens.push(Token { kind, line, column });
      continue;
    }

    return Err(ParseError::new(format!("unrecognized character: {:?}", ch), line, column));
  }
}
