/*!

Operator-precedence parser for the conventional surface syntax:

 - `"3"`, `"true"`: literals;
 - `"real x"`, `"any a"`, `"int [2, 3] m"`: typed identifiers (scalar type, optional shape,
   optional name; a name is an identifier exactly when it starts with a scalar type declared in
   the namespace, which is why parsing takes an explicit namespace);
 - `"f(a, b)"` or `"f(a b)"`: calls, comma and whitespace separators both accepted;
 - `"x..."`, `"x.."`, `"x?"`: variadic modifiers; applied to an anonymous tuple, the tuple's
   elements become the repetition's sub-patterns: `"(bool c, real v)..."`;
 - `"(a, b)"`: anonymous tuples (a single parenthesized expression is just grouping);
 - `"[a, b]"`: stack (tensor) literals;
 - `+ - * / ^` with conventional precedence, `^` right-associative, unary `+`/`-`.

*/

mod lexer;

use djup_abs::IString;
use djup_lib::{
  core::{
    builtins,
    shape::ConstantShape,
    tensor_type::{Shape, TensorType},
  },
  make_composite_typed,
  make_identifier,
  make_literal_bool,
  make_literal_integer,
  make_tuple,
  Expr,
  Namespace,
  SourceLocation,
};

use lexer::{tokenize, Token, TokenKind};

pub use lexer::ParseError;

type PResult<T> = Result<T, ParseError>;

/// Parses a single expression; the whole source must be consumed.
pub fn parse_expression(source: &str, namespace: &Namespace) -> PResult<Expr> {
  let tokens = tokenize(source)?;
  let mut parser = Parser { tokens, position: 0, namespace };

  let expr = parser.parse_binary(0)?;
  match parser.peek().kind {
    TokenKind::EndOfSource => Ok(expr),
    ref unexpected => Err(parser.error_here(format!("unexpected {}", unexpected))),
  }
}

struct Parser<'a> {
  tokens: Vec<Token>,
  position: usize,
  namespace: &'a Namespace,
}

impl<'a> Parser<'a> {
  fn peek(&self) -> &Token {
    &self.tokens[self.position.min(self.tokens.len() - 1)]
  }

  fn advance(&mut self) -> Token {
    let token = self.peek().clone();
    if self.position + 1 < self.tokens.len() {
      self.position += 1;
    }
    token
  }

  fn accept(&mut self, kind: &TokenKind) -> bool {
    if self.peek().kind == *kind {
      self.advance();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, kind: &TokenKind) -> PResult<()> {
    if self.accept(kind) {
      Ok(())
    } else {
      Err(self.error_here(format!("expected {}, found {}", kind, self.peek().kind)))
    }
  }

  fn error_here(&self, message: String) -> ParseError {
    let token = self.peek();
    ParseError::new(message, token.line, token.column)
  }

  fn location_here(&self) -> SourceLocation {
    let token = self.peek();
    SourceLocation { line: token.line, column: token.column }
  }

  /// Lifts an engine construction error into a parse error at the current location.
  fn lift(&self, result: djup_lib::Result<Expr>) -> PResult<Expr> {
    result.map_err(|error| self.error_here(error.to_string()))
  }

  // https://en.wikipedia.org/wiki/Operator-precedence_parser
  fn parse_binary(&mut self, min_precedence: u32) -> PResult<Expr> {
    let mut left = self.parse_unary()?;

    loop {
      let (name, precedence, right_associative) = match self.peek().kind {
        TokenKind::Plus => (builtins::ADD.clone(), 500, false),
        TokenKind::Minus => (builtins::SUB.clone(), 500, false),
        TokenKind::Star => (builtins::MUL.clone(), 600, false),
        TokenKind::Slash => (builtins::DIV.clone(), 600, false),
        TokenKind::Caret => (builtins::POW.clone(), 700, true),
        _ => break,
      };
      if precedence < min_precedence {
        break;
      }

      let location = self.location_here();
      self.advance();

      let next_min = if right_associative { precedence } else { precedence + 1 };
      let right = self.parse_binary(next_min)?;
      left = self.lift(make_composite_typed(None, name, vec![left, right], Some(location)))?;
    }

    Ok(left)
  }

  fn parse_unary(&mut self) -> PResult<Expr> {
    match self.peek().kind {
      TokenKind::Plus => {
        self.advance();
        self.parse_unary()
      }
      TokenKind::Minus => {
        let location = self.location_here();
        self.advance();
        let operand = self.parse_unary()?;
        self.lift(make_composite_typed(None, builtins::NEG.clone(), vec![operand], Some(location)))
      }
      _ => {
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
      }
    }
  }

  /// Wraps the expression in repetition composites for each trailing `...`/`..`/`?`. A wrapped
  /// anonymous tuple contributes its elements as the repetition's sub-patterns.
  fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
    loop {
      let wrapper = match self.peek().kind {
        TokenKind::ZeroToMany => builtins::REPETITIONS_ZERO_TO_MANY.clone(),
        TokenKind::OneToMany => builtins::REPETITIONS_ONE_TO_MANY.clone(),
        TokenKind::ZeroToOne => builtins::REPETITIONS_ZERO_TO_ONE.clone(),
        _ => return Ok(expr),
      };
      let location = self.location_here();
      self.advance();

      let sub_patterns = if expr.is_call() && *expr.name() == *builtins::TUPLE {
        expr.arguments().to_vec()
      } else {
        vec![expr]
      };
      expr = self.lift(make_composite_typed(None, wrapper, sub_patterns, Some(location)))?;
    }
  }

  fn parse_primary(&mut self) -> PResult<Expr> {
    let location = self.location_here();
    let token = self.advance();

    match token.kind {
      TokenKind::IntegerLiteral(value) => Ok(make_literal_integer(value)),
      TokenKind::BoolLiteral(value) => Ok(make_literal_bool(value)),

      TokenKind::Name(name) => {
        let interned = IString::from(name.as_str());
        if self.namespace.is_scalar_type(&interned) {
          return self.parse_identifier(interned);
        }

        if self.accept(&TokenKind::LeftParenthesis) {
          let arguments = self.parse_list(TokenKind::RightParenthesis)?;
          self.lift(make_composite_typed(None, interned, arguments, Some(location)))
        } else {
          self.lift(make_composite_typed(None, interned, Vec::new(), Some(location)))
        }
      }

      TokenKind::LeftParenthesis => {
        let mut elements = self.parse_list(TokenKind::RightParenthesis)?;
        if elements.len() == 1 {
          Ok(elements.pop().unwrap())
        } else {
          Ok(make_tuple(elements))
        }
      }

      TokenKind::LeftBracket => {
        let elements = self.parse_list(TokenKind::RightBracket)?;
        self.lift(make_composite_typed(None, builtins::STACK.clone(), elements, Some(location)))
      }

      ref unexpected => Err(ParseError::new(
        format!("unexpected {}", unexpected),
        token.line,
        token.column,
      )),
    }
  }

  /// `scalar_type [shape]? name?`. The shape is constant when every element is an integer
  /// literal, otherwise it is a variable shape expression. The name may be omitted.
  fn parse_identifier(&mut self, scalar_type: IString) -> PResult<Expr> {
    let shape = if self.accept(&TokenKind::LeftBracket) {
      let elements = self.parse_list(TokenKind::RightBracket)?;

      let as_dimensions: Option<Vec<i64>> = elements
          .iter()
          .map(|element| {
            if element.is_literal() {
              element.name().parse::<i64>().ok()
            } else {
              None
            }
          })
          .collect();

      match as_dimensions {
        Some(dimensions) => {
          let shape = ConstantShape::new(&dimensions)
              .map_err(|error| self.error_here(error.to_string()))?;
          Shape::Constant(shape)
        }
        None => {
          let stack = self.lift(make_composite_typed(None, builtins::STACK.clone(), elements, None))?;
          Shape::Variable(stack)
        }
      }
    } else {
      Shape::Unknown
    };

    let name = match self.peek().kind {
      TokenKind::Name(ref name) => {
        let name = name.clone();
        self.advance();
        name
      }
      _ => String::new(),
    };

    Ok(make_identifier(TensorType::new(scalar_type, shape), name.as_str()))
  }

  /// Parses a comma- or whitespace-separated list of expressions up to the terminator.
  fn parse_list(&mut self, terminator: TokenKind) -> PResult<Vec<Expr>> {
    let mut result = Vec::new();
    loop {
      if self.accept(&terminator) {
        return Ok(result);
      }
      if self.peek().kind == TokenKind::EndOfSource {
        return Err(self.error_here(format!("expected {} before the end of source", terminator)));
      }
      result.push(self.parse_binary(0)?);
      self.accept(&TokenKind::Comma);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use djup_lib::always_equal;

  fn parse(source: &str) -> Expr {
    let namespace = Namespace::standard();
    parse_expression(source, &namespace).unwrap_or_else(|error| panic!("{}: {}", source, error))
  }

  #[test]
  fn literals_and_calls() {
    assert!(parse("3").is_literal());
    assert!(parse("true").is_literal());

    let call = parse("f(1, 2, 3)");
    assert!(call.is_call());
    assert_eq!(call.arguments().len(), 3);

    // Whitespace separation is equivalent to commas.
    assert!(always_equal(&parse("f(1 2 3)"), &parse("f(1, 2, 3)")));
  }

  #[test]
  fn typed_identifiers() {
    let x = parse("real x");
    assert!(x.is_identifier());
    assert_eq!(x.name().as_ref(), "x");
    assert_eq!(x.tensor_type().unwrap().scalar_type().as_ref(), "real");

    let a = parse("any a");
    assert_eq!(a.tensor_type().unwrap().scalar_type().as_ref(), "any");

    // Anonymous identifier.
    let anonymous = parse("f(real)").argument(0).clone();
    assert!(anonymous.is_identifier());
    assert!(anonymous.name().is_empty());
  }

  #[test]
  fn constant_shapes() {
    let m = parse("int [2, 3] m");
    match m.tensor_type().unwrap().shape() {
      Shape::Constant(shape) => assert_eq!(shape.dimensions(), &[2, 3]),
      other => panic!("unexpected shape {:?}", other),
    }
  }

  #[test]
  fn variadic_modifiers() {
    let rep = parse("f(real x...)").argument(0).clone();
    assert_eq!(*rep.name(), *builtins::REPETITIONS_ZERO_TO_MANY);
    assert_eq!(rep.arguments().len(), 1);

    let rep = parse("f(real x..)").argument(0).clone();
    assert_eq!(*rep.name(), *builtins::REPETITIONS_ONE_TO_MANY);

    let rep = parse("f(real x?)").argument(0).clone();
    assert_eq!(*rep.name(), *builtins::REPETITIONS_ZERO_TO_ONE);
  }

  #[test]
  fn tuple_repetition_contributes_elements() {
    let rep = parse("If((bool c, real v)..., real default)").argument(0).clone();
    assert_eq!(*rep.name(), *builtins::REPETITIONS_ZERO_TO_MANY);
    assert_eq!(rep.arguments().len(), 2);
    assert!(rep.argument(0).is_identifier());
    assert!(rep.argument(1).is_identifier());
  }

  #[test]
  fn grouping_and_tuples() {
    // A single parenthesized expression is just grouping.
    assert!(always_equal(&parse("(3)"), &parse("3")));

    let tuple = parse("(1, 2)");
    assert_eq!(*tuple.name(), *builtins::TUPLE);
    assert_eq!(tuple.arguments().len(), 2);
  }

  #[test]
  fn operator_precedence() {
    // 1 + 2 * 3 parses as Add(1, Mul(2, 3)).
    let expr = parse("1 + 2 * 3");
    assert_eq!(*expr.name(), *builtins::ADD);
    assert_eq!(*expr.argument(1).name(), *builtins::MUL);

    // 2 ^ 3 ^ 4 is right-associative.
    let expr = parse("2 ^ 3 ^ 4");
    assert_eq!(*expr.name(), *builtins::POW);
    assert_eq!(*expr.argument(1).name(), *builtins::POW);

    let expr = parse("-x + y");
    assert_eq!(*expr.name(), *builtins::ADD);
    assert_eq!(*expr.argument(0).name(), *builtins::NEG);
  }

  #[test]
  fn parse_errors_carry_locations() {
    let namespace = Namespace::standard();
    let error = parse_expression("f(1,", &namespace).unwrap_err();
    assert_eq!(error.line, 1);

    assert!(parse_expression("f(1) garbage", &namespace).is_err());
    assert!(parse_expression("()...", &namespace).is_err()); // empty repetition
  }
}
