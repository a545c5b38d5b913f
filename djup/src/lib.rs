#![allow(dead_code)]
/*!

Front end for the djup engine: a lexer and an operator-precedence parser for the conventional
surface syntax, producing expression DAGs against an explicit namespace.

```
use djup::parse_expression;
use djup_lib::Namespace;

let namespace = Namespace::standard();
let expr = parse_expression("f(1, Sin(real x)..., true)", &namespace).unwrap();
assert_eq!(expr.to_string(), "f(1, Sin(x)..., true)");
```

*/

mod parser;

pub use parser::{parse_expression, ParseError};

#[cfg(test)]
mod tests;
