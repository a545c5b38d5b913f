/*!

The expression DAG. An expression is a single concrete record with a name, an optional tensor
type, an ordered list of shared immutable children, metadata flags, and a 64-bit content hash
computed once at construction. There is no sum type over literal/identifier/composite: the three
classifications are predicates over the metadata (`is_literal`, `is_identifier`, `is_call`), which
keeps the discrimination tree uniform.

`Expr` is the shared handle: a cheap-to-clone atomically reference-counted pointer. Expressions
are immutable after construction and therefore freely shareable across threads for read. Any
change produces a new node; the DAG is acyclic by construction.

Two expressions with identical hash and content compare equal (structural equality); the hash is
a fast reject, never a proof.

*/

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use djup_abs::{
  hash::{Hash, HashType},
  join_string,
  IString,
};

use crate::core::{
  builtins,
  error::{Error, Result},
  tensor_type::TensorType,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
  pub line: u32,
  pub column: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ExpressionMetadata {
  pub is_constant: bool,
  pub is_literal: bool,
  pub is_identifier: bool,
  pub source_location: Option<SourceLocation>,
}

pub struct Expression {
  name: IString,
  tensor_type: Option<TensorType>,
  arguments: Vec<Expr>,
  metadata: ExpressionMetadata,
  hash: HashType,
}

impl Expression {
  #[inline(always)]
  pub fn name(&self) -> &IString {
    &self.name
  }

  #[inline(always)]
  pub fn tensor_type(&self) -> Option<&TensorType> {
    self.tensor_type.as_ref()
  }

  #[inline(always)]
  pub fn arguments(&self) -> &[Expr] {
    &self.arguments
  }

  #[inline(always)]
  pub fn argument(&self, index: usize) -> &Expr {
    &self.arguments[index]
  }

  #[inline(always)]
  pub fn metadata(&self) -> &ExpressionMetadata {
    &self.metadata
  }

  #[inline(always)]
  pub fn hash(&self) -> HashType {
    self.hash
  }

  #[inline(always)]
  pub fn is_constant(&self) -> bool {
    self.metadata.is_constant
  }

  #[inline(always)]
  pub fn is_literal(&self) -> bool {
    self.metadata.is_literal
  }

  #[inline(always)]
  pub fn is_identifier(&self) -> bool {
    self.metadata.is_identifier
  }

  /// A call is anything that is neither a literal nor an identifier, including tuples and
  /// repetition wrappers.
  #[inline(always)]
  pub fn is_call(&self) -> bool {
    !self.metadata.is_literal && !self.metadata.is_identifier
  }
}

/// Shared handle to an immutable expression node.
#[derive(Clone)]
pub struct Expr {
  inner: Arc<Expression>,
}

impl Deref for Expr {
  type Target = Expression;

  #[inline(always)]
  fn deref(&self) -> &Expression {
    &self.inner
  }
}

impl Expr {
  /// Pointer identity, usable as a fast path before structural comparison.
  #[inline(always)]
  pub fn same_node(&self, other: &Expr) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

/// The hash is folded in a fixed order: name, type, argument hashes in order, flags.
fn compute_hash(
  name: &IString,
  tensor_type: &Option<TensorType>,
  arguments: &[Expr],
  metadata: &ExpressionMetadata,
) -> HashType {
  let mut hash = Hash::new();
  hash.combine_str(name);
  match tensor_type {
    None => {
      hash.combine_u64(0);
    }
    Some(tensor_type) => {
      hash.combine_u64(1);
      tensor_type.hash_into(&mut hash);
    }
  }
  hash.combine_u64(arguments.len() as u64);
  for argument in arguments {
    hash.combine_hash(argument.hash());
  }
  hash.combine_bool(metadata.is_constant);
  hash.combine_bool(metadata.is_literal);
  hash.combine_bool(metadata.is_identifier);
  hash.value()
}

fn new_expression(
  name: IString,
  tensor_type: Option<TensorType>,
  arguments: Vec<Expr>,
  metadata: ExpressionMetadata,
) -> Expr {
  let hash = compute_hash(&name, &tensor_type, &arguments, &metadata);
  Expr { inner: Arc::new(Expression { name, tensor_type, arguments, metadata, hash }) }
}

pub fn make_literal_bool(value: bool) -> Expr {
  let metadata = ExpressionMetadata { is_constant: true, is_literal: true, ..Default::default() };
  new_expression(
    IString::from(if value { "true" } else { "false" }),
    Some(TensorType::scalar(builtins::BOOL.clone())),
    Vec::new(),
    metadata,
  )
}

pub fn make_literal_integer(value: i64) -> Expr {
  let metadata = ExpressionMetadata { is_constant: true, is_literal: true, ..Default::default() };
  new_expression(
    IString::from(value.to_string().as_str()),
    Some(TensorType::scalar(builtins::INT.clone())),
    Vec::new(),
    metadata,
  )
}

/// A named typed variable, used in patterns and in substitution results. Identifiers are never
/// constant. An empty name is allowed (an anonymous identifier); all anonymous identifiers of a
/// pattern share one binding.
pub fn make_identifier(tensor_type: TensorType, name: impl Into<IString>) -> Expr {
  let metadata = ExpressionMetadata { is_identifier: true, ..Default::default() };
  new_expression(name.into(), Some(tensor_type), Vec::new(), metadata)
}

/// A composite with a function name and an ordered list of arguments. `is_constant` is the AND of
/// the children's constness. Empty repetitions are rejected.
pub fn make_composite(name: impl Into<IString>, arguments: Vec<Expr>) -> Result<Expr> {
  make_composite_typed(None, name, arguments, None)
}

pub fn make_composite_typed(
  tensor_type: Option<TensorType>,
  name: impl Into<IString>,
  arguments: Vec<Expr>,
  source_location: Option<SourceLocation>,
) -> Result<Expr> {
  let name = name.into();

  if name.is_empty() {
    return Err(Error::MalformedExpression { detail: "a composite needs a function name".to_string() });
  }
  if builtins::is_repetition_name(&name) && arguments.is_empty() {
    return Err(Error::EmptyRepetition { name });
  }

  let metadata = ExpressionMetadata {
    is_constant: arguments.iter().all(|argument| argument.is_constant()),
    is_literal: false,
    is_identifier: false,
    source_location,
  };
  Ok(new_expression(name, tensor_type, arguments, metadata))
}

/// The anonymous ordered collection; variadic bindings materialize as (possibly nested) tuples.
pub fn make_tuple(arguments: Vec<Expr>) -> Expr {
  let metadata = ExpressionMetadata {
    is_constant: arguments.iter().all(|argument| argument.is_constant()),
    ..Default::default()
  };
  new_expression(builtins::TUPLE.clone(), None, arguments, metadata)
}

/// Structural equality. O(1) on the content hash, falling back to a structural walk on collision.
pub fn always_equal(first: &Expr, second: &Expr) -> bool {
  if first.same_node(second) {
    return true;
  }
  if first.hash() != second.hash() {
    return false;
  }

  if first.name() != second.name() {
    return false;
  }
  match (first.tensor_type(), second.tensor_type()) {
    (None, None) => {}
    (Some(a), Some(b)) if a.equals(b) => {}
    _ => return false,
  }
  let first_meta = first.metadata();
  let second_meta = second.metadata();
  if first_meta.is_constant != second_meta.is_constant
      || first_meta.is_literal != second_meta.is_literal
      || first_meta.is_identifier != second_meta.is_identifier
  {
    return false;
  }

  if first.arguments().len() != second.arguments().len() {
    return false;
  }
  first
      .arguments()
      .iter()
      .zip(second.arguments())
      .all(|(a, b)| always_equal(a, b))
}

// Structural equality for `Expr`, so expressions can key hash maps. Not pointer identity.
impl PartialEq for Expr {
  fn eq(&self, other: &Self) -> bool {
    always_equal(self, other)
  }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    state.write_u64(self.inner.hash);
  }
}

fn repetition_suffix(name: &IString) -> Option<&'static str> {
  if *name == *builtins::REPETITIONS_ZERO_TO_MANY {
    Some("...")
  } else if *name == *builtins::REPETITIONS_ONE_TO_MANY {
    Some("..")
  } else if *name == *builtins::REPETITIONS_ZERO_TO_ONE {
    Some("?")
  } else {
    None
  }
}

/// Diagnostic rendering; the output is not normative.
impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    format_expression(self, f)
  }
}

impl fmt::Debug for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    format_expression(self, f)
  }
}

fn format_expression(expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
  if expr.is_literal() {
    return write!(f, "{}", expr.name());
  }
  if expr.is_identifier() {
    return if expr.name().is_empty() {
      match expr.tensor_type() {
        Some(tensor_type) => write!(f, "{}", tensor_type),
        None => write!(f, "_"),
      }
    } else {
      write!(f, "{}", expr.name())
    };
  }

  if let Some(suffix) = repetition_suffix(expr.name()) {
    return if expr.arguments().len() == 1 {
      write!(f, "{}{}", expr.argument(0), suffix)
    } else {
      write!(f, "({}){}", join_string(expr.arguments().iter(), ", "), suffix)
    };
  }
  if *expr.name() == *builtins::ASSOCIATIVE_IDENTIFIER && expr.arguments().len() == 1 {
    return write!(f, "{}", expr.argument(0));
  }

  write!(f, "{}({})", expr.name(), join_string(expr.arguments().iter(), ", "))
}

/// Renders an expression tree as GraphViz dot text, one node per DAG node reached. Shared
/// sub-expressions come out as shared nodes. Diagnostics only.
pub fn expression_to_dot(source: &Expr, graph_name: &str) -> String {
  use std::collections::HashMap;

  let mut graph = djup_abs::DotGraph::new(graph_name);
  let mut visited: HashMap<Expr, usize> = HashMap::new();

  fn visit(expr: &Expr, graph: &mut djup_abs::DotGraph, visited: &mut HashMap<Expr, usize>) -> usize {
    if let Some(&id) = visited.get(expr) {
      return id;
    }
    let id = visited.len();
    visited.insert(expr.clone(), id);

    let label = if expr.is_call() && !expr.arguments().is_empty() {
      expr.name().to_string()
    } else {
      expr.to_string()
    };
    graph.add_node(format!("e{}", id), label);

    for argument in expr.arguments() {
      let child = visit(argument, graph, visited);
      graph.add_edge(format!("e{}", id), format!("e{}", child), "");
    }
    id
  }

  visit(source, &mut graph, &mut visited);
  graph.to_dot()
}
