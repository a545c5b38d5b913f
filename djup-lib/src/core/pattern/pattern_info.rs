/*!

Static classification of a pattern, independent of the expressions it is tested against: per-child
cardinalities, the total matchable width, and for each child the summed cardinality of all later
siblings (`remaining`), which gives O(1) pruning of impossible alignments during matching.

`PatternInfo` is computed once when a pattern enters the discrimination tree and merged into the
edge it lands on.

*/

use djup_abs::IString;

use crate::{
  api::expression::Expr,
  core::{
    builtins::{self, FunctionFlags},
    interval::Interval,
  },
};

/// Classification of a single pattern child.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExpressionKind {
  Literal,
  Identifier,
  VariadicRepetition,
  CompositeCall,
}

pub fn expression_kind(expr: &Expr) -> ExpressionKind {
  if expr.is_literal() {
    ExpressionKind::Literal
  } else if expr.is_identifier() {
    ExpressionKind::Identifier
  } else if builtins::is_variadic_wrapper_name(expr.name()) {
    ExpressionKind::VariadicRepetition
  } else {
    ExpressionKind::CompositeCall
  }
}

/// How many contiguous target arguments this node may consume. `[1, 1]` for everything except the
/// repetition wrappers and associative identifiers.
pub fn cardinality(expr: &Expr) -> Interval {
  if expr.is_call() {
    builtins::cardinality_for_name(expr.name())
  } else {
    Interval::single(1)
  }
}

/// Describes a single argument of a pattern, for example `b` in `f(a, b, c)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentInfo {
  pub kind: ExpressionKind,

  /// How many times this argument can be repeated: `[1, 1]` for plain arguments, `[0, Inf]` for
  /// `...` repetitions, and so on.
  pub cardinality: Interval,

  /// Given a target consumed by this argument, how many targets the later siblings can still
  /// consume. Redundant, but allows early rejection of matching tries.
  pub remaining: Interval,
}

/// Statically describes a pattern and its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PatternInfo {
  /// Associativity/commutativity of the pattern's function. Commutative is recorded but not yet
  /// consulted by the matcher.
  pub flags: FunctionFlags,

  /// Minimum and maximum number of targets that may match this pattern's argument list. Used to
  /// early reject target spans.
  pub arguments_range: Interval,

  /// Describes every single argument of the pattern.
  pub arguments: Vec<ArgumentInfo>,
}

impl PatternInfo {
  /// The synthetic info of a one-slot argument list, used for the root level of the tree where
  /// the whole pattern is the only label.
  pub fn single_slot(kind: ExpressionKind) -> Self {
    PatternInfo {
      flags: FunctionFlags::default(),
      arguments_range: Interval::single(1),
      arguments: vec![ArgumentInfo {
        kind,
        cardinality: Interval::single(1),
        remaining: Interval::ZERO,
      }],
    }
  }

  /// Widens this info to also cover another pattern landing on the same discrimination edge.
  pub fn merge(&mut self, other: &PatternInfo) {
    debug_assert_eq!(self.arguments.len(), other.arguments.len(), "merging unrelated pattern infos");

    self.flags |= other.flags;
    self.arguments_range |= other.arguments_range;
    for (argument, other_argument) in self.arguments.iter_mut().zip(&other.arguments) {
      argument.cardinality |= other_argument.cardinality;
      argument.remaining |= other_argument.remaining;
    }
  }
}

/// Constructs the static pattern information for a composite's argument list.
pub fn build_pattern_info(pattern: &Expr) -> PatternInfo {
  let arguments = pattern.arguments();

  let mut result = PatternInfo {
    flags: builtins::function_flags(pattern.name()),
    arguments_range: Interval::ZERO,
    arguments: Vec::with_capacity(arguments.len()),
  };

  for argument in arguments {
    let info = ArgumentInfo {
      kind: expression_kind(argument),
      cardinality: cardinality(argument),
      remaining: Interval::ZERO,
    };
    result.arguments_range += info.cardinality;
    result.arguments.push(info);
  }

  let mut remaining = Interval::ZERO;
  for argument in result.arguments.iter_mut().rev() {
    argument.remaining = remaining;
    remaining += argument.cardinality;
  }

  result
}

/// Collects the names of all identifiers occurring in `expr` or its descendants, in preorder.
/// Used to register the identifiers living under a repetition so that empty matches still bind
/// them to empty tuples.
pub fn collect_identifier_names(expr: &Expr, dest: &mut Vec<IString>) {
  if expr.is_identifier() {
    if !dest.contains(expr.name()) {
      dest.push(expr.name().clone());
    }
    return;
  }
  for argument in expr.arguments() {
    collect_identifier_names(argument, dest);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::expression::{make_composite, make_identifier, make_literal_integer};
  use crate::core::tensor_type::TensorType;

  fn real_identifier(name: &str) -> Expr {
    make_identifier(TensorType::unknown_shape(builtins::REAL.clone()), name)
  }

  fn repetition(arguments: Vec<Expr>) -> Expr {
    make_composite(builtins::REPETITIONS_ZERO_TO_MANY.clone(), arguments).unwrap()
  }

  #[test]
  fn plain_arguments() {
    // f(1, x, g(2))
    let pattern = make_composite(
      "f",
      vec![
        make_literal_integer(1),
        real_identifier("x"),
        make_composite("g", vec![make_literal_integer(2)]).unwrap(),
      ],
    )
    .unwrap();

    let info = build_pattern_info(&pattern);
    assert_eq!(info.arguments_range, Interval::single(3));
    assert_eq!(info.arguments[0].kind, ExpressionKind::Literal);
    assert_eq!(info.arguments[1].kind, ExpressionKind::Identifier);
    assert_eq!(info.arguments[2].kind, ExpressionKind::CompositeCall);
    assert_eq!(info.arguments[0].remaining, Interval::single(2));
    assert_eq!(info.arguments[1].remaining, Interval::single(1));
    assert_eq!(info.arguments[2].remaining, Interval::ZERO);
  }

  #[test]
  fn variadic_arguments() {
    // f(1, x..., 7, 8, 9)
    let pattern = make_composite(
      "f",
      vec![
        make_literal_integer(1),
        repetition(vec![real_identifier("x")]),
        make_literal_integer(7),
        make_literal_integer(8),
        make_literal_integer(9),
      ],
    )
    .unwrap();

    let info = build_pattern_info(&pattern);
    assert_eq!(info.arguments_range, Interval::new(4, Interval::INFINITE));
    assert_eq!(info.arguments[1].kind, ExpressionKind::VariadicRepetition);
    assert_eq!(info.arguments[1].cardinality, Interval::new(0, Interval::INFINITE));
    assert_eq!(info.arguments[0].remaining, Interval::new(3, Interval::INFINITE));
    assert_eq!(info.arguments[1].remaining, Interval::single(3));
    assert_eq!(info.arguments[4].remaining, Interval::ZERO);
  }

  #[test]
  fn invariant_remaining_is_suffix_sum() {
    let pattern = make_composite(
      "f",
      vec![
        repetition(vec![real_identifier("x")]),
        repetition(vec![real_identifier("y")]),
      ],
    )
    .unwrap();

    let info = build_pattern_info(&pattern);
    assert_eq!(info.arguments[0].remaining, info.arguments[1].cardinality);
    assert_eq!(info.arguments[1].remaining, Interval::ZERO);

    let mut sum = Interval::ZERO;
    for argument in &info.arguments {
      sum += argument.cardinality;
    }
    assert_eq!(sum, info.arguments_range);
  }

  #[test]
  fn identifier_collection() {
    // Sin(x) + nested g(y, x)
    let pattern = make_composite(
      "Sin",
      vec![real_identifier("x"), make_composite("g", vec![real_identifier("y"), real_identifier("x")]).unwrap()],
    )
    .unwrap();

    let mut names = Vec::new();
    collect_identifier_names(&pattern, &mut names);
    assert_eq!(names.len(), 2);
    assert_eq!(names[0].as_ref(), "x");
    assert_eq!(names[1].as_ref(), "y");
  }
}
