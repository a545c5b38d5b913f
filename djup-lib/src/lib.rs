#![allow(dead_code)]
/*!

The djup engine: an immutable, hash-carrying expression DAG with a lightweight tensor type system,
a discrimination tree that indexes many patterns for prefiltered lookup, a substitution graph that
enumerates all variable bindings making a pattern equal to a target under variadic semantics, and
namespaces that own scalar-type lattices and rewrite axioms and drive canonicalization to a
fixpoint.

*/

pub mod api;
pub mod core;

pub use crate::api::{
  expression::{
    always_equal,
    expression_to_dot,
    make_composite,
    make_composite_typed,
    make_identifier,
    make_literal_bool,
    make_literal_integer,
    make_tuple,
    Expr,
    Expression,
    ExpressionMetadata,
    SourceLocation,
  },
  pattern::{MatchResult, Pattern},
};

pub use crate::core::{
  error::{Error, Result},
  interval::Interval,
  namespace::Namespace,
  pattern::{
    apply::apply_substitutions,
    substitution_graph::{MatchStep, MatchStepKind, Solution, SubstitutionGraph},
    substitutions_builder::{Substitution, SubstitutionsBuilder},
    discrimination_tree::{DiscriminationTree, NodeIndex, PatternId},
  },
  shape::ConstantShape,
  tensor_type::{Shape, TensorType},
};
