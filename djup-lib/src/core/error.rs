/*!

Error type for all fallible engine operations. Structural errors are reported immediately to the
caller and abort the current top-level operation; matching itself never fails (a mismatch is an
empty solution list), so none of these variants are produced by `find_matches`.

*/

use std::fmt;

use djup_abs::IString;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
  /// A repetition wrapper was constructed with no sub-patterns.
  EmptyRepetition { name: IString },
  /// An identifier was constructed from malformed parts.
  MalformedExpression { detail: String },
  /// The same pattern id was registered twice in one discrimination tree.
  DuplicatePatternId { pattern_id: u32 },
  /// A pattern indistinguishable from an already-registered one was added.
  DuplicatePattern { pattern_id: u32 },
  /// A scalar type was declared twice in the same namespace.
  ScalarTypeRedefinition { name: IString },
  /// The declared subset relation would contain a cycle.
  ScalarTypeCycle { name: IString },
  /// A type-inference axiom matched an expression that already carries a different type.
  ConflictingTypeInference { expression: String, existing: String, inferred: String },
  /// A variadic identifier was bound to something other than a tuple.
  NotATuple { name: IString },
  /// Variadic identifiers under one repetition were bound to tuples of different lengths.
  TupleLengthMismatch { name: IString, expected: usize, actual: usize },
  /// Two shapes with differing non-unit dimensions cannot broadcast.
  BroadcastMismatch { first: i64, second: i64 },
  /// A shape dimension was negative.
  NegativeDimension { dimension: i64 },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::EmptyRepetition { name } => {
        write!(f, "repetition {} has no sub-patterns", name)
      }
      Error::MalformedExpression { detail } => {
        write!(f, "malformed expression: {}", detail)
      }
      Error::DuplicatePatternId { pattern_id } => {
        write!(f, "pattern id {} is already registered", pattern_id)
      }
      Error::DuplicatePattern { pattern_id } => {
        write!(f, "pattern {} is indistinguishable from an already-registered pattern", pattern_id)
      }
      Error::ScalarTypeRedefinition { name } => {
        write!(f, "scalar type {} already defined", name)
      }
      Error::ScalarTypeCycle { name } => {
        write!(f, "scalar type {} would make the subset relation cyclic", name)
      }
      Error::ConflictingTypeInference { expression, existing, inferred } => {
        write!(
          f,
          "type inference on {} produced {}, but the expression already has type {}",
          expression, inferred, existing
        )
      }
      Error::NotATuple { name } => {
        write!(f, "variadic identifier {} is not bound to a tuple", name)
      }
      Error::TupleLengthMismatch { name, expected, actual } => {
        write!(
          f,
          "variadic identifier {} is bound to a tuple of length {}, expected {}",
          name, actual, expected
        )
      }
      Error::BroadcastMismatch { first, second } => {
        write!(f, "dimensions {} and {} do not broadcast", first, second)
      }
      Error::NegativeDimension { dimension } => {
        write!(f, "shape dimension {} is negative", dimension)
      }
    }
  }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
