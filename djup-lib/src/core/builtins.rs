/*!

Built-in names and function flags. Expressions are plain named nodes; the engine gives a handful
of names special meaning:

 - `Tuple`: the anonymous ordered collection; variadic bindings materialize as tuples.
 - `RepetitionsZeroToMany` / `RepetitionsOneToMany` / `RepetitionsZeroToOne`: the wrappers the
   parser produces for the `...`, `..` and `?` modifiers.
 - `AssociativeIdentifier`: the wrapper pattern preprocessing puts around non-constant arguments
   of associative functions, giving them cardinality `[1, Inf]`.

Function flags are keyed purely by function name. Commutative is carried as an extension point;
the matcher does not consult it yet.

*/

use std::collections::HashMap;

use djup_abs::IString;
use enumflags2::{bitflags, BitFlags};
use once_cell::sync::Lazy;

use crate::core::interval::Interval;

macro_rules! builtin_name {
  ($ident:ident, $text:literal) => {
    pub static $ident: Lazy<IString> = Lazy::new(|| IString::from($text));
  };
}

builtin_name!(TUPLE, "Tuple");
builtin_name!(STACK, "Stack");
builtin_name!(REPETITIONS_ZERO_TO_MANY, "RepetitionsZeroToMany");
builtin_name!(REPETITIONS_ONE_TO_MANY, "RepetitionsOneToMany");
builtin_name!(REPETITIONS_ZERO_TO_ONE, "RepetitionsZeroToOne");
builtin_name!(ASSOCIATIVE_IDENTIFIER, "AssociativeIdentifier");

builtin_name!(ANY, "any");
builtin_name!(BOOL, "bool");
builtin_name!(INT, "int");
builtin_name!(RATIONAL, "rational");
builtin_name!(REAL, "real");
builtin_name!(COMPLEX, "complex");

builtin_name!(IF, "If");
builtin_name!(ADD, "Add");
builtin_name!(SUB, "Sub");
builtin_name!(MUL, "Mul");
builtin_name!(DIV, "Div");
builtin_name!(POW, "Pow");
builtin_name!(NEG, "Neg");
builtin_name!(AND, "And");
builtin_name!(OR, "Or");
builtin_name!(NOT, "Not");
builtin_name!(EQUAL, "Equal");
builtin_name!(LESS, "Less");
builtin_name!(MAT_MUL, "MatMul");

#[bitflags]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionFlag {
  Associative = 1 << 0,
  Commutative = 1 << 1,
}

pub type FunctionFlags = BitFlags<FunctionFlag>;

static FUNCTION_FLAGS_TABLE: Lazy<HashMap<IString, FunctionFlags>> = Lazy::new(|| {
  let mut table = HashMap::new();
  let both = FunctionFlag::Associative | FunctionFlag::Commutative;
  table.insert(ADD.clone(), both);
  table.insert(MUL.clone(), both);
  table.insert(AND.clone(), both);
  table.insert(OR.clone(), both);
  table.insert(MAT_MUL.clone(), FunctionFlags::from(FunctionFlag::Associative));
  table
});

/// Associativity/commutativity of a function, keyed by name.
pub fn function_flags(name: &IString) -> FunctionFlags {
  FUNCTION_FLAGS_TABLE.get(name).copied().unwrap_or_default()
}

/// Returns whether `name` is one of the three repetition wrappers (`?`, `..`, `...`).
pub fn is_repetition_name(name: &IString) -> bool {
  *name == *REPETITIONS_ZERO_TO_MANY
      || *name == *REPETITIONS_ONE_TO_MANY
      || *name == *REPETITIONS_ZERO_TO_ONE
}

/// Returns whether `name` gives its node a non-unit cardinality during matching: a repetition
/// wrapper or an associative identifier.
pub fn is_variadic_wrapper_name(name: &IString) -> bool {
  is_repetition_name(name) || *name == *ASSOCIATIVE_IDENTIFIER
}

/// The min/max multiplicity with which a pattern argument may match contiguous target arguments.
pub fn cardinality_for_name(name: &IString) -> Interval {
  if *name == *REPETITIONS_ZERO_TO_MANY {
    Interval::new(0, Interval::INFINITE)
  } else if *name == *REPETITIONS_ZERO_TO_ONE {
    Interval::new(0, 1)
  } else if *name == *REPETITIONS_ONE_TO_MANY || *name == *ASSOCIATIVE_IDENTIFIER {
    Interval::new(1, Interval::INFINITE)
  } else {
    Interval::single(1)
  }
}
