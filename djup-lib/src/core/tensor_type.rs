/*!

A tensor type has a scalar type, which is a name resolved against a namespace's scalar-type
lattice, and a shape, which can be:

 - `Unknown`, in which case nothing is known about the shape;
 - a constant shape (dimensions known at construction);
 - a variable shape, that is a non-constant rank-1 expression describing the dimension vector.

*/

use std::fmt;

use djup_abs::{hash::Hash, IString};

use crate::{
  api::expression::{always_equal, Expr},
  core::{builtins, namespace::Namespace, shape::ConstantShape},
};

#[derive(Clone, Debug, Default)]
pub enum Shape {
  #[default]
  Unknown,
  Constant(ConstantShape),
  Variable(Expr),
}

impl Shape {
  #[inline(always)]
  pub fn is_unknown(&self) -> bool {
    matches!(self, Shape::Unknown)
  }

  pub fn equals(&self, other: &Shape) -> bool {
    match (self, other) {
      (Shape::Unknown, Shape::Unknown) => true,
      (Shape::Constant(first), Shape::Constant(second)) => first == second,
      (Shape::Variable(first), Shape::Variable(second)) => always_equal(first, second),
      _ => false,
    }
  }
}

#[derive(Clone, Debug)]
pub struct TensorType {
  scalar_type: IString,
  shape: Shape,
}

impl TensorType {
  pub fn new(scalar_type: IString, shape: Shape) -> Self {
    TensorType { scalar_type, shape }
  }

  /// The type of a scalar of the given scalar type: rank-0 constant shape.
  pub fn scalar(scalar_type: IString) -> Self {
    TensorType { scalar_type, shape: Shape::Constant(ConstantShape::scalar()) }
  }

  /// A scalar type with nothing known about the shape.
  pub fn unknown_shape(scalar_type: IString) -> Self {
    TensorType { scalar_type, shape: Shape::Unknown }
  }

  #[inline(always)]
  pub fn scalar_type(&self) -> &IString {
    &self.scalar_type
  }

  #[inline(always)]
  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  /// Structural equality: both scalar names equal and both shapes structurally equal.
  pub fn equals(&self, other: &TensorType) -> bool {
    self.scalar_type == other.scalar_type && self.shape.equals(&other.shape)
  }

  pub fn hash_into(&self, hash: &mut Hash) {
    hash.combine_str(&self.scalar_type);
    match &self.shape {
      Shape::Unknown => {
        hash.combine_u64(0);
      }
      Shape::Constant(shape) => {
        hash.combine_u64(1);
        shape.hash_into(hash);
      }
      Shape::Variable(expr) => {
        hash.combine_u64(2);
        hash.combine_hash(expr.hash());
      }
    }
  }
}

impl fmt::Display for TensorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.scalar_type)?;
    match &self.shape {
      Shape::Unknown => Ok(()),
      Shape::Constant(shape) => write!(f, " {}", shape),
      Shape::Variable(expr) => write!(f, " {}", expr),
    }
  }
}

/// Returns whether an expression of type `candidate` belongs to the set of expressions described
/// by `set`:
///
///  - the scalar type of `candidate` must be a declared subset of the scalar type of `set`;
///  - the shape of `set` must be unknown, or the shapes must be structurally equal.
///
/// A `set` of scalar type `any` with unknown shape accepts everything, even untyped candidates.
pub fn type_belongs_to(candidate: Option<&TensorType>, set: &TensorType, namespace: &Namespace) -> bool {
  if *set.scalar_type() == *builtins::ANY && set.shape().is_unknown() {
    return true;
  }

  let candidate = match candidate {
    Some(candidate) => candidate,
    None => return false,
  };

  if !namespace.scalar_type_belongs_to(candidate.scalar_type(), set.scalar_type()) {
    return false;
  }

  set.shape().is_unknown() || candidate.shape().equals(set.shape())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::expression::{make_identifier, make_literal_integer};

  #[test]
  fn equality() {
    let first = TensorType::scalar(builtins::INT.clone());
    let second = TensorType::scalar(builtins::INT.clone());
    assert!(first.equals(&second));

    let unknown = TensorType::unknown_shape(builtins::INT.clone());
    assert!(!first.equals(&unknown));

    let real = TensorType::scalar(builtins::REAL.clone());
    assert!(!first.equals(&real));
  }

  #[test]
  fn variable_shapes_compare_structurally() {
    let shape_expr = make_identifier(TensorType::unknown_shape(builtins::INT.clone()), "n");
    let same_shape = make_identifier(TensorType::unknown_shape(builtins::INT.clone()), "n");

    let first = TensorType::new(builtins::REAL.clone(), Shape::Variable(shape_expr));
    let second = TensorType::new(builtins::REAL.clone(), Shape::Variable(same_shape));
    assert!(first.equals(&second));
  }

  #[test]
  fn belongs_to() {
    let namespace = Namespace::standard();

    let int_scalar = TensorType::scalar(builtins::INT.clone());
    let real_any = TensorType::unknown_shape(builtins::REAL.clone());
    let bool_any = TensorType::unknown_shape(builtins::BOOL.clone());
    let any = TensorType::unknown_shape(builtins::ANY.clone());

    assert!(type_belongs_to(Some(&int_scalar), &real_any, &namespace));
    assert!(!type_belongs_to(Some(&int_scalar), &bool_any, &namespace));
    assert!(type_belongs_to(Some(&bool_any), &any, &namespace));
    assert!(type_belongs_to(None, &any, &namespace));
    assert!(!type_belongs_to(None, &real_any, &namespace));

    let literal = make_literal_integer(3);
    assert!(type_belongs_to(literal.tensor_type(), &real_any, &namespace));
  }
}
