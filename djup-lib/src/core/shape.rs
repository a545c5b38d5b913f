/*!

Constant tensor shapes: a vector of nonnegative dimensions with precomputed row-major strides.

Strides\[i] = product of Dim\[j], for i <= j < rank.
Strides\[0] = product of all dimensions (the linear size).
Strides\[rank] = 1. The length of strides is rank + 1.

*/

use std::fmt;

use djup_abs::{hash::Hash, join_string, SmallVec};

use crate::core::error::{Error, Result};

type DimensionVec = SmallVec<[i64; 4]>;
type StrideVec = SmallVec<[i64; 5]>;

#[derive(Clone, Debug)]
pub struct ConstantShape {
  dimensions: DimensionVec,
  strides: StrideVec,
}

fn compute_strides(dimensions: &[i64]) -> StrideVec {
  let mut strides: StrideVec = SmallVec::with_capacity(dimensions.len() + 1);
  strides.resize(dimensions.len() + 1, 1);
  for index in (0..dimensions.len()).rev() {
    strides[index] = strides[index + 1] * dimensions[index];
  }
  strides
}

impl ConstantShape {
  pub fn new(dimensions: &[i64]) -> Result<Self> {
    if let Some(&dimension) = dimensions.iter().find(|&&d| d < 0) {
      return Err(Error::NegativeDimension { dimension });
    }
    Ok(ConstantShape {
      dimensions: DimensionVec::from_slice(dimensions),
      strides: compute_strides(dimensions),
    })
  }

  /// The rank-0 shape of a scalar.
  pub fn scalar() -> Self {
    ConstantShape { dimensions: DimensionVec::new(), strides: StrideVec::from_slice(&[1]) }
  }

  #[inline(always)]
  pub fn rank(&self) -> usize {
    self.dimensions.len()
  }

  /// The number of elements: the product of all dimensions.
  #[inline(always)]
  pub fn linear_size(&self) -> i64 {
    self.strides[0]
  }

  #[inline(always)]
  pub fn dimension(&self, index: usize) -> i64 {
    self.dimensions[index]
  }

  #[inline(always)]
  pub fn dimensions(&self) -> &[i64] {
    &self.dimensions
  }

  #[inline(always)]
  pub fn strides(&self) -> &[i64] {
    &self.strides
  }

  /// Linearizes `indices` in row-major order. `indices` may have more entries than the rank, in
  /// which case the leading extra entries are ignored (broadcast access).
  pub fn physical_linear_index(&self, indices: &[i64]) -> i64 {
    debug_assert!(indices.len() >= self.rank(), "too few indices for rank");

    let offset = indices.len() - self.rank();
    let mut result = 0;
    for (index, &value) in indices[offset..].iter().enumerate() {
      debug_assert!(value < self.dimensions[index], "index out of bounds");
      result += value * self.strides[index + 1];
    }
    result
  }

  pub fn hash_into(&self, hash: &mut Hash) {
    hash.combine_u64(self.dimensions.len() as u64);
    for &dimension in &self.dimensions {
      hash.combine_i64(dimension);
    }
  }
}

impl PartialEq for ConstantShape {
  fn eq(&self, other: &Self) -> bool {
    self.dimensions == other.dimensions
  }
}

impl Eq for ConstantShape {}

impl fmt::Display for ConstantShape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}]", join_string(self.dimensions.iter(), ", "))
  }
}

/// Returns the smallest shape that dimensionwise equals or unit-broadcasts each input. Dimensions
/// are aligned from the trailing end; a dimension of 1 promotes to the other operand's extent.
/// Fails when two non-unit dimensions differ.
pub fn broadcast(shapes: &[ConstantShape]) -> Result<ConstantShape> {
  let rank = shapes.iter().map(|s| s.rank()).max().unwrap_or(0);

  let mut dimensions: DimensionVec = SmallVec::new();
  dimensions.resize(rank, 1);

  for shape in shapes {
    let offset = rank - shape.rank();
    for (index, &dimension) in shape.dimensions().iter().enumerate() {
      let dest = &mut dimensions[offset + index];
      if *dest == 1 {
        *dest = dimension;
      } else if dimension != 1 && dimension != *dest {
        return Err(Error::BroadcastMismatch { first: *dest, second: dimension });
      }
    }
  }

  ConstantShape::new(&dimensions)
}
