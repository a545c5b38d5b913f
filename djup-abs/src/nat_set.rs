/*!

A set of (small) natural numbers, used for reached-node bookkeeping. The backing implementation is
the [`bit-set` crate](https://crates.io/crates/bit-set); this alias is the only thing the rest of
the codebase sees.

*/

pub type NatSet = bit_set::BitSet;
