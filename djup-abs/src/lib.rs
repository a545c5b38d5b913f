#![allow(dead_code)]
/*!

Abstractions over backing implementations, so the engine never names the crates it sits on.

Where a concern maps cleanly onto a single external type, the alias is the whole abstraction:
`IString` is currently [`string_cache::DefaultAtom`](https://crates.io/crates/string_cache), and
swapping in another interning crate (say [`ustr`](https://crates.io/crates/ustr)) would touch one
line here and nothing downstream. Concerns without a drop-in backing type get a thin module
instead; the `log` module, for instance, exposes only the threshold getters/setters and the
level macros, and keeps the choice of logging framework private.

*/

mod graph;
mod nat_set;
mod string_util;

pub mod hash;

// Logging
pub use tracing;
pub mod log;

// Interned string. Use `DefaultAtom` for a global cache that can be used across threads.
pub use string_cache::DefaultAtom as IString;

// For vectors that are expected to have few or zero elements.
pub use smallvec::{smallvec, SmallVec};

// A set of (small) natural numbers
pub use nat_set::NatSet;

// GraphViz text emission
pub use graph::DotGraph;

// Join sequences with a separator
pub use string_util::{join_iter, join_string};
