/*!

Accumulates substitutions across variadic scopes. At depth 0 substitutions go to a flat list with
a contradiction check (the same name mapped to structurally different values kills the path). A
variadic scope is entered with `open` and left with `close`; while a scope is open, values bound
to an identifier are pushed onto a per-name stack of levels, and each `close` wraps the top level
into a `Tuple` pushed into the level below. Returning to depth 0 collapses every pending stack to
a single (possibly nested) tuple added to the flat list.

Identifiers that live under a repetition that matched zero targets never get a value pushed, so
scopes `touch` their identifiers on entry; a touched-but-empty stack still collapses to `Tuple()`.

*/

use std::fmt;

use djup_abs::IString;

use crate::api::expression::{always_equal, make_tuple, Expr};

#[derive(Clone, Debug)]
pub struct Substitution {
  pub identifier_name: IString,
  pub value: Expr,
}

impl Substitution {
  pub fn new(identifier_name: IString, value: Expr) -> Self {
    Substitution { identifier_name, value }
  }
}

impl fmt::Display for Substitution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.identifier_name, self.value)
  }
}

#[derive(Clone, Debug)]
struct VariadicEntry {
  name: IString,
  /// One list of collected values per open scope level the entry has been touched at.
  stack: Vec<Vec<Expr>>,
}

#[derive(Clone, Debug, Default)]
pub struct SubstitutionsBuilder {
  curr_depth: u32,
  substitutions: Vec<Substitution>,
  /// Insertion-ordered so that materialized tuples come out in a deterministic order.
  variadic: Vec<VariadicEntry>,
}

impl SubstitutionsBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline(always)]
  pub fn depth(&self) -> u32 {
    self.curr_depth
  }

  /// The accumulated flat substitutions. Only meaningful at depth 0.
  pub fn substitutions(&self) -> &[Substitution] {
    debug_assert_eq!(self.curr_depth, 0, "variadic scopes still open");
    &self.substitutions
  }

  pub fn into_substitutions(self) -> Vec<Substitution> {
    debug_assert_eq!(self.curr_depth, 0, "variadic scopes still open");
    self.substitutions
  }

  /// Enters `count` variadic scopes.
  pub fn open(&mut self, count: u32) {
    self.curr_depth += count;
  }

  /// Registers identifiers living in the scopes just opened, so that zero-width matches still
  /// materialize empty tuples for them.
  pub fn touch(&mut self, names: &[IString]) {
    let depth = self.curr_depth;
    for name in names {
      self.entry_mut(name, depth);
    }
  }

  /// Adds substitutions at the current depth. Returns false on contradiction.
  pub fn add(&mut self, substitutions: &[Substitution]) -> bool {
    for substitution in substitutions {
      if !self.add_one(substitution) {
        return false;
      }
    }
    true
  }

  fn add_one(&mut self, substitution: &Substitution) -> bool {
    if self.curr_depth == 0 {
      self.add_to_bottom_layer(substitution.clone())
    } else {
      let depth = self.curr_depth;
      let entry = self.entry_mut(&substitution.identifier_name, depth);
      entry.stack.last_mut().unwrap().push(substitution.value.clone());
      true
    }
  }

  /// Leaves `count` variadic scopes, wrapping collected values into tuples. Returns false when
  /// the depth-0 collapse contradicts an existing flat substitution.
  pub fn close(&mut self, count: u32) -> bool {
    for _ in 0..count {
      debug_assert!(self.curr_depth > 0, "close without matching open");
      self.curr_depth -= 1;

      if self.curr_depth == 0 {
        let entries = std::mem::take(&mut self.variadic);
        for mut entry in entries {
          while entry.stack.len() > 1 {
            Self::reduce(&mut entry);
          }
          let values = entry.stack.pop().unwrap_or_default();
          let substitution = Substitution::new(entry.name, make_tuple(values));
          if !self.add_to_bottom_layer(substitution) {
            return false;
          }
        }
      } else {
        let depth = self.curr_depth as usize;
        for entry in &mut self.variadic {
          while entry.stack.len() > depth {
            Self::reduce(entry);
          }
        }
      }
    }
    true
  }

  fn add_to_bottom_layer(&mut self, substitution: Substitution) -> bool {
    for existing in &self.substitutions {
      if existing.identifier_name == substitution.identifier_name {
        return always_equal(&existing.value, &substitution.value);
      }
    }
    self.substitutions.push(substitution);
    true
  }

  fn entry_mut(&mut self, name: &IString, depth: u32) -> &mut VariadicEntry {
    debug_assert!(depth > 0, "variadic entry at depth 0");

    let index = match self.variadic.iter().position(|entry| entry.name == *name) {
      Some(index) => index,
      None => {
        self.variadic.push(VariadicEntry { name: name.clone(), stack: Vec::new() });
        self.variadic.len() - 1
      }
    };
    let entry = &mut self.variadic[index];
    while entry.stack.len() < depth as usize {
      entry.stack.push(Vec::new());
    }
    entry
  }

  /// Wraps the top level of collected values into a tuple pushed onto the level below.
  fn reduce(entry: &mut VariadicEntry) {
    debug_assert!(entry.stack.len() >= 2);
    let top = entry.stack.pop().unwrap();
    entry.stack.last_mut().unwrap().push(make_tuple(top));
  }
}
