use std::fmt::{Display, Write};

/// Joins the items of an iterator into one string, separating consecutive items with `sep`.
/// (C.f. `Vec::join(…)`, which the stdlib does not offer for arbitrary iterators.)
pub fn join_string<T: Display>(iter: impl Iterator<Item = T>, sep: &str) -> String {
  let mut result = String::new();
  for (index, item) in iter.enumerate() {
    if index > 0 {
      result.push_str(sep);
    }
    let _ = write!(result, "{}", item);
  }
  result
}

/// Iterator adaptor that interleaves separators between consecutive items. The separator is
/// produced by `sep` from the item it precedes.
pub fn join_iter<T>(iter: impl Iterator<Item = T>, sep: impl Fn(&T) -> T) -> impl Iterator<Item = T> {
  let mut iter = iter;
  let mut held_back: Option<T> = None;
  let mut first = true;

  std::iter::from_fn(move || {
    if let Some(item) = held_back.take() {
      return Some(item);
    }
    let item = iter.next()?;
    if first {
      first = false;
      Some(item)
    } else {
      let separator = sep(&item);
      held_back = Some(item);
      Some(separator)
    }
  })
}
