/*!

Substitution application: a DAG-memoizing rewrite that replaces any occurrence whose name matches
a substitution key with the substitution value. Repetition wrappers expand per element: the
variadic identifiers under a wrapper are bound to tuples, and the wrapper's sub-patterns are
instantiated once per tuple element, splicing the instances into the surrounding composite's
argument list in order.

*/

use std::collections::HashMap;

use djup_abs::IString;

use crate::{
  api::expression::{make_composite_typed, Expr},
  core::{
    builtins,
    error::{Error, Result},
    pattern::substitutions_builder::Substitution,
  },
};

type Memo = HashMap<Expr, Expr>;

/// Tries to apply a substitution to an expression and all subexpressions. For every subexpression
/// the predicate is invoked; it can return its input to signal that no substitution applies, or a
/// different expression. Rewrites are memoized over the shared DAG.
pub fn substitute_by_predicate<F>(source: &Expr, predicate: &F) -> Result<Expr>
where
    F: Fn(&Expr) -> Expr,
{
  let mut memo = Memo::new();
  substitute_impl(source, predicate, &mut memo)
}

fn substitute_impl<F>(source: &Expr, predicate: &F, memo: &mut Memo) -> Result<Expr>
where
    F: Fn(&Expr) -> Expr,
{
  if let Some(found) = memo.get(source) {
    return Ok(found.clone());
  }

  let replacement = predicate(source);

  let mut new_arguments = Vec::with_capacity(replacement.arguments().len());
  let mut changed = false;
  for argument in replacement.arguments() {
    let new_argument = substitute_impl(argument, predicate, memo)?;
    changed = changed || !new_argument.same_node(argument);
    new_arguments.push(new_argument);
  }

  let result = if changed {
    make_composite_typed(
      replacement.tensor_type().cloned(),
      replacement.name().clone(),
      new_arguments,
      replacement.metadata().source_location,
    )?
  } else {
    replacement
  };

  memo.insert(source.clone(), result.clone());
  Ok(result)
}

/// Replaces every occurrence whose name is a substitution key with the bound value, expanding
/// repetition wrappers into flattened argument sequences of the surrounding composite.
pub fn apply_substitutions(source: &Expr, substitutions: &[Substitution]) -> Result<Expr> {
  let mut memo = Memo::new();
  apply_impl(source, substitutions, &mut memo)
}

fn lookup<'s>(substitutions: &'s [Substitution], name: &IString) -> Option<&'s Expr> {
  substitutions
      .iter()
      .find(|substitution| substitution.identifier_name == *name)
      .map(|substitution| &substitution.value)
}

fn apply_impl(source: &Expr, substitutions: &[Substitution], memo: &mut Memo) -> Result<Expr> {
  if let Some(found) = memo.get(source) {
    return Ok(found.clone());
  }

  if !source.name().is_empty() {
    if let Some(value) = lookup(substitutions, source.name()) {
      return Ok(value.clone());
    }
  }

  let mut new_arguments = Vec::with_capacity(source.arguments().len());
  let mut changed = false;
  for argument in source.arguments() {
    if argument.is_call() && builtins::is_variadic_wrapper_name(argument.name()) {
      if let Some(instances) = expand_repetition(argument, substitutions)? {
        changed = true;
        new_arguments.extend(instances);
        continue;
      }
    }
    let new_argument = apply_impl(argument, substitutions, memo)?;
    changed = changed || !new_argument.same_node(argument);
    new_arguments.push(new_argument);
  }

  let result = if changed {
    make_composite_typed(
      source.tensor_type().cloned(),
      source.name().clone(),
      new_arguments,
      source.metadata().source_location,
    )?
  } else {
    source.clone()
  };

  memo.insert(source.clone(), result.clone());
  Ok(result)
}

/// Collects the names that can receive a substitution under a repetition wrapper: identifiers,
/// and bare names (zero-argument calls), which is what identifiers look like on an axiom's
/// right-hand side where no type annotates them.
fn collect_substitutable_names(expr: &Expr, dest: &mut Vec<IString>) {
  if expr.is_identifier() || (expr.is_call() && expr.arguments().is_empty() && !expr.name().is_empty()) {
    if !dest.contains(expr.name()) {
      dest.push(expr.name().clone());
    }
    return;
  }
  for argument in expr.arguments() {
    collect_substitutable_names(argument, dest);
  }
}

/// Instantiates a repetition wrapper once per tuple element of its bound variadic identifiers.
/// Returns `None` when no identifier under the wrapper is bound, leaving the wrapper untouched.
fn expand_repetition(wrapper: &Expr, substitutions: &[Substitution]) -> Result<Option<Vec<Expr>>> {
  let mut names = Vec::new();
  collect_substitutable_names(wrapper, &mut names);

  let mut bound: Vec<(IString, Expr)> = Vec::new();
  for name in names {
    if let Some(value) = lookup(substitutions, &name) {
      bound.push((name, value.clone()));
    }
  }
  if bound.is_empty() {
    return Ok(None);
  }

  let mut count: Option<usize> = None;
  for (name, value) in &bound {
    if !value.is_call() || *value.name() != *builtins::TUPLE {
      return Err(Error::NotATuple { name: name.clone() });
    }
    let length = value.arguments().len();
    match count {
      None => count = Some(length),
      Some(expected) if expected != length => {
        return Err(Error::TupleLengthMismatch { name: name.clone(), expected, actual: length });
      }
      Some(_) => {}
    }
  }
  let count = count.unwrap_or(0);

  let mut instances = Vec::new();
  for index in 0..count {
    // The element environment: outer bindings stay visible, the wrapper's own identifiers are
    // narrowed to the current tuple element.
    let mut element_substitutions: Vec<Substitution> = substitutions
        .iter()
        .filter(|substitution| !bound.iter().any(|(name, _)| *name == substitution.identifier_name))
        .cloned()
        .collect();
    for (name, value) in &bound {
      element_substitutions.push(Substitution::new(name.clone(), value.argument(index).clone()));
    }

    for sub_pattern in wrapper.arguments() {
      if sub_pattern.is_call() && builtins::is_variadic_wrapper_name(sub_pattern.name()) {
        if let Some(nested) = expand_repetition(sub_pattern, &element_substitutions)? {
          instances.extend(nested);
          continue;
        }
      }
      instances.push(apply_substitutions(sub_pattern, &element_substitutions)?);
    }
  }

  Ok(Some(instances))
}
