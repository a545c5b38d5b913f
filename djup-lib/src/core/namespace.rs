/*!

A `Namespace` owns a scalar-type registry and two axiom tables, and drives the canonicalization
fixpoint. Namespaces form a parent chain; scalar-type lookup walks up the chain, so a child
namespace sees every type its ancestors declare. The root namespace is an immutable shared
singleton carrying the standard lattice (`bool`, `int ⊆ rational ⊆ real ⊆ complex`, and `any`
above everything).

## Lifecycle and Ownership

A namespace owns its axiom tables and their discrimination trees; expressions registered in
axioms are shared with the caller and outlive the namespace through shared ownership. Namespaces
are not internally synchronized: registering axioms or scalar types concurrently with
`canonicalize` on the same namespace is forbidden (single-writer / multi-reader discipline,
enforced by the caller).

*/

use std::collections::HashMap;
use std::sync::Arc;

use djup_abs::{debug, IString};
use once_cell::sync::Lazy;

use crate::{
  api::expression::{always_equal, make_composite_typed, Expr},
  core::{
    builtins,
    error::{Error, Result},
    pattern::{
      apply::apply_substitutions,
      discrimination_tree::DiscriminationTree,
      substitution_graph::SubstitutionGraph,
    },
    tensor_type::{Shape, TensorType},
  },
};

struct ScalarType {
  name: IString,
  /// Transitive closure of the declared subsets, computed at registration.
  subsets: Vec<IString>,
}

pub struct Namespace {
  name: IString,
  parent: Option<Arc<Namespace>>,

  scalar_types: Vec<ScalarType>,

  // Substitution axioms: patterns and right-hand-side expressions, parallel by pattern id.
  substitution_axioms: DiscriminationTree,
  substitution_rhss: Vec<Expr>,

  // Type-inference axioms: patterns and inferred types, parallel by pattern id.
  type_inference_axioms: DiscriminationTree,
  inferred_types: Vec<TensorType>,
}

static ROOT: Lazy<Arc<Namespace>> = Lazy::new(|| {
  let mut root = Namespace::new(IString::from("Root"), None);
  root.add_scalar_type(builtins::BOOL.clone(), &[]).expect("root lattice");
  root.add_scalar_type(builtins::INT.clone(), &[]).expect("root lattice");
  root
      .add_scalar_type(builtins::RATIONAL.clone(), &[builtins::INT.clone()])
      .expect("root lattice");
  root
      .add_scalar_type(builtins::REAL.clone(), &[builtins::RATIONAL.clone()])
      .expect("root lattice");
  root
      .add_scalar_type(builtins::COMPLEX.clone(), &[builtins::REAL.clone()])
      .expect("root lattice");
  root
      .add_scalar_type(builtins::ANY.clone(), &[builtins::BOOL.clone(), builtins::COMPLEX.clone()])
      .expect("root lattice");
  Arc::new(root)
});

impl Namespace {
  pub fn new(name: IString, parent: Option<Arc<Namespace>>) -> Namespace {
    Namespace {
      name,
      parent,
      scalar_types: Vec::new(),
      substitution_axioms: DiscriminationTree::new(),
      substitution_rhss: Vec::new(),
      type_inference_axioms: DiscriminationTree::new(),
      inferred_types: Vec::new(),
    }
  }

  /// The root namespace, which is always unmodifiable and carries the standard scalar-type
  /// lattice.
  pub fn root() -> Arc<Namespace> {
    ROOT.clone()
  }

  /// An alias of [`Namespace::root`], for call sites that read better with it.
  pub fn standard() -> Arc<Namespace> {
    Self::root()
  }

  #[inline(always)]
  pub fn name(&self) -> &IString {
    &self.name
  }

  #[inline(always)]
  pub fn parent(&self) -> Option<&Arc<Namespace>> {
    self.parent.as_ref()
  }

  // region Scalar types

  pub fn add_scalar_type(&mut self, name: IString, subsets: &[IString]) -> Result<()> {
    if self.find_scalar_type(&name).is_some() {
      return Err(Error::ScalarTypeRedefinition { name });
    }

    let mut closure: Vec<IString> = Vec::new();
    for subset in subsets {
      if !closure.contains(subset) {
        closure.push(subset.clone());
      }
      self.append_scalar_type_subsets(subset, &mut closure);
    }

    if closure.contains(&name) {
      return Err(Error::ScalarTypeCycle { name });
    }

    self.scalar_types.push(ScalarType { name, subsets: closure });
    Ok(())
  }

  fn append_scalar_type_subsets(&self, name: &IString, dest: &mut Vec<IString>) {
    if let Some(scalar_type) = self.find_scalar_type(name) {
      for subset in &scalar_type.subsets {
        if !dest.contains(subset) {
          dest.push(subset.clone());
        }
      }
    }
  }

  pub fn is_scalar_type(&self, name: &IString) -> bool {
    self.find_scalar_type(name).is_some()
  }

  /// The subset relation is reflexive and transitive.
  pub fn scalar_type_belongs_to(&self, target: &IString, set: &IString) -> bool {
    if target == set {
      return true;
    }
    match self.find_scalar_type(set) {
      Some(scalar_type) => scalar_type.subsets.contains(target),
      None => false,
    }
  }

  fn find_scalar_type(&self, name: &IString) -> Option<&ScalarType> {
    let mut namespace = Some(self);
    while let Some(current) = namespace {
      if let Some(found) = current.scalar_types.iter().find(|entry| entry.name == *name) {
        return Some(found);
      }
      namespace = current.parent.as_deref();
    }
    None
  }

  // endregion Scalar types

  // region Axioms

  /// Registers `lhs -> rhs`, applied left-to-right during canonicalization. Axioms are tried in
  /// registration order.
  pub fn add_substitution_axiom(&mut self, lhs: &Expr, rhs: &Expr, when: Option<&Expr>) -> Result<()> {
    let pattern_id = self.substitution_rhss.len() as u32;
    self.substitution_axioms.add_pattern(pattern_id, lhs, when)?;
    self.substitution_rhss.push(rhs.clone());
    Ok(())
  }

  /// Registers an axiom that assigns `inferred` to any expression matching `lhs`. A variable
  /// shape in `inferred` is instantiated with the match's substitutions.
  pub fn add_type_inference_axiom(
    &mut self,
    lhs: &Expr,
    inferred: &TensorType,
    when: Option<&Expr>,
  ) -> Result<()> {
    let pattern_id = self.inferred_types.len() as u32;
    self.type_inference_axioms.add_pattern(pattern_id, lhs, when)?;
    self.inferred_types.push(inferred.clone());
    Ok(())
  }

  // endregion Axioms

  // region Canonicalization

  /// Rewrites `source` with the namespace's axioms until it is stable: arguments bottom-up
  /// first, then alternating type-inference and substitution axioms at the top level. The loop
  /// is bounded only by axiom convergence; a divergent axiom set does not terminate.
  pub fn canonicalize(&self, source: &Expr) -> Result<Expr> {
    let mut memo = HashMap::new();
    self.canonicalize_impl(source, &mut memo)
  }

  fn canonicalize_impl(&self, source: &Expr, memo: &mut HashMap<Expr, Expr>) -> Result<Expr> {
    if let Some(found) = memo.get(source) {
      return Ok(found.clone());
    }

    let mut current = self.canonicalize_arguments(source, memo)?;

    loop {
      let typed = self.apply_type_inference_axioms(&current)?;
      let rewritten = self.apply_substitution_axioms(&typed)?;
      if always_equal(&rewritten, &current) {
        current = rewritten;
        break;
      }
      debug!(4, "canonicalize: {} -> {}", current, rewritten);
      // The axiom's right-hand side may have introduced reducible subexpressions.
      current = self.canonicalize_arguments(&rewritten, memo)?;
    }

    memo.insert(source.clone(), current.clone());
    Ok(current)
  }

  fn canonicalize_arguments(&self, source: &Expr, memo: &mut HashMap<Expr, Expr>) -> Result<Expr> {
    let mut new_arguments = Vec::with_capacity(source.arguments().len());
    let mut changed = false;
    for argument in source.arguments() {
      let new_argument = self.canonicalize_impl(argument, memo)?;
      changed = changed || !new_argument.same_node(argument);
      new_arguments.push(new_argument);
    }
    if changed {
      make_composite_typed(
        source.tensor_type().cloned(),
        source.name().clone(),
        new_arguments,
        source.metadata().source_location,
      )
    } else {
      Ok(source.clone())
    }
  }

  fn apply_substitution_axioms(&self, source: &Expr) -> Result<Expr> {
    if self.substitution_axioms.pattern_count() == 0 {
      return Ok(source.clone());
    }

    let mut graph = SubstitutionGraph::new(&self.substitution_axioms);
    graph.find_matches(self, source, None);

    match graph.solutions().first() {
      Some(solution) => {
        let replacement = &self.substitution_rhss[solution.pattern_id as usize];
        apply_substitutions(replacement, &solution.substitutions)
      }
      None => Ok(source.clone()),
    }
  }

  fn apply_type_inference_axioms(&self, source: &Expr) -> Result<Expr> {
    if self.type_inference_axioms.pattern_count() == 0 {
      return Ok(source.clone());
    }

    let mut graph = SubstitutionGraph::new(&self.type_inference_axioms);
    graph.find_matches(self, source, None);

    let solution = match graph.solutions().first() {
      Some(solution) => solution,
      None => return Ok(source.clone()),
    };

    let mut inferred = self.inferred_types[solution.pattern_id as usize].clone();
    if let Shape::Variable(shape_expr) = inferred.shape() {
      let instantiated = apply_substitutions(shape_expr, &solution.substitutions)?;
      inferred = TensorType::new(inferred.scalar_type().clone(), Shape::Variable(instantiated));
    }

    match source.tensor_type() {
      Some(existing) => {
        if existing.equals(&inferred) {
          Ok(source.clone())
        } else {
          Err(Error::ConflictingTypeInference {
            expression: source.to_string(),
            existing: existing.to_string(),
            inferred: inferred.to_string(),
          })
        }
      }
      None => make_composite_typed(
        Some(inferred),
        source.name().clone(),
        source.arguments().to_vec(),
        source.metadata().source_location,
      ),
    }
  }

  // endregion Canonicalization
}
