/*!

The one-pattern matching API: compile a pattern against a namespace once, then run it against any
number of targets. `MatchResult` is the flat list of variable bindings; reapplying a result's
substitutions to the pattern yields an expression structurally equal to the target.

*/

use std::path::Path;
use std::sync::Arc;

use djup_abs::IString;

use crate::{
  api::expression::Expr,
  core::{
    error::Result,
    namespace::Namespace,
    pattern::{
      apply::apply_substitutions,
      discrimination_tree::DiscriminationTree,
      substitution_graph::SubstitutionGraph,
      substitutions_builder::Substitution,
    },
  },
};

#[derive(Clone, Debug)]
pub struct MatchResult {
  pub substitutions: Vec<Substitution>,
}

impl MatchResult {
  /// The value bound to an identifier, if any.
  pub fn binding(&self, name: &IString) -> Option<&Expr> {
    self
        .substitutions
        .iter()
        .find(|substitution| substitution.identifier_name == *name)
        .map(|substitution| &substitution.value)
  }
}

pub struct Pattern {
  namespace: Arc<Namespace>,
  lhs: Expr,
  tree: DiscriminationTree,
}

impl Pattern {
  /// Compiles `lhs` into a single-pattern discrimination tree. The namespace resolves scalar
  /// types during matching. The optional `when` condition is recorded on the pattern.
  pub fn new(namespace: &Arc<Namespace>, lhs: Expr, when: Option<Expr>) -> Result<Pattern> {
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &lhs, when.as_ref())?;
    Ok(Pattern { namespace: namespace.clone(), lhs, tree })
  }

  /// The pattern as given by the caller, before associative preprocessing.
  pub fn lhs(&self) -> &Expr {
    &self.lhs
  }

  /// The pattern as matched, with associative arguments wrapped.
  pub fn preprocessed_lhs(&self) -> &Expr {
    self.tree.pattern(0).expect("pattern 0 is registered at construction")
  }

  /// Enumerates all solutions, in deterministic order. When `artifact_directory` is given, dot
  /// renditions of the discrimination tree and of the substitution graph after every step are
  /// written there; by default nothing is written and matching is unobserved.
  pub fn match_all(&self, target: &Expr, artifact_directory: Option<&Path>) -> Vec<MatchResult> {
    let mut graph = SubstitutionGraph::new(&self.tree);

    if let Some(directory) = artifact_directory {
      let _ = std::fs::create_dir_all(directory);
      let _ = std::fs::write(
        directory.join("discrimination_tree.dot"),
        self.tree.to_dot(&format!("{}", self.preprocessed_lhs())),
      );
      graph.set_artifact_directory(directory.to_path_buf());
    }

    graph.find_matches(&self.namespace, target, None);

    graph
        .solutions()
        .iter()
        .map(|solution| MatchResult { substitutions: solution.substitutions.clone() })
        .collect()
  }

  /// The first solution, if any.
  pub fn match_one(&self, target: &Expr, artifact_directory: Option<&Path>) -> Option<MatchResult> {
    self.match_all(target, artifact_directory).into_iter().next()
  }

  /// Reapplies a result's substitutions to the (preprocessed) pattern. For any result of
  /// `match_all(target)` this yields an expression structurally equal to the target.
  pub fn apply(&self, result: &MatchResult) -> Result<Expr> {
    apply_substitutions(self.preprocessed_lhs(), &result.substitutions)
  }
}
