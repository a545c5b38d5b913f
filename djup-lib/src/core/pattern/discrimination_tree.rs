/*!

A discrimination tree indexes a set of patterns so that one traversal can test many patterns
against a target at once. Every node has a stable index; edges leaving a node are labeled with the
child-pattern lists that discriminate the arguments of the composite currently being matched.
Nested composites chain further edges below the edge that carries them, one level per composite,
left to right; the node where a pattern's full chain ends is its leaf and carries the pattern id.

Patterns that agree on a prefix share edges: an edge is reused when its labels are structurally
identical (literals and identifiers compare by `always_equal`, composites by function name only),
and the per-edge `PatternInfo` is widened to cover every pattern that landed on it.

The tree is only queried indirectly: the substitution graph walks it while matching.

*/

use std::collections::HashMap;

use djup_abs::{debug, join_string, IString};

use crate::{
  api::expression::{always_equal, Expr},
  core::{
    builtins::{self, FunctionFlag},
    error::{Error, Result},
    pattern::{
      apply::substitute_by_predicate,
      pattern_info::{build_pattern_info, collect_identifier_names, expression_kind, PatternInfo},
    },
  },
};

pub type NodeIndex = u32;
pub type PatternId = u32;

pub const ROOT_NODE: NodeIndex = 0;

#[derive(Clone, Debug)]
pub struct DiscriminationEdge {
  /// The child patterns discriminating this level, one slot per argument.
  pub labels: Vec<Expr>,
  /// Static classification of the labels, widened over all patterns sharing the edge.
  pub info: PatternInfo,
  pub dest: NodeIndex,
  /// The nodes where the chains of this edge's nested composites end, one per distinct pattern
  /// path. A sibling label following this edge's composites anchors its own chain there.
  pub chain_exits: Vec<NodeIndex>,
}

#[derive(Default)]
pub struct DiscriminationTree {
  /// Outgoing edges, keyed by source node, in insertion order.
  edges: HashMap<NodeIndex, Vec<DiscriminationEdge>>,
  /// Nodes where a pattern's full chain ends.
  leaves: HashMap<NodeIndex, PatternId>,
  /// The preprocessed patterns, by id.
  patterns: HashMap<PatternId, Expr>,
  /// Optional `when` conditions, recorded but not evaluated.
  conditions: HashMap<PatternId, Expr>,
  /// Identifier names under a repetition, keyed by (chain anchor node, chain exit node). Lets
  /// zero-width matches register the identifiers they should bind to empty tuples.
  repetition_names: HashMap<(NodeIndex, NodeIndex), Vec<IString>>,
  last_node: NodeIndex,
}

/// Wraps every non-constant, non-variadic argument of an associative function in an
/// `AssociativeIdentifier`, which matches like a one-to-many repetition.
pub fn preprocess_pattern(pattern: &Expr) -> Result<Expr> {
  substitute_by_predicate(pattern, &|candidate: &Expr| {
    if !builtins::function_flags(candidate.name()).contains(FunctionFlag::Associative) {
      return candidate.clone();
    }

    let needs_wrapping = |argument: &Expr| {
      !argument.is_constant() && !(argument.is_call() && builtins::is_variadic_wrapper_name(argument.name()))
    };
    if !candidate.arguments().iter().any(needs_wrapping) {
      return candidate.clone();
    }

    let new_arguments = candidate
        .arguments()
        .iter()
        .map(|argument| {
          if needs_wrapping(argument) {
            crate::api::expression::make_composite(
              builtins::ASSOCIATIVE_IDENTIFIER.clone(),
              vec![argument.clone()],
            )
            .expect("wrapping an argument cannot fail")
          } else {
            argument.clone()
          }
        })
        .collect();

    crate::api::expression::make_composite_typed(
      candidate.tensor_type().cloned(),
      candidate.name().clone(),
      new_arguments,
      candidate.metadata().source_location,
    )
    .expect("rebuilding a composite with the same arity cannot fail")
  })
}

/// Checks whether two label lists are structurally identical for edge-sharing purposes.
fn same_patterns(first: &[Expr], second: &[Expr]) -> bool {
  if first.len() != second.len() {
    return false;
  }
  first.iter().zip(second).all(|(a, b)| {
    if a.is_literal() || a.is_identifier() || b.is_literal() || b.is_identifier() {
      always_equal(a, b)
    } else {
      a.name() == b.name()
    }
  })
}

impl DiscriminationTree {
  pub fn new() -> Self {
    Self::default()
  }

  /// Node indices are assigned contiguously and never recycled.
  #[inline(always)]
  pub fn node_count(&self) -> u32 {
    self.last_node + 1
  }

  #[inline(always)]
  pub fn pattern_count(&self) -> usize {
    self.patterns.len()
  }

  pub fn edges_from(&self, node: NodeIndex) -> &[DiscriminationEdge] {
    self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn leaf(&self, node: NodeIndex) -> Option<PatternId> {
    self.leaves.get(&node).copied()
  }

  pub fn pattern(&self, pattern_id: PatternId) -> Option<&Expr> {
    self.patterns.get(&pattern_id)
  }

  pub fn condition(&self, pattern_id: PatternId) -> Option<&Expr> {
    self.conditions.get(&pattern_id)
  }

  /// All chain exits reachable through the edges leaving `node`, in insertion order.
  pub fn node_chain_exits(&self, node: NodeIndex) -> Vec<NodeIndex> {
    let mut exits = Vec::new();
    for edge in self.edges_from(node) {
      for &exit in &edge.chain_exits {
        if !exits.contains(&exit) {
          exits.push(exit);
        }
      }
    }
    exits
  }

  /// The identifiers living under the repetition whose chain runs from `anchor` to `exit`.
  pub fn repetition_names(&self, anchor: NodeIndex, exit: NodeIndex) -> &[IString] {
    self
        .repetition_names
        .get(&(anchor, exit))
        .map(Vec::as_slice)
        .unwrap_or(&[])
  }

  /// The entry point to add a pattern. The pattern is preprocessed for associative functions,
  /// then recursively folded into the tree; the final chain node becomes its leaf.
  pub fn add_pattern(&mut self, pattern_id: PatternId, pattern: &Expr, condition: Option<&Expr>) -> Result<()> {
    if self.patterns.contains_key(&pattern_id) {
      return Err(Error::DuplicatePatternId { pattern_id });
    }

    let preprocessed = preprocess_pattern(pattern)?;

    let info = PatternInfo::single_slot(expression_kind(&preprocessed));
    let labels = [preprocessed.clone()];
    let exit = self.add_pattern_from(ROOT_NODE, &labels, info);

    if self.leaves.contains_key(&exit) {
      return Err(Error::DuplicatePattern { pattern_id });
    }
    self.leaves.insert(exit, pattern_id);
    self.patterns.insert(pattern_id, preprocessed);
    if let Some(condition) = condition {
      self.conditions.insert(pattern_id, condition.clone());
    }

    debug!(3, "discrimination tree: added pattern {} with leaf node {}", pattern_id, exit);
    Ok(())
  }

  /// Adds one level of labels from `source`, recursing into nested composites, and returns the
  /// node where the whole chain ends.
  fn add_pattern_from(&mut self, source: NodeIndex, labels: &[Expr], info: PatternInfo) -> NodeIndex {
    let edge_index = self.find_or_add_edge(source, labels, info);
    let mut cursor = self.edges[&source][edge_index].dest;

    for label in labels {
      if !label.is_call() {
        continue;
      }
      let is_wrapper = builtins::is_variadic_wrapper_name(label.name());
      let anchor = cursor;

      let child_info = build_pattern_info(label);
      // Borrow juggling: the recursion may reallocate the edge vectors, so the label is cloned
      // out before descending.
      let children: Vec<Expr> = label.arguments().to_vec();
      cursor = self.add_pattern_from(anchor, &children, child_info);

      if is_wrapper {
        let entry = self.repetition_names.entry((anchor, cursor)).or_default();
        if entry.is_empty() {
          collect_identifier_names(label, entry);
        }
      }
    }

    let edge = &mut self.edges.get_mut(&source).expect("edge vanished")[edge_index];
    if !edge.chain_exits.contains(&cursor) {
      edge.chain_exits.push(cursor);
    }
    cursor
  }

  /// Adds an edge from a source node, or returns an existing identical one. If a new edge is
  /// created, a new destination node is created too.
  fn find_or_add_edge(&mut self, source: NodeIndex, labels: &[Expr], info: PatternInfo) -> usize {
    if let Some(index) = self
        .edges
        .get(&source)
        .and_then(|edges| edges.iter().position(|edge| same_patterns(&edge.labels, labels)))
    {
      self.edges.get_mut(&source).expect("edge vanished")[index].info.merge(&info);
      return index;
    }

    self.last_node += 1;
    let dest = self.last_node;
    let edges = self.edges.entry(source).or_default();
    edges.push(DiscriminationEdge { labels: labels.to_vec(), info, dest, chain_exits: Vec::new() });
    edges.len() - 1
  }

  /// Renders the tree as GraphViz dot text, for offline inspection.
  pub fn to_dot(&self, graph_name: &str) -> String {
    let mut graph = djup_abs::DotGraph::new(graph_name);

    for node in 0..self.node_count() {
      let label = if node == ROOT_NODE {
        "Initial".to_string()
      } else {
        match self.leaves.get(&node) {
          Some(pattern_id) => format!("{}\npattern {}", node, pattern_id),
          None => node.to_string(),
        }
      };
      if self.leaves.contains_key(&node) {
        graph.add_box_node(format!("v{}", node), label);
      } else {
        graph.add_node(format!("v{}", node), label);
      }
    }

    for (&source, edges) in &self.edges {
      for edge in edges {
        graph.add_edge(
          format!("v{}", source),
          format!("v{}", edge.dest),
          join_string(edge.labels.iter(), " "),
        );
      }
    }

    graph.to_dot()
  }
}
