/*!

The matching engine. A *candidate* is a tentative alignment between a span of target arguments
and the labels of a discrimination-tree edge; a *solution* is a root-to-leaf path through the
committed solution edges whose accumulated substitutions are mutually consistent.

Matching runs two work queues in insertion order: pending candidates and pending
discrimination-node expansions, candidates first so the number of live candidates stays low.
Processing a candidate walks its labels over its targets:

 - a literal label must be structurally equal to the current target;
 - a typed identifier label type-checks the target and records a substitution;
 - a composite-call label suspends the candidate into a continuation frame and enqueues an
   expansion of the next tree level against the target's own arguments;
 - a variadic label enumerates every usable width, enqueueing per width a repetition expansion
   (entering a variadic scope) whose continuation frame resumes the suspended candidate past the
   repetition.

Completed candidates commit a solution edge between their two solution-graph nodes; the node
space reuses the discrimination root and leaf indices and allocates *virtual* nodes past the
tree's node count for the intermediate split points. The discrimination cursor is threaded
through the continuation frames, and every repetition pass must exit the sub-chain at the same
node, which keeps walks that mix different patterns' chains from ever completing.

After the queues drain, solutions are flushed: the committed edges are walked from the root,
duplicating on branches, applying each edge's scope open/close bookkeeping to a
`SubstitutionsBuilder` and discarding contradictory paths; paths ending on a leaf node report
that leaf's pattern id.

*/

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use djup_abs::{debug, join_string, trace, DotGraph, IString, NatSet};

use crate::{
  api::expression::{always_equal, Expr},
  core::{
    interval::Interval,
    namespace::Namespace,
    pattern::{
      discrimination_tree::{DiscriminationTree, NodeIndex, PatternId, ROOT_NODE},
      substitutions_builder::{Substitution, SubstitutionsBuilder},
    },
    tensor_type::type_belongs_to,
  },
};

/// Sentinel destination of the top-level candidates: the real destination, the pattern's leaf
/// node, is only known at completion.
const PENDING_DEST: NodeIndex = u32::MAX;

/// Identifies a discrimination edge without borrowing the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct EdgeRef {
  source: NodeIndex,
  index: usize,
}

/// The suspended state of a candidate that split at a composite or variadic label. Resumed when
/// the sub-problem completes, with the discrimination cursor the sub-walk ended at.
#[derive(Clone)]
struct Frame {
  sol_source: NodeIndex,
  sol_dest: NodeIndex,
  edge: EdgeRef,
  label_index: usize,
  targets: Arc<Vec<Expr>>,
  target_index: usize,
  repetitions: u32,
  rep_index: u32,
  first_rep_exit: Option<NodeIndex>,
  close: u32,
  parent: Option<Rc<Frame>>,
}

struct Candidate {
  sol_source: NodeIndex,
  sol_dest: NodeIndex,
  /// The discrimination edge whose labels are being matched. `None` for the placeholder
  /// candidates of zero-width repetitions.
  edge: Option<EdgeRef>,
  label_index: usize,
  /// The tree node where the next composite label's sub-chain anchors.
  cursor: NodeIndex,
  first_rep_exit: Option<NodeIndex>,
  targets: Arc<Vec<Expr>>,
  target_index: usize,
  repetitions: u32,
  rep_index: u32,
  /// Variadic scopes this candidate enters (0 or 1).
  open: u32,
  /// Identifiers to register in the opened scope; nonempty only for zero-width repetitions.
  touch: Vec<IString>,
  /// Variadic scopes closed when this candidate's chain completes.
  close: u32,
  substitutions: Vec<Substitution>,
  conts: Option<Rc<Frame>>,
}

/// A pending expansion of a discrimination node: one candidate is created per outgoing edge
/// whose `arguments_range` accepts the target count.
struct Expansion {
  node: NodeIndex,
  targets: Arc<Vec<Expr>>,
  /// How many times the created candidates repeat their labels; 0 marks an empty repetition,
  /// which creates one placeholder candidate per possible chain exit.
  repetitions: u32,
  sol_source: NodeIndex,
  open: u32,
  close: u32,
  /// Continuation of the suspended parent; its `sol_source` is assigned per created branch.
  frame: Option<Frame>,
}

/// Committed edge of a successful subproblem.
struct SolutionEdge {
  dest: NodeIndex,
  open: u32,
  touch: Vec<IString>,
  close: u32,
  substitutions: Vec<Substitution>,
}

#[derive(Clone, Debug)]
pub struct Solution {
  pub pattern_id: PatternId,
  pub substitutions: Vec<Substitution>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchStepKind {
  CandidateProcessed,
  NodeExpanded,
}

/// Passed to the step callback after each unit of work; the only cooperative yield of the
/// matcher. Returning false from the callback stops matching after the current step.
#[derive(Copy, Clone, Debug)]
pub struct MatchStep {
  pub kind: MatchStepKind,
  pub step_index: u32,
  pub pending_candidates: usize,
  pub pending_expansions: usize,
}

pub struct SubstitutionGraph<'t> {
  tree: &'t DiscriminationTree,

  candidates: VecDeque<Candidate>,
  expansions: VecDeque<Expansion>,

  solution_edges: HashMap<NodeIndex, Vec<SolutionEdge>>,
  reached_leaves: Vec<(NodeIndex, PatternId)>,
  reached_set: NatSet,
  next_virtual_node: NodeIndex,

  solutions: Vec<Solution>,

  /// When set, a dot rendition of the graph is written there after every step.
  artifact_directory: Option<PathBuf>,
  step_count: u32,
}

impl<'t> SubstitutionGraph<'t> {
  pub fn new(tree: &'t DiscriminationTree) -> Self {
    SubstitutionGraph {
      tree,
      candidates: VecDeque::new(),
      expansions: VecDeque::new(),
      solution_edges: HashMap::new(),
      reached_leaves: Vec::new(),
      reached_set: NatSet::default(),
      next_virtual_node: tree.node_count(),
      solutions: Vec::new(),
      artifact_directory: None,
      step_count: 0,
    }
  }

  pub fn set_artifact_directory(&mut self, directory: PathBuf) {
    self.artifact_directory = Some(directory);
  }

  pub fn solutions(&self) -> &[Solution] {
    &self.solutions
  }

  /// Enumerates all variable bindings making some indexed pattern equal to `target`. Matching
  /// never fails; a mismatch is an empty solution list. The callback, if given, observes every
  /// step and may cancel by returning false, in which case the solutions gathered so far are
  /// still flushed.
  pub fn find_matches(
    &mut self,
    namespace: &Namespace,
    target: &Expr,
    mut step_callback: Option<&mut dyn FnMut(&MatchStep) -> bool>,
  ) {
    self.reset();

    self.expansions.push_back(Expansion {
      node: ROOT_NODE,
      targets: Arc::new(vec![target.clone()]),
      repetitions: 1,
      sol_source: ROOT_NODE,
      open: 0,
      close: 0,
      frame: None,
    });

    loop {
      // Candidates have priority over nodes to expand, to keep the number of live candidates
      // low.
      let kind = if let Some(candidate) = self.candidates.pop_front() {
        self.process_candidate(namespace, candidate);
        MatchStepKind::CandidateProcessed
      } else if let Some(expansion) = self.expansions.pop_front() {
        self.expand_node(expansion);
        MatchStepKind::NodeExpanded
      } else {
        break;
      };

      self.step_count += 1;
      self.dump_artifact();

      if let Some(callback) = step_callback.as_mut() {
        let step = MatchStep {
          kind,
          step_index: self.step_count,
          pending_candidates: self.candidates.len(),
          pending_expansions: self.expansions.len(),
        };
        if !callback(&step) {
          debug!(3, "matching cancelled by the step callback at step {}", self.step_count);
          break;
        }
      }
    }

    self.flush_solutions();
    debug!(
      3,
      "matching {} finished after {} steps with {} solutions",
      target,
      self.step_count,
      self.solutions.len()
    );
  }

  fn reset(&mut self) {
    self.candidates.clear();
    self.expansions.clear();
    self.solution_edges.clear();
    self.reached_leaves.clear();
    self.reached_set.clear();
    self.next_virtual_node = self.tree.node_count();
    self.solutions.clear();
    self.step_count = 0;
  }

  fn new_virtual_node(&mut self) -> NodeIndex {
    let node = self.next_virtual_node;
    self.next_virtual_node += 1;
    node
  }

  fn commit_edge(
    &mut self,
    source: NodeIndex,
    dest: NodeIndex,
    open: u32,
    touch: Vec<IString>,
    close: u32,
    substitutions: Vec<Substitution>,
  ) {
    trace!(5, "solution edge {} -> {} (open {}, close {}, {} substitutions)", source, dest, open, close, substitutions.len());
    self
        .solution_edges
        .entry(source)
        .or_default()
        .push(SolutionEdge { dest, open, touch, close, substitutions });
  }

  /// Commits the substitutions and scope-opens gathered so far as their own edge, so that the
  /// branches created by a split all continue from a common node with a clean slate.
  fn flush_segment(&mut self, candidate: &mut Candidate) -> NodeIndex {
    if candidate.open == 0 && candidate.substitutions.is_empty() {
      return candidate.sol_source;
    }
    let mid = self.new_virtual_node();
    let open = std::mem::take(&mut candidate.open);
    let touch = std::mem::take(&mut candidate.touch);
    let substitutions = std::mem::take(&mut candidate.substitutions);
    self.commit_edge(candidate.sol_source, mid, open, touch, 0, substitutions);
    candidate.sol_source = mid;
    mid
  }

  /// Suspends the candidate past the label it split at. The frame's `sol_source` is assigned
  /// when the expansion creates the branch.
  fn make_frame(candidate: &Candidate, target_advance: usize) -> Frame {
    Frame {
      sol_source: PENDING_DEST,
      sol_dest: candidate.sol_dest,
      edge: candidate.edge.expect("splitting candidates always carry an edge"),
      label_index: candidate.label_index + 1,
      targets: candidate.targets.clone(),
      target_index: candidate.target_index + target_advance,
      repetitions: candidate.repetitions,
      rep_index: candidate.rep_index,
      first_rep_exit: candidate.first_rep_exit,
      close: candidate.close,
      parent: candidate.conts.clone(),
    }
  }

  fn expand_node(&mut self, expansion: Expansion) {
    let tree = self.tree;

    if expansion.repetitions == 0 {
      // Empty repetition: nothing is walked, so the continuation must be tried from every
      // possible chain exit, with the repetition's identifiers registered for empty binding.
      for exit in tree.node_chain_exits(expansion.node) {
        let touch = tree.repetition_names(expansion.node, exit).to_vec();
        let (sol_dest, conts) = self.wire_branch(&expansion);
        self.candidates.push_back(Candidate {
          sol_source: expansion.sol_source,
          sol_dest,
          edge: None,
          label_index: 0,
          cursor: exit,
          first_rep_exit: None,
          targets: expansion.targets.clone(),
          target_index: 0,
          repetitions: 0,
          rep_index: 0,
          open: expansion.open,
          touch,
          close: expansion.close,
          substitutions: Vec::new(),
          conts,
        });
      }
      return;
    }

    trace!(
      5,
      "expanding node {} against {} targets",
      expansion.node,
      expansion.targets.len()
    );

    for (index, edge) in tree.edges_from(expansion.node).iter().enumerate() {
      // Early reject if the number of targets is incompatible with the width of the labels.
      if !edge
          .info
          .arguments_range
          .scaled(expansion.repetitions)
          .contains(expansion.targets.len() as u32)
      {
        continue;
      }

      let (sol_dest, conts) = self.wire_branch(&expansion);
      self.candidates.push_back(Candidate {
        sol_source: expansion.sol_source,
        sol_dest,
        edge: Some(EdgeRef { source: expansion.node, index }),
        label_index: 0,
        cursor: edge.dest,
        first_rep_exit: None,
        targets: expansion.targets.clone(),
        target_index: 0,
        repetitions: expansion.repetitions,
        rep_index: 0,
        open: expansion.open,
        touch: Vec::new(),
        close: expansion.close,
        substitutions: Vec::new(),
        conts,
      });
    }
  }

  /// Gives a branch of an expansion its own intermediate solution node, so that paths through
  /// different branches can never mix.
  fn wire_branch(&mut self, expansion: &Expansion) -> (NodeIndex, Option<Rc<Frame>>) {
    match &expansion.frame {
      None => (PENDING_DEST, None),
      Some(frame) => {
        let mid = self.new_virtual_node();
        let mut frame = frame.clone();
        frame.sol_source = mid;
        (mid, Some(Rc::new(frame)))
      }
    }
  }

  fn process_candidate(&mut self, namespace: &Namespace, mut candidate: Candidate) {
    let tree = self.tree;

    loop {
      let edge_ref = match candidate.edge {
        Some(edge_ref) if candidate.repetitions > 0 => edge_ref,
        // Zero-width placeholder: completes immediately at its preset chain exit.
        _ => break,
      };
      let edge = &tree.edges_from(edge_ref.source)[edge_ref.index];

      if candidate.label_index == edge.labels.len() {
        // End of one repetition pass. Every pass must exit the sub-chain at the same node,
        // otherwise the walk mixed chains belonging to different patterns.
        match candidate.first_rep_exit {
          Some(exit) if exit != candidate.cursor => return,
          _ => candidate.first_rep_exit = Some(candidate.cursor),
        }
        candidate.rep_index += 1;
        if candidate.rep_index >= candidate.repetitions {
          break;
        }
        candidate.label_index = 0;
        candidate.cursor = edge.dest;
        continue;
      }

      let label = &edge.labels[candidate.label_index];
      let info = &edge.info.arguments[candidate.label_index];

      if info.cardinality.has_single_value() {
        if candidate.target_index >= candidate.targets.len() {
          return;
        }
        let target = candidate.targets[candidate.target_index].clone();

        if label.is_literal() || (label.is_constant() && label.arguments().is_empty()) {
          if !always_equal(label, &target) {
            return;
          }
          candidate.label_index += 1;
          candidate.target_index += 1;
        } else if label.is_identifier() {
          let label_type = label.tensor_type().expect("identifiers always carry a type");
          if !type_belongs_to(target.tensor_type(), label_type, namespace) {
            return;
          }
          candidate
              .substitutions
              .push(Substitution::new(label.name().clone(), target));
          candidate.label_index += 1;
          candidate.target_index += 1;
        } else {
          // Composite call: the target must be a composite with the same function name; its
          // arguments become the targets of the next tree level.
          if target.is_identifier() || target.name() != label.name() {
            return;
          }
          let node = candidate.cursor;
          let sub_targets = Arc::new(target.arguments().to_vec());
          let sol_source = self.flush_segment(&mut candidate);
          let frame = Self::make_frame(&candidate, 1);
          self.expansions.push_back(Expansion {
            node,
            targets: sub_targets,
            repetitions: 1,
            sol_source,
            open: 0,
            close: 0,
            frame: Some(frame),
          });
          return;
        }
      } else {
        // Variadic label: enumerate every width this repetition may consume.
        let sub_pattern_count = label.arguments().len() as u32;
        if sub_pattern_count == 0 {
          return;
        }

        let available = (candidate.targets.len() - candidate.target_index) as u32;
        if available < info.remaining.min {
          return;
        }
        let usable_max = available - info.remaining.min;
        let usable_min = if info.remaining.max == Interval::INFINITE {
          0
        } else {
          available.saturating_sub(info.remaining.max)
        };
        let mut usable = info.cardinality.clamp_range(Interval::new(usable_min, usable_max));
        if usable.is_empty() {
          return;
        }

        // Partial repetitions are forbidden: align the bounds to multiples of the sub-pattern
        // count, the lower bound up and the upper bound down.
        usable.min = usable.min.div_ceil(sub_pattern_count) * sub_pattern_count;
        usable.max -= usable.max % sub_pattern_count;
        if usable.is_empty() {
          return;
        }

        trace!(5, "variadic label {} may use {} targets", label, usable);

        let node = candidate.cursor;
        let sol_source = self.flush_segment(&mut candidate);

        let mut width = usable.min;
        loop {
          let frame = Self::make_frame(&candidate, width as usize);
          let slice = candidate.targets
              [candidate.target_index..candidate.target_index + width as usize]
              .to_vec();
          self.expansions.push_back(Expansion {
            node,
            targets: Arc::new(slice),
            repetitions: width / sub_pattern_count,
            sol_source,
            open: 1,
            close: 1,
            frame: Some(frame),
          });

          if width == usable.max {
            break;
          }
          width += sub_pattern_count;
        }
        return;
      }
    }

    // The labels are fully matched; the candidate commits only if the targets are exhausted too.
    if candidate.target_index != candidate.targets.len() {
      return;
    }

    match candidate.conts.take() {
      None => {
        // Top level: the chain exit must be a pattern's leaf.
        if let Some(pattern_id) = tree.leaf(candidate.cursor) {
          let leaf = candidate.cursor;
          self.commit_edge(
            candidate.sol_source,
            leaf,
            candidate.open,
            std::mem::take(&mut candidate.touch),
            candidate.close,
            std::mem::take(&mut candidate.substitutions),
          );
          if !self.reached_set.contains(leaf as usize) {
            self.reached_set.insert(leaf as usize);
            self.reached_leaves.push((leaf, pattern_id));
            debug!(4, "reached leaf node {} of pattern {}", leaf, pattern_id);
          }
        }
      }
      Some(frame) => {
        self.commit_edge(
          candidate.sol_source,
          candidate.sol_dest,
          candidate.open,
          std::mem::take(&mut candidate.touch),
          candidate.close,
          std::mem::take(&mut candidate.substitutions),
        );

        // Resume the suspended parent, threading the chain exit cursor into it.
        let frame = Rc::try_unwrap(frame).unwrap_or_else(|shared| (*shared).clone());
        self.candidates.push_back(Candidate {
          sol_source: frame.sol_source,
          sol_dest: frame.sol_dest,
          edge: Some(frame.edge),
          label_index: frame.label_index,
          cursor: candidate.cursor,
          first_rep_exit: frame.first_rep_exit,
          targets: frame.targets,
          target_index: frame.target_index,
          repetitions: frame.repetitions,
          rep_index: frame.rep_index,
          open: 0,
          touch: Vec::new(),
          close: frame.close,
          substitutions: Vec::new(),
          conts: frame.parent,
        });
      }
    }
  }

  /// Walks the committed solution edges from the root, duplicating on branches and discarding
  /// contradictory paths; paths ending on a leaf become solutions, ordered by the order their
  /// leaf was first reached.
  fn flush_solutions(&mut self) {
    let mut results: Vec<(usize, Solution)> = Vec::new();
    let mut work: VecDeque<(NodeIndex, SubstitutionsBuilder)> = VecDeque::new();
    work.push_back((ROOT_NODE, SubstitutionsBuilder::new()));

    while let Some((node, builder)) = work.pop_front() {
      let edges = self.solution_edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);

      if edges.is_empty() {
        if builder.depth() == 0 {
          if let Some(pattern_id) = self.tree.leaf(node) {
            if let Some(rank) = self.reached_leaves.iter().position(|(leaf, _)| *leaf == node) {
              results.push((rank, Solution { pattern_id, substitutions: builder.into_substitutions() }));
            }
          }
        }
        continue;
      }

      for edge in edges {
        let mut branch = builder.clone();
        branch.open(edge.open);
        if !edge.touch.is_empty() {
          branch.touch(&edge.touch);
        }
        if !branch.add(&edge.substitutions) {
          continue;
        }
        if !branch.close(edge.close) {
          continue;
        }
        work.push_back((edge.dest, branch));
      }
    }

    results.sort_by_key(|(rank, _)| *rank);
    self.solutions = results.into_iter().map(|(_, solution)| solution).collect();
  }

  /// Renders the current solution graph as GraphViz dot text.
  pub fn to_dot(&self, graph_name: &str) -> String {
    let mut graph = DotGraph::new(graph_name);

    let mut nodes: Vec<NodeIndex> = Vec::new();
    let mut remember = |node: NodeIndex, nodes: &mut Vec<NodeIndex>| {
      if !nodes.contains(&node) {
        nodes.push(node);
      }
    };
    for (&source, edges) in &self.solution_edges {
      remember(source, &mut nodes);
      for edge in edges {
        remember(edge.dest, &mut nodes);
      }
    }
    nodes.sort_unstable();

    for node in nodes {
      let label = if node == ROOT_NODE {
        "Initial".to_string()
      } else {
        match self.tree.leaf(node) {
          Some(pattern_id) => format!("pattern {}", pattern_id),
          None => node.to_string(),
        }
      };
      if self.tree.leaf(node).is_some() {
        graph.add_box_node(format!("s{}", node), label);
      } else {
        graph.add_node(format!("s{}", node), label);
      }
    }

    for (&source, edges) in &self.solution_edges {
      for edge in edges {
        let mut label = join_string(edge.substitutions.iter(), ", ");
        if edge.open > 0 {
          label = format!("open {} {}", edge.open, label);
        }
        if edge.close > 0 {
          label = format!("{} close {}", label, edge.close);
        }
        graph.add_edge(format!("s{}", source), format!("s{}", edge.dest), label);
      }
    }

    graph.to_dot()
  }

  fn dump_artifact(&self) {
    if let Some(directory) = &self.artifact_directory {
      let path = directory.join(format!("step_{}.dot", self.step_count));
      let dot = self.to_dot(&format!("step {}", self.step_count));
      if let Err(error) = std::fs::write(&path, dot) {
        debug!(1, "failed to write match artifact {}: {}", path.display(), error);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::expression::{make_composite, make_identifier, make_literal_integer};
  use crate::core::builtins;
  use crate::core::tensor_type::TensorType;

  fn real_identifier(name: &str) -> Expr {
    make_identifier(TensorType::unknown_shape(builtins::REAL.clone()), name)
  }

  fn call(name: &str, arguments: Vec<Expr>) -> Expr {
    make_composite(name, arguments).unwrap()
  }

  fn many(arguments: Vec<Expr>) -> Expr {
    make_composite(builtins::REPETITIONS_ZERO_TO_MANY.clone(), arguments).unwrap()
  }

  fn run(tree: &DiscriminationTree, target: &Expr) -> Vec<Solution> {
    let namespace = Namespace::standard();
    let mut graph = SubstitutionGraph::new(tree);
    graph.find_matches(&namespace, target, None);
    graph.solutions().to_vec()
  }

  fn binding(solution: &Solution, name: &str) -> String {
    solution
        .substitutions
        .iter()
        .find(|s| s.identifier_name.as_ref() == name)
        .map(|s| s.value.to_string())
        .unwrap_or_else(|| panic!("no binding for {}", name))
  }

  #[test]
  fn literal_pattern_matches_itself() {
    let pattern = call("f", vec![make_literal_integer(1), make_literal_integer(2)]);
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let solutions = run(&tree, &pattern);
    assert_eq!(solutions.len(), 1);
    assert!(solutions[0].substitutions.is_empty());

    let other = call("f", vec![make_literal_integer(1), make_literal_integer(3)]);
    assert!(run(&tree, &other).is_empty());
  }

  #[test]
  fn identifier_binds_target() {
    let pattern = call("f", vec![real_identifier("x")]);
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let target = call("f", vec![make_literal_integer(7)]);
    let solutions = run(&tree, &target);
    assert_eq!(solutions.len(), 1);
    assert_eq!(binding(&solutions[0], "x"), "7");
  }

  #[test]
  fn type_mismatch_rejects() {
    // bool b does not accept an integer target.
    let pattern = call(
      "f",
      vec![make_identifier(TensorType::unknown_shape(builtins::BOOL.clone()), "b")],
    );
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let target = call("f", vec![make_literal_integer(7)]);
    assert!(run(&tree, &target).is_empty());
  }

  #[test]
  fn two_variadics_enumerate_all_splits() {
    // f(x..., y...) against f(1, 2, 3): 4 solutions, one per split point.
    let pattern = call(
      "f",
      vec![many(vec![real_identifier("x")]), many(vec![real_identifier("y")])],
    );
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let target = call(
      "f",
      vec![make_literal_integer(1), make_literal_integer(2), make_literal_integer(3)],
    );
    let solutions = run(&tree, &target);
    assert_eq!(solutions.len(), 4);

    for solution in &solutions {
      let x = binding(solution, "x");
      let y = binding(solution, "y");
      assert!(x.starts_with("Tuple("));
      assert!(y.starts_with("Tuple("));
    }
  }

  #[test]
  fn empty_variadic_binds_empty_tuple() {
    let pattern = call("f", vec![many(vec![real_identifier("x")])]);
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let target = call("f", vec![]);
    let solutions = run(&tree, &target);
    assert_eq!(solutions.len(), 1);
    assert_eq!(binding(&solutions[0], "x"), "Tuple()");
  }

  #[test]
  fn target_shorter_than_minimum_yields_nothing() {
    // f(1, x..) needs at least two arguments.
    let pattern = call(
      "f",
      vec![
        make_literal_integer(1),
        make_composite(builtins::REPETITIONS_ONE_TO_MANY.clone(), vec![real_identifier("x")]).unwrap(),
      ],
    );
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let target = call("f", vec![make_literal_integer(1)]);
    assert!(run(&tree, &target).is_empty());
  }

  #[test]
  fn multiple_patterns_report_the_right_leaf() {
    let first = call("f", vec![make_literal_integer(1), real_identifier("x")]);
    let second = call("g", vec![real_identifier("x")]);

    let mut tree = DiscriminationTree::new();
    tree.add_pattern(10, &first, None).unwrap();
    tree.add_pattern(20, &second, None).unwrap();

    let target = call("g", vec![make_literal_integer(5)]);
    let solutions = run(&tree, &target);
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].pattern_id, 20);
  }

  #[test]
  fn shared_prefix_does_not_cross_wire() {
    // f(g(1)) and f(g(2)) share the f and g levels; a target must reach its own leaf only.
    let first = call("f", vec![call("g", vec![make_literal_integer(1)])]);
    let second = call("f", vec![call("g", vec![make_literal_integer(2)])]);

    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &first, None).unwrap();
    tree.add_pattern(1, &second, None).unwrap();

    let solutions = run(&tree, &first);
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].pattern_id, 0);

    let solutions = run(&tree, &second);
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].pattern_id, 1);
  }

  #[test]
  fn repetitions_cannot_mix_sibling_patterns() {
    // f(g(1)...) and f(g(2)...) share the repetition chain prefix; a target interleaving g(1)
    // and g(2) matches neither.
    let first = call("f", vec![many(vec![call("g", vec![make_literal_integer(1)])])]);
    let second = call("f", vec![many(vec![call("g", vec![make_literal_integer(2)])])]);

    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &first, None).unwrap();
    tree.add_pattern(1, &second, None).unwrap();

    let mixed = call(
      "f",
      vec![call("g", vec![make_literal_integer(1)]), call("g", vec![make_literal_integer(2)])],
    );
    assert!(run(&tree, &mixed).is_empty());

    let pure = call(
      "f",
      vec![call("g", vec![make_literal_integer(2)]), call("g", vec![make_literal_integer(2)])],
    );
    let solutions = run(&tree, &pure);
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].pattern_id, 1);
  }

  #[test]
  fn callback_observes_and_cancels() {
    let pattern = call("f", vec![many(vec![real_identifier("x")])]);
    let mut tree = DiscriminationTree::new();
    tree.add_pattern(0, &pattern, None).unwrap();

    let target = call("f", vec![make_literal_integer(1), make_literal_integer(2)]);
    let namespace = Namespace::standard();

    let mut steps = 0;
    let mut graph = SubstitutionGraph::new(&tree);
    let mut callback = |_step: &MatchStep| {
      steps += 1;
      true
    };
    let callback: &mut dyn FnMut(&MatchStep) -> bool = &mut callback;
    graph.find_matches(&namespace, &target, Some(callback));
    assert!(steps > 0);
    assert_eq!(graph.solutions().len(), 1);

    // Cancelling at the first step leaves no solutions.
    let mut cancel = |_step: &MatchStep| false;
    let cancel: &mut dyn FnMut(&MatchStep) -> bool = &mut cancel;
    graph.find_matches(&namespace, &target, Some(cancel));
    assert!(graph.solutions().is_empty());
  }
}
