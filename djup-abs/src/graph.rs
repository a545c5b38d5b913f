/*!

A tiny builder for GraphViz digraphs. The engine uses it to dump discrimination trees and
substitution graphs as dot text for offline inspection. Emission is text-only; rendering is left
to external tooling.

*/

use std::fmt::Write;

/// Escapes the characters that would terminate a double-quoted dot string.
fn escape(text: &str) -> String {
  let mut result = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '"' => result.push_str("\\\""),
      '\\' => result.push_str("\\\\"),
      '\n' => result.push_str("\\n"),
      _ => result.push(ch),
    }
  }
  result
}

struct Node {
  id: String,
  label: String,
  boxed: bool,
}

struct Edge {
  from: String,
  to: String,
  label: String,
}

/// An append-only directed graph that renders itself as GraphViz dot text.
pub struct DotGraph {
  name: String,
  nodes: Vec<Node>,
  edges: Vec<Edge>,
}

impl DotGraph {
  pub fn new(name: impl Into<String>) -> Self {
    DotGraph { name: name.into(), nodes: Vec::new(), edges: Vec::new() }
  }

  /// Adds an elliptical node. The `id` must be unique within the graph.
  pub fn add_node(&mut self, id: impl Into<String>, label: impl Into<String>) {
    self.nodes.push(Node { id: id.into(), label: label.into(), boxed: false });
  }

  /// Adds a rectangular node, conventionally used for terminal states.
  pub fn add_box_node(&mut self, id: impl Into<String>, label: impl Into<String>) {
    self.nodes.push(Node { id: id.into(), label: label.into(), boxed: true });
  }

  pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, label: impl Into<String>) {
    self.edges.push(Edge { from: from.into(), to: to.into(), label: label.into() });
  }

  /// Renders the graph as dot text.
  pub fn to_dot(&self) -> String {
    let mut dest = String::new();
    let _ = writeln!(dest, "digraph G");
    let _ = writeln!(dest, "{{");
    let _ = writeln!(dest, "\tlabel = \"{}\"", escape(&self.name));

    for node in &self.nodes {
      if node.boxed {
        let _ = writeln!(dest, "\t{}[shape = box, label = \"{}\"]", node.id, escape(&node.label));
      } else {
        let _ = writeln!(dest, "\t{}[label = \"{}\"]", node.id, escape(&node.label));
      }
    }

    for edge in &self.edges {
      let _ = writeln!(
        dest,
        "\t{} -> {}[style=\"solid\", label=\"{}\"];",
        edge.from,
        edge.to,
        escape(&edge.label)
      );
    }

    let _ = writeln!(dest, "}}");
    dest
  }
}
