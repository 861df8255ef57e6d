//! Connectivity checks run before a circuit is compiled.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::connected_components;
use petgraph::dot::Dot;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::Serialize;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::ids::{ElementId, Node};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDegree {
    pub node: Node,
    /// Number of element pins attached to the node.
    pub pins: usize,
}

/// Summary of a circuit's connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyReport {
    pub elements: usize,
    /// Non-ground nodes.
    pub nodes: usize,
    /// Extra unknowns (branch currents) in the MNA system.
    pub extra_rows: usize,
    pub components: usize,
    pub degrees: Vec<NodeDegree>,
}

/// Undirected node/element graph of a circuit.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<Node, ElementId>,
    index: HashMap<Node, NodeIndex>,
    degrees: BTreeMap<Node, usize>,
}

impl Topology {
    #[must_use]
    pub fn build(elements: &[Element]) -> Self {
        let mut topology = Self {
            graph: UnGraph::new_undirected(),
            index: HashMap::new(),
            degrees: BTreeMap::new(),
        };

        for (i, element) in elements.iter().enumerate() {
            let id = ElementId::new(i);
            let pins = element.pins();
            for &pin in pins {
                *topology.degrees.entry(pin).or_insert(0) += 1;
                topology.node_index(pin);
            }
            for (a, b) in pin_pairs(pins) {
                let (ia, ib) = (topology.node_index(a), topology.node_index(b));
                topology.graph.add_edge(ia, ib, id);
            }
        }

        topology
    }

    fn node_index(&mut self, node: Node) -> NodeIndex {
        *self
            .index
            .entry(node)
            .or_insert_with(|| self.graph.add_node(node))
    }

    /// Reject circuits that cannot produce a regular MNA matrix.
    pub fn check(&self) -> Result<()> {
        match self.degrees.get(&Node::GROUND) {
            None => return Err(Error::UngroundedCircuit),
            Some(&n) if n < 2 => return Err(Error::DanglingNode { node: Node::GROUND }),
            Some(_) => {}
        }

        if let Some((&node, _)) = self.degrees.iter().find(|&(_, &count)| count < 2) {
            return Err(Error::DanglingNode { node });
        }

        let floating = self.unreachable_from_ground();
        if floating.is_empty() {
            Ok(())
        } else {
            Err(Error::FloatingNodes { nodes: floating })
        }
    }

    fn unreachable_from_ground(&self) -> Vec<Node> {
        let Some(&ground) = self.index.get(&Node::GROUND) else {
            return self.degrees.keys().copied().collect();
        };

        let mut reached = vec![false; self.graph.node_count()];
        let mut bfs = Bfs::new(&self.graph, ground);
        while let Some(ix) = bfs.next(&self.graph) {
            reached[ix.index()] = true;
        }

        let mut floating: Vec<Node> = self
            .graph
            .node_indices()
            .filter(|ix| !reached[ix.index()])
            .map(|ix| self.graph[ix])
            .collect();
        floating.sort();
        floating
    }

    #[must_use]
    pub fn report(&self, elements: usize, extra_rows: usize) -> TopologyReport {
        TopologyReport {
            elements,
            nodes: self.degrees.keys().filter(|n| !n.is_ground()).count(),
            extra_rows,
            components: connected_components(&self.graph),
            degrees: self
                .degrees
                .iter()
                .map(|(&node, &pins)| NodeDegree { node, pins })
                .collect(),
        }
    }

    /// Graphviz rendering with nodes as vertices and elements as edges.
    #[must_use]
    pub fn to_dot(&self, label: impl Fn(ElementId) -> String) -> String {
        let labelled = self
            .graph
            .map(|_, node| node.to_string(), |_, &id| label(id));
        format!("{}", Dot::new(&labelled))
    }
}

/// Pin pairs that carry current through an element.
fn pin_pairs(pins: &[Node]) -> Vec<(Node, Node)> {
    match *pins {
        [a, b] => vec![(a, b)],
        [a, b, c] => vec![(a, b), (b, c)],
        [a, b, c, d] => vec![(a, b), (c, d)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Resistor, VoltageSource, Vcvs};

    fn n(id: u32) -> Node {
        Node::new(id)
    }

    fn divider() -> Vec<Element> {
        vec![
            VoltageSource::new(n(1), Node::GROUND, 10.0).into(),
            Resistor::new(n(1), n(2), 1.0).into(),
            Resistor::new(n(2), Node::GROUND, 1.0).into(),
        ]
    }

    #[test]
    fn test_valid_divider() {
        let topology = Topology::build(&divider());
        assert!(topology.check().is_ok());
        let report = topology.report(3, 1);
        assert_eq!(report.nodes, 2);
        assert_eq!(report.components, 1);
        assert_eq!(report.degrees[0], NodeDegree { node: Node::GROUND, pins: 2 });
    }

    #[test]
    fn test_dangling_node() {
        let mut elements = divider();
        elements.push(Resistor::new(n(2), n(3), 1.0).into());
        let err = Topology::build(&elements).check().unwrap_err();
        assert!(matches!(err, Error::DanglingNode { node } if node == n(3)));
    }

    #[test]
    fn test_ungrounded() {
        let elements: Vec<Element> = vec![
            VoltageSource::new(n(1), n(2), 10.0).into(),
            Resistor::new(n(1), n(2), 1.0).into(),
        ];
        let err = Topology::build(&elements).check().unwrap_err();
        assert!(matches!(err, Error::UngroundedCircuit));
    }

    #[test]
    fn test_floating_island() {
        let mut elements = divider();
        elements.push(Resistor::new(n(5), n(6), 1.0).into());
        elements.push(Resistor::new(n(6), n(5), 1.0).into());
        let err = Topology::build(&elements).check().unwrap_err();
        match err {
            Error::FloatingNodes { nodes } => assert_eq!(nodes, vec![n(5), n(6)]),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_control_pins_count_as_connections() {
        let mut elements = divider();
        elements.push(Vcvs::new(n(3), Node::GROUND, n(2), Node::GROUND, 2.0).into());
        elements.push(Resistor::new(n(3), Node::GROUND, 10.0).into());
        assert!(Topology::build(&elements).check().is_ok());
    }

    #[test]
    fn test_dot_output_mentions_elements() {
        let topology = Topology::build(&divider());
        let dot = topology.to_dot(|id| format!("E{}", id.index()));
        assert!(dot.contains("graph {"));
        assert!(dot.contains("E1"));
        assert!(dot.contains("gnd"));
    }
}
