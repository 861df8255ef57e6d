use thiserror::Error;

use crate::ids::{ElementId, Node};

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("netlist error: {0}")]
    Netlist(String),

    #[error("invalid parameter for {element}: {reason}")]
    InvalidParameter {
        element: &'static str,
        reason: String,
    },

    #[error("invalid tick rate {requested}s (must be positive and at most {maximum}s)")]
    InvalidTickRate { requested: f64, maximum: f64 },

    #[error("singular matrix: pivot {pivot} is zero, check the circuit for shorts or floating parts")]
    SingularMatrix { pivot: usize },

    #[error("newton-raphson did not converge after {iterations} iterations (residual {residual:e})")]
    NoConvergence { iterations: usize, residual: f64 },

    #[error("node {node} is connected without a path")]
    DanglingNode { node: Node },

    #[error("ground has no connections")]
    UngroundedCircuit,

    #[error("nodes without a path to ground: {}", format_nodes(.nodes))]
    FloatingNodes { nodes: Vec<Node> },

    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("element {id} is a {found}, not a {expected}")]
    ElementKindMismatch {
        id: ElementId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("unknown element tag {0}")]
    UnknownElementTag(u16),
}

fn format_nodes(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub(crate) fn invalid(element: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            element,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating_nodes_message_lists_nodes() {
        let err = Error::FloatingNodes {
            nodes: vec![Node::new(3), Node::new(4)],
        };
        assert_eq!(err.to_string(), "nodes without a path to ground: 3, 4");
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = Error::invalid("Resistor", "resistance must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter for Resistor: resistance must be positive"
        );
    }
}
