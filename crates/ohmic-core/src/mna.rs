//! Modified Nodal Analysis system layout and stamping.
//!
//! Rows `0..nodes` hold the KCL equations of the non-ground nodes, rows
//! `nodes..size` hold the extra unknowns (branch currents) of voltage-source
//! like elements. Ground never has a row; stamps touching it are dropped.

use std::collections::HashMap;

use crate::ids::Node;
use crate::matrix::Matrix;

/// Row assignment for the non-ground nodes of a compiled circuit.
#[derive(Debug, Clone, Default)]
pub struct NodeMap {
    rows: HashMap<Node, usize>,
    order: Vec<Node>,
}

impl NodeMap {
    /// Assign rows in order of first appearance.
    pub fn from_pins<'a>(pins: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut map = Self::default();
        for &node in pins {
            if !node.is_ground() && !map.rows.contains_key(&node) {
                map.rows.insert(node, map.order.len());
                map.order.push(node);
            }
        }
        map
    }

    #[must_use]
    pub fn row(&self, node: Node) -> Option<usize> {
        self.rows.get(&node).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in row order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.order
    }

    /// One-based label used in element descriptions, `gnd` for ground.
    #[must_use]
    pub fn label(&self, node: Node) -> String {
        self.row(node)
            .map_or_else(|| "gnd".to_string(), |row| (row + 1).to_string())
    }
}

/// The linear system `G x = z`.
#[derive(Debug, Clone)]
pub struct System {
    pub lhs: Matrix,
    pub rhs: Vec<f64>,
}

impl System {
    #[must_use]
    pub fn zeros(size: usize) -> Self {
        Self {
            lhs: Matrix::zeros(size),
            rhs: vec![0.0; size],
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.rhs.len()
    }
}

/// Read access to a solution vector, by node or by extra row.
#[derive(Debug, Clone, Copy)]
pub struct Solution<'a> {
    x: &'a [f64],
    nodes: &'a NodeMap,
}

impl<'a> Solution<'a> {
    #[must_use]
    pub fn new(x: &'a [f64], nodes: &'a NodeMap) -> Self {
        Self { x, nodes }
    }

    /// Voltage of `node` against ground. NaN for unknown nodes or an
    /// unsolved system.
    #[must_use]
    pub fn voltage(&self, node: Node) -> f64 {
        if node.is_ground() {
            return 0.0;
        }
        self.nodes
            .row(node)
            .and_then(|row| self.x.get(row))
            .copied()
            .unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn between(&self, a: Node, b: Node) -> f64 {
        self.voltage(a) - self.voltage(b)
    }

    /// Value of an extra unknown, typically a branch current.
    #[must_use]
    pub fn row(&self, row: usize) -> f64 {
        self.x.get(row).copied().unwrap_or(f64::NAN)
    }
}

/// Writes element stamps into the LHS and RHS of a [`System`].
#[derive(Debug)]
pub struct Stamper<'a> {
    lhs: &'a mut Matrix,
    rhs: &'a mut [f64],
    nodes: &'a NodeMap,
}

impl<'a> Stamper<'a> {
    pub fn new(system: &'a mut System, nodes: &'a NodeMap) -> Self {
        Self {
            lhs: &mut system.lhs,
            rhs: &mut system.rhs,
            nodes,
        }
    }

    #[must_use]
    pub fn node_row(&self, node: Node) -> Option<usize> {
        self.nodes.row(node)
    }

    /// Add to one LHS entry; `None` is ground and is skipped.
    pub fn lhs(&mut self, row: Option<usize>, col: Option<usize>, value: f64) {
        if let (Some(r), Some(c)) = (row, col) {
            self.lhs.add(r, c, value);
        }
    }

    /// Add to one LHS entry addressed by nodes.
    pub fn lhs_nodes(&mut self, row: Node, col: Node, value: f64) {
        let (r, c) = (self.nodes.row(row), self.nodes.row(col));
        self.lhs(r, c, value);
    }

    pub fn rhs(&mut self, row: Option<usize>, value: f64) {
        if let Some(r) = row {
            self.rhs[r] += value;
        }
    }

    pub fn conductance(&mut self, a: Node, b: Node, g: f64) {
        let (ra, rb) = (self.nodes.row(a), self.nodes.row(b));
        self.lhs(ra, ra, g);
        self.lhs(rb, rb, g);
        self.lhs(ra, rb, -g);
        self.lhs(rb, ra, -g);
    }

    pub fn resistance(&mut self, a: Node, b: Node, r: f64) {
        self.conductance(a, b, 1.0 / r);
    }

    /// Ideal voltage source `V(a) - V(b) = v` using extra row `k`.
    pub fn voltage_source(&mut self, a: Node, b: Node, k: usize, v: f64) {
        let (ra, rb) = (self.nodes.row(a), self.nodes.row(b));
        self.lhs(ra, Some(k), 1.0);
        self.lhs(Some(k), ra, 1.0);
        self.lhs(rb, Some(k), -1.0);
        self.lhs(Some(k), rb, -1.0);
        self.rhs(Some(k), v);
    }

    /// Inject `i` into node `a`, drawn from node `b`.
    pub fn current_source(&mut self, a: Node, b: Node, i: f64) {
        self.sources().current_source(a, b, i);
    }

    /// RHS-only view of this stamper.
    pub fn sources(&mut self) -> SourceStamper<'_> {
        SourceStamper {
            rhs: &mut *self.rhs,
            nodes: self.nodes,
        }
    }
}

/// RHS-only stamper used for per-step source updates.
#[derive(Debug)]
pub struct SourceStamper<'a> {
    rhs: &'a mut [f64],
    nodes: &'a NodeMap,
}

impl<'a> SourceStamper<'a> {
    pub fn new(rhs: &'a mut [f64], nodes: &'a NodeMap) -> Self {
        Self { rhs, nodes }
    }

    pub fn current_source(&mut self, a: Node, b: Node, i: f64) {
        if let Some(r) = self.nodes.row(a) {
            self.rhs[r] += i;
        }
        if let Some(r) = self.nodes.row(b) {
            self.rhs[r] -= i;
        }
    }

    /// Add `value` to the row of `node`; ground is skipped.
    pub fn inject(&mut self, node: Node, value: f64) {
        if let Some(r) = self.nodes.row(node) {
            self.rhs[r] += value;
        }
    }

    /// Add `value` to the RHS of extra row `k`.
    pub fn row(&mut self, k: usize, value: f64) {
        self.rhs[k] += value;
    }
}
