use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to an element inside a [`Circuit`](crate::Circuit).
///
/// Ids are dense indices into the circuit's element list and are only
/// meaningful for the circuit that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(usize);

impl ElementId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An electrical node. Pins that share a node are connected.
///
/// `Node::GROUND` is the reference node; it has no row in the system matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node(u32);

impl Node {
    pub const GROUND: Self = Self(0);

    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_ground(self) -> bool {
        self.0 == 0
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::GROUND
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "gnd")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
