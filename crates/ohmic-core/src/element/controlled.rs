//! Linear controlled sources. Pins A and B are the output, C and D the control.

use crate::element::{require_finite, unpack, Component};
use crate::error::Result;
use crate::ids::Node;
use crate::mna::{Solution, Stamper};
use crate::units::Property;

macro_rules! four_pin_common {
    () => {
        fn pins(&self) -> &[Node] {
            &self.pins
        }

        fn pins_mut(&mut self) -> &mut [Node] {
            &mut self.pins
        }

        fn params(&self) -> Vec<f64> {
            vec![self.gain]
        }
    };
}

/// Voltage-controlled voltage source: `V(A,B) = gain * V(C,D)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vcvs {
    pins: [Node; 4],
    gain: f64,
    row: usize,
}

impl Vcvs {
    #[must_use]
    pub const fn new(a: Node, b: Node, c: Node, d: Node, gain: f64) -> Self {
        Self {
            pins: [a, b, c, d],
            gain,
            row: usize::MAX,
        }
    }

    #[must_use]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b, c, d], [gain]) = unpack("VCVS", pins, params)?;
        Ok(Self::new(a, b, c, d, gain))
    }
}

impl Component for Vcvs {
    four_pin_common!();

    fn extra_rows(&self) -> usize {
        1
    }

    fn assign_rows(&mut self, first: usize) {
        self.row = first;
    }

    fn validate(&self) -> Result<()> {
        require_finite("VCVS", "gain", self.gain)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.gain, "V/V")]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        let [a, b, c, d] = self.pins;
        stamper.voltage_source(a, b, self.row, 0.0);
        stamper.lhs(Some(self.row), stamper.node_row(c), -self.gain);
        stamper.lhs(Some(self.row), stamper.node_row(d), self.gain);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.row)
    }
}

/// Voltage-controlled current source: `I(A→B) = gain * V(C,D)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vccs {
    pins: [Node; 4],
    gain: f64,
}

impl Vccs {
    #[must_use]
    pub const fn new(a: Node, b: Node, c: Node, d: Node, gain: f64) -> Self {
        Self {
            pins: [a, b, c, d],
            gain,
        }
    }

    #[must_use]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b, c, d], [gain]) = unpack("VCCS", pins, params)?;
        Ok(Self::new(a, b, c, d, gain))
    }
}

impl Component for Vccs {
    four_pin_common!();

    fn validate(&self) -> Result<()> {
        require_finite("VCCS", "gain", self.gain)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.gain, "S")]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        let [a, b, c, d] = self.pins;
        stamper.lhs_nodes(a, c, self.gain);
        stamper.lhs_nodes(a, d, -self.gain);
        stamper.lhs_nodes(b, c, -self.gain);
        stamper.lhs_nodes(b, d, self.gain);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        self.gain * x.between(self.pins[2], self.pins[3])
    }
}

/// Current-controlled current source: `I(A→B) = gain * I(C→D)`.
///
/// The control current is measured by a zero-volt source between C and D.
#[derive(Debug, Clone, PartialEq)]
pub struct Cccs {
    pins: [Node; 4],
    gain: f64,
    row: usize,
}

impl Cccs {
    #[must_use]
    pub const fn new(a: Node, b: Node, c: Node, d: Node, gain: f64) -> Self {
        Self {
            pins: [a, b, c, d],
            gain,
            row: usize::MAX,
        }
    }

    #[must_use]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    /// Current through the control branch, C to D.
    #[must_use]
    pub fn control_current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.row)
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b, c, d], [gain]) = unpack("CCCS", pins, params)?;
        Ok(Self::new(a, b, c, d, gain))
    }
}

impl Component for Cccs {
    four_pin_common!();

    fn extra_rows(&self) -> usize {
        1
    }

    fn assign_rows(&mut self, first: usize) {
        self.row = first;
    }

    fn validate(&self) -> Result<()> {
        require_finite("CCCS", "gain", self.gain)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.gain, "A/A")]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        let [a, b, c, d] = self.pins;
        stamper.voltage_source(c, d, self.row, 0.0);
        stamper.lhs(stamper.node_row(a), Some(self.row), self.gain);
        stamper.lhs(stamper.node_row(b), Some(self.row), -self.gain);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        self.gain * self.control_current(x)
    }
}

/// Current-controlled voltage source: `V(A,B) = gain * I(C→D)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ccvs {
    pins: [Node; 4],
    gain: f64,
    output_row: usize,
    control_row: usize,
}

impl Ccvs {
    #[must_use]
    pub const fn new(a: Node, b: Node, c: Node, d: Node, gain: f64) -> Self {
        Self {
            pins: [a, b, c, d],
            gain,
            output_row: usize::MAX,
            control_row: usize::MAX,
        }
    }

    #[must_use]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    #[must_use]
    pub fn control_current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.control_row)
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b, c, d], [gain]) = unpack("CCVS", pins, params)?;
        Ok(Self::new(a, b, c, d, gain))
    }
}

impl Component for Ccvs {
    four_pin_common!();

    fn extra_rows(&self) -> usize {
        2
    }

    fn assign_rows(&mut self, first: usize) {
        self.output_row = first;
        self.control_row = first + 1;
    }

    fn validate(&self) -> Result<()> {
        require_finite("CCVS", "gain", self.gain)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.gain, "Ω")]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        let [a, b, c, d] = self.pins;
        stamper.voltage_source(c, d, self.control_row, 0.0);
        stamper.voltage_source(a, b, self.output_row, 0.0);
        stamper.lhs(Some(self.output_row), Some(self.control_row), -self.gain);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.output_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mna::{NodeMap, System};

    #[test]
    fn test_vccs_stamp_pattern() {
        let (a, c) = (Node::new(1), Node::new(2));
        let vccs = Vccs::new(a, Node::GROUND, c, Node::GROUND, 0.5);
        let map = NodeMap::from_pins(vccs.pins());
        let mut system = System::zeros(2);
        vccs.stamp(&mut Stamper::new(&mut system, &map));
        assert_eq!(system.lhs.rows(), vec![vec![0.0, 0.5], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_ccvs_uses_two_rows() {
        let mut ccvs = Ccvs::new(Node::new(1), Node::GROUND, Node::new(2), Node::GROUND, 2.0);
        assert_eq!(ccvs.extra_rows(), 2);
        ccvs.assign_rows(2);
        let map = NodeMap::from_pins(ccvs.pins());
        let mut system = System::zeros(4);
        ccvs.stamp(&mut Stamper::new(&mut system, &map));
        assert!((system.lhs[(2, 3)] + 2.0).abs() < f64::EPSILON);
        assert!((system.lhs[(2, 0)] - 1.0).abs() < f64::EPSILON);
        assert!((system.lhs[(3, 1)] - 1.0).abs() < f64::EPSILON);
    }
}
