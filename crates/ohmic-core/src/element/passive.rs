use crate::element::{require_positive, unpack, Component, Dynamic};
use crate::error::Result;
use crate::ids::Node;
use crate::mna::{Solution, SourceStamper, Stamper};
use crate::units::Property;

#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pins: [Node; 2],
    resistance: f64,
}

impl Resistor {
    #[must_use]
    pub const fn new(a: Node, b: Node, resistance: f64) -> Self {
        Self {
            pins: [a, b],
            resistance,
        }
    }

    #[must_use]
    pub const fn resistance(&self) -> f64 {
        self.resistance
    }

    pub fn set_resistance(&mut self, resistance: f64) {
        self.resistance = resistance;
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [r]) = unpack("Resistor", pins, params)?;
        Ok(Self::new(a, b, r))
    }
}

impl Component for Resistor {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        require_positive("Resistor", "resistance", self.resistance)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.resistance, "Ω")]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.resistance]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.resistance(self.pins[0], self.pins[1], self.resistance);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        self.voltage(x) / self.resistance
    }
}

/// Linear capacitor, integrated with backward Euler.
///
/// Each step is modelled as a conductance `C/dt` in parallel with a current
/// source carrying the charge from the previous step.
#[derive(Debug, Clone, PartialEq)]
pub struct Capacitor {
    pins: [Node; 2],
    capacitance: f64,
    dt: f64,
    conductance: f64,
    source: f64,
    current: f64,
}

impl Capacitor {
    #[must_use]
    pub const fn new(a: Node, b: Node, capacitance: f64) -> Self {
        Self {
            pins: [a, b],
            capacitance,
            dt: 0.0,
            conductance: 0.0,
            source: 0.0,
            current: 0.0,
        }
    }

    #[must_use]
    pub const fn capacitance(&self) -> f64 {
        self.capacitance
    }

    pub fn set_capacitance(&mut self, capacitance: f64) {
        self.capacitance = capacitance;
        if self.dt > 0.0 {
            self.conductance = capacitance / self.dt;
        }
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [c]) = unpack("Capacitor", pins, params)?;
        Ok(Self::new(a, b, c))
    }
}

impl Component for Capacitor {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        require_positive("Capacitor", "capacitance", self.capacitance)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.capacitance, "F")]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.capacitance]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.conductance(self.pins[0], self.pins[1], self.conductance);
    }

    fn current(&self, _x: &Solution<'_>) -> f64 {
        self.current
    }

    fn dynamic(&self) -> Option<&dyn Dynamic> {
        Some(self)
    }

    fn dynamic_mut(&mut self) -> Option<&mut dyn Dynamic> {
        Some(self)
    }
}

impl Dynamic for Capacitor {
    fn reset(&mut self) {
        self.source = 0.0;
        self.current = 0.0;
    }

    fn initiate(&mut self, dt: f64) {
        self.dt = dt;
        self.conductance = self.capacitance / dt;
    }

    fn pre_step(&mut self, x: &Solution<'_>, sources: &mut SourceStamper<'_>) {
        self.source = self.conductance * self.voltage(x);
        sources.current_source(self.pins[0], self.pins[1], self.source);
    }

    fn post_step(&mut self, x: &Solution<'_>) {
        self.current = self.conductance * self.voltage(x) - self.source;
    }
}

/// Linear inductor, integrated with backward Euler.
#[derive(Debug, Clone, PartialEq)]
pub struct Inductor {
    pins: [Node; 2],
    coil: Coil,
}

impl Inductor {
    #[must_use]
    pub const fn new(a: Node, b: Node, inductance: f64) -> Self {
        Self {
            pins: [a, b],
            coil: Coil::new(inductance),
        }
    }

    #[must_use]
    pub const fn inductance(&self) -> f64 {
        self.coil.inductance
    }

    pub fn set_inductance(&mut self, inductance: f64) {
        self.coil.set_inductance(inductance);
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [l]) = unpack("Inductor", pins, params)?;
        Ok(Self::new(a, b, l))
    }
}

impl Component for Inductor {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        require_positive("Inductor", "inductance", self.coil.inductance)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.coil.inductance, "H")]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.coil.inductance]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        self.coil.stamp(self.pins[0], self.pins[1], stamper);
    }

    fn current(&self, _x: &Solution<'_>) -> f64 {
        self.coil.current
    }

    fn dynamic(&self) -> Option<&dyn Dynamic> {
        Some(self)
    }

    fn dynamic_mut(&mut self) -> Option<&mut dyn Dynamic> {
        Some(self)
    }
}

impl Dynamic for Inductor {
    fn reset(&mut self) {
        self.coil.current = 0.0;
    }

    fn initiate(&mut self, dt: f64) {
        self.coil.initiate(dt);
    }

    fn pre_step(&mut self, _x: &Solution<'_>, sources: &mut SourceStamper<'_>) {
        self.coil.pre_step(self.pins[0], self.pins[1], sources);
    }

    fn post_step(&mut self, x: &Solution<'_>) {
        self.coil.post_step(x.between(self.pins[0], self.pins[1]));
    }
}

/// Backward Euler companion model of an inductance, shared with the relay coil.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Coil {
    pub(crate) inductance: f64,
    dt: f64,
    pub(crate) conductance: f64,
    pub(crate) current: f64,
}

impl Coil {
    pub(crate) const fn new(inductance: f64) -> Self {
        Self {
            inductance,
            dt: 0.0,
            conductance: 0.0,
            current: 0.0,
        }
    }

    pub(crate) fn set_inductance(&mut self, inductance: f64) {
        self.inductance = inductance;
        if self.dt > 0.0 {
            self.conductance = self.dt / inductance;
        }
    }

    pub(crate) fn initiate(&mut self, dt: f64) {
        self.dt = dt;
        self.conductance = dt / self.inductance;
    }

    pub(crate) fn stamp(&self, a: Node, b: Node, stamper: &mut Stamper<'_>) {
        stamper.conductance(a, b, self.conductance);
    }

    pub(crate) fn pre_step(&self, a: Node, b: Node, sources: &mut SourceStamper<'_>) {
        sources.current_source(b, a, self.current);
    }

    pub(crate) fn post_step(&mut self, voltage: f64) {
        self.current += self.conductance * voltage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mna::{NodeMap, System};

    #[test]
    fn test_resistor_current_follows_ohms_law() {
        let r = Resistor::new(Node::new(1), Node::GROUND, 4.0);
        let map = NodeMap::from_pins(r.pins());
        let x = [8.0];
        let solution = Solution::new(&x, &map);
        assert!((r.current(&solution) - 2.0).abs() < 1e-12);
        assert!((r.power(&solution) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_resistor_rejects_zero() {
        assert!(Resistor::new(Node::new(1), Node::GROUND, 0.0).validate().is_err());
        assert!(Resistor::new(Node::new(1), Node::GROUND, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut c = Capacitor::new(Node::new(1), Node::GROUND, 0.01);
        c.initiate(0.001);
        let map = NodeMap::from_pins(c.pins());

        let mut system = System::zeros(1);
        c.stamp(&mut Stamper::new(&mut system, &map));
        assert!((system.lhs[(0, 0)] - 10.0).abs() < 1e-12);

        let before = [2.0];
        c.pre_step(&Solution::new(&before, &map), &mut SourceStamper::new(&mut system.rhs, &map));
        assert!((system.rhs[0] - 20.0).abs() < 1e-12);

        let after = [2.5];
        c.post_step(&Solution::new(&after, &map));
        assert!((c.current(&Solution::new(&after, &map)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_inductor_accumulates_current() {
        let mut l = Inductor::new(Node::new(1), Node::GROUND, 0.5);
        l.initiate(0.1);
        let map = NodeMap::from_pins(l.pins());
        let x = [5.0];
        l.post_step(&Solution::new(&x, &map));
        l.post_step(&Solution::new(&x, &map));
        assert!((l.current(&Solution::new(&x, &map)) - 2.0).abs() < 1e-12);

        let mut rhs = vec![0.0];
        l.pre_step(&Solution::new(&x, &map), &mut SourceStamper::new(&mut rhs, &map));
        assert!((rhs[0] + 2.0).abs() < 1e-12);

        l.reset();
        assert!(l.current(&Solution::new(&x, &map)).abs() < f64::EPSILON);
    }
}
