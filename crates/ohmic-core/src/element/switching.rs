use crate::element::passive::Coil;
use crate::element::{require_positive, unpack, Component, Dynamic};
use crate::error::{Error, Result};
use crate::ids::Node;
use crate::mna::{Solution, SourceStamper, Stamper};
use crate::units::Property;

pub const SWITCH_CLOSED_RESISTANCE: f64 = 1e-3;
pub const SWITCH_OPEN_RESISTANCE: f64 = 1e6;

/// Coil inductance of a 12 V relay that pulls in at 100 mA within 10 ms.
pub const RELAY_COIL_INDUCTANCE: f64 = 12.0 * 0.01 / 0.1;
pub const RELAY_OPERATING_CURRENT: f64 = 0.1;
pub const RELAY_CLOSED_RESISTANCE: f64 = 1e-6;
pub const RELAY_OPEN_RESISTANCE: f64 = 1e6;

fn check_contact(element: &'static str, closed: f64, open: f64) -> Result<()> {
    require_positive(element, "closed resistance", closed)?;
    require_positive(element, "open resistance", open)?;
    if closed < open {
        Ok(())
    } else {
        Err(Error::invalid(
            element,
            format!("closed resistance {closed} must be below open resistance {open}"),
        ))
    }
}

/// Two-state resistor. Changing the state forces the circuit to restamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pins: [Node; 2],
    open: bool,
    stamped_open: bool,
    dirty: bool,
    closed_resistance: f64,
    open_resistance: f64,
}

impl Switch {
    #[must_use]
    pub const fn new(a: Node, b: Node, open: bool) -> Self {
        Self {
            pins: [a, b],
            open,
            stamped_open: open,
            dirty: false,
            closed_resistance: SWITCH_CLOSED_RESISTANCE,
            open_resistance: SWITCH_OPEN_RESISTANCE,
        }
    }

    #[must_use]
    pub const fn with_resistances(mut self, closed: f64, open: f64) -> Self {
        self.closed_resistance = closed;
        self.open_resistance = open;
        self
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        if open != self.open {
            self.open = open;
            self.dirty = true;
        }
    }

    pub fn toggle(&mut self) {
        self.set_open(!self.open);
    }

    const fn resistance_for(&self, open: bool) -> f64 {
        if open {
            self.open_resistance
        } else {
            self.closed_resistance
        }
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [open, closed_r, open_r]) = unpack("Switch", pins, params)?;
        Ok(Self::new(a, b, open > 0.5).with_resistances(closed_r, open_r))
    }
}

impl Component for Switch {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        check_contact("Switch", self.closed_resistance, self.open_resistance)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.resistance_for(self.open), "Ω")]
    }

    fn params(&self) -> Vec<f64> {
        vec![
            f64::from(u8::from(self.open)),
            self.closed_resistance,
            self.open_resistance,
        ]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.resistance(self.pins[0], self.pins[1], self.resistance_for(self.open));
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        self.voltage(x) / self.resistance_for(self.stamped_open)
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
        self.stamped_open = self.open;
    }
}

/// Electromechanical relay.
///
/// Pins A and B are the contact, C and D the coil. The contact closes while
/// the coil carries at least the operating current, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Relay {
    pins: [Node; 4],
    coil: Coil,
    operating_current: f64,
    closed_resistance: f64,
    open_resistance: f64,
    open: bool,
    stamped_open: bool,
    dirty: bool,
}

impl Relay {
    #[must_use]
    pub const fn new(a: Node, b: Node, c: Node, d: Node) -> Self {
        Self {
            pins: [a, b, c, d],
            coil: Coil::new(RELAY_COIL_INDUCTANCE),
            operating_current: RELAY_OPERATING_CURRENT,
            closed_resistance: RELAY_CLOSED_RESISTANCE,
            open_resistance: RELAY_OPEN_RESISTANCE,
            open: true,
            stamped_open: true,
            dirty: false,
        }
    }

    #[must_use]
    pub const fn with_coil_inductance(mut self, inductance: f64) -> Self {
        self.coil.inductance = inductance;
        self
    }

    #[must_use]
    pub const fn with_operating_current(mut self, current: f64) -> Self {
        self.operating_current = current;
        self
    }

    #[must_use]
    pub const fn with_resistances(mut self, closed: f64, open: f64) -> Self {
        self.closed_resistance = closed;
        self.open_resistance = open;
        self
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub const fn coil_current(&self) -> f64 {
        self.coil.current
    }

    const fn resistance_for(&self, open: bool) -> f64 {
        if open {
            self.open_resistance
        } else {
            self.closed_resistance
        }
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b, c, d], [inductance, operating, closed_r, open_r]) =
            unpack("Relay", pins, params)?;
        Ok(Self::new(a, b, c, d)
            .with_coil_inductance(inductance)
            .with_operating_current(operating)
            .with_resistances(closed_r, open_r))
    }
}

impl Component for Relay {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        require_positive("Relay", "coil inductance", self.coil.inductance)?;
        require_positive("Relay", "operating current", self.operating_current)?;
        check_contact("Relay", self.closed_resistance, self.open_resistance)
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new(self.coil.inductance, "H"),
            Property::new(self.operating_current, "A"),
        ]
    }

    fn params(&self) -> Vec<f64> {
        vec![
            self.coil.inductance,
            self.operating_current,
            self.closed_resistance,
            self.open_resistance,
        ]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        let [a, b, c, d] = self.pins;
        stamper.resistance(a, b, self.resistance_for(self.open));
        self.coil.stamp(c, d, stamper);
    }

    /// Contact current.
    fn current(&self, x: &Solution<'_>) -> f64 {
        self.voltage(x) / self.resistance_for(self.stamped_open)
    }

    fn dynamic(&self) -> Option<&dyn Dynamic> {
        Some(self)
    }

    fn dynamic_mut(&mut self) -> Option<&mut dyn Dynamic> {
        Some(self)
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
        self.stamped_open = self.open;
    }
}

impl Dynamic for Relay {
    fn reset(&mut self) {
        self.coil.current = 0.0;
        self.open = true;
    }

    fn initiate(&mut self, dt: f64) {
        self.coil.initiate(dt);
    }

    fn pre_step(&mut self, _x: &Solution<'_>, sources: &mut SourceStamper<'_>) {
        self.coil.pre_step(self.pins[2], self.pins[3], sources);
    }

    fn post_step(&mut self, x: &Solution<'_>) {
        self.coil.post_step(x.between(self.pins[2], self.pins[3]));
        let open = self.coil.current.abs() < self.operating_current;
        if open != self.open {
            self.open = open;
            self.dirty = true;
        }
    }
}
