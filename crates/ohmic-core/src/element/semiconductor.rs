use serde::{Deserialize, Serialize};

use crate::element::{require_positive, unpack, Component, NonLinear};
use crate::error::{Error, Result};
use crate::ids::Node;
use crate::mna::{Solution, SourceStamper, Stamper};
use crate::units::Property;

/// Thermal voltage at 300 K.
pub const THERMAL_VOLTAGE: f64 = 0.025_852;
const DEFAULT_SATURATION: f64 = 1e-6;
/// Exponent above which junction exponentials are continued linearly.
const EXP_LIMIT: f64 = 80.0;

/// `e^x` and its derivative, linearised above [`EXP_LIMIT`].
fn junction_exp(x: f64) -> (f64, f64) {
    if x > EXP_LIMIT {
        let e = EXP_LIMIT.exp();
        (e * (1.0 + x - EXP_LIMIT), e)
    } else {
        let e = x.exp();
        (e, e)
    }
}

/// Shockley diode, forward direction from A to B.
#[derive(Debug, Clone, PartialEq)]
pub struct Diode {
    pins: [Node; 2],
    saturation: f64,
    emission: f64,
    thermal_voltage: f64,
}

impl Diode {
    #[must_use]
    pub const fn new(a: Node, b: Node) -> Self {
        Self {
            pins: [a, b],
            saturation: DEFAULT_SATURATION,
            emission: 1.0,
            thermal_voltage: THERMAL_VOLTAGE,
        }
    }

    /// A diode whose I-V curve passes through `(forward_voltage, on_current)`.
    #[must_use]
    pub fn from_forward_voltage(
        a: Node,
        b: Node,
        forward_voltage: f64,
        on_current: f64,
        saturation: f64,
    ) -> Self {
        let emission = forward_voltage / (THERMAL_VOLTAGE * (on_current / saturation + 1.0).ln());
        Self::new(a, b)
            .with_saturation(saturation)
            .with_emission(emission)
    }

    #[must_use]
    pub const fn with_saturation(mut self, saturation: f64) -> Self {
        self.saturation = saturation;
        self
    }

    #[must_use]
    pub const fn with_emission(mut self, emission: f64) -> Self {
        self.emission = emission;
        self
    }

    #[must_use]
    pub const fn with_thermal_voltage(mut self, thermal_voltage: f64) -> Self {
        self.thermal_voltage = thermal_voltage;
        self
    }

    #[must_use]
    pub const fn saturation(&self) -> f64 {
        self.saturation
    }

    #[must_use]
    pub const fn emission(&self) -> f64 {
        self.emission
    }

    fn denominator(&self) -> f64 {
        self.emission * self.thermal_voltage
    }

    /// Diode current at junction voltage `v`.
    #[must_use]
    pub fn current_at(&self, v: f64) -> f64 {
        self.saturation * (junction_exp(v / self.denominator()).0 - 1.0)
    }

    /// Small-signal conductance at junction voltage `v`.
    #[must_use]
    pub fn conductance_at(&self, v: f64) -> f64 {
        self.saturation / self.denominator() * junction_exp(v / self.denominator()).1
    }

    /// Voltage at which the diode conducts 1 mA.
    #[must_use]
    pub fn threshold_voltage(&self) -> f64 {
        self.denominator() * (1e-3 / self.saturation + 1.0).ln()
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [saturation, emission, thermal_voltage]) = unpack("Diode", pins, params)?;
        Ok(Self::new(a, b)
            .with_saturation(saturation)
            .with_emission(emission)
            .with_thermal_voltage(thermal_voltage))
    }
}

impl Component for Diode {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        require_positive("Diode", "saturation current", self.saturation)?;
        require_positive("Diode", "emission coefficient", self.emission)?;
        require_positive("Diode", "thermal voltage", self.thermal_voltage)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.threshold_voltage(), "V")]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.saturation, self.emission, self.thermal_voltage]
    }

    fn stamp(&self, _stamper: &mut Stamper<'_>) {}

    fn current(&self, x: &Solution<'_>) -> f64 {
        self.current_at(self.voltage(x))
    }

    fn nonlinear(&self) -> Option<&dyn NonLinear> {
        Some(self)
    }
}

impl NonLinear for Diode {
    fn residual(&self, x: &Solution<'_>, residual: &mut SourceStamper<'_>) {
        let [a, b] = self.pins;
        residual.current_source(a, b, self.current_at(x.between(a, b)));
    }

    fn jacobian(&self, x: &Solution<'_>, stamper: &mut Stamper<'_>, min_conductance: f64) {
        let [a, b] = self.pins;
        let g = self.conductance_at(x.between(a, b)).max(min_conductance);
        stamper.conductance(a, b, g);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BjtPolarity {
    Npn,
    Pnp,
}

impl BjtPolarity {
    const fn sign(self) -> f64 {
        match self {
            Self::Npn => 1.0,
            Self::Pnp => -1.0,
        }
    }
}

/// Junction currents and conductances at one operating point.
#[derive(Debug, Clone, Copy)]
struct OperatingPoint {
    collector: f64,
    base: f64,
    emitter: f64,
    g_forward: f64,
    g_reverse: f64,
}

/// Bipolar junction transistor, Ebers-Moll transport model.
///
/// Pins are collector (A), base (B) and emitter (C). The reverse alpha is
/// one twentieth of the forward alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct Bjt {
    pins: [Node; 3],
    polarity: BjtPolarity,
    alpha_forward: f64,
    alpha_reverse: f64,
    saturation: f64,
    thermal_voltage: f64,
}

impl Bjt {
    #[must_use]
    pub const fn new(polarity: BjtPolarity, collector: Node, base: Node, emitter: Node) -> Self {
        Self {
            pins: [collector, base, emitter],
            polarity,
            alpha_forward: 0.8,
            alpha_reverse: 0.04,
            saturation: DEFAULT_SATURATION,
            thermal_voltage: THERMAL_VOLTAGE,
        }
    }

    #[must_use]
    pub const fn npn(collector: Node, base: Node, emitter: Node) -> Self {
        Self::new(BjtPolarity::Npn, collector, base, emitter)
    }

    #[must_use]
    pub const fn pnp(collector: Node, base: Node, emitter: Node) -> Self {
        Self::new(BjtPolarity::Pnp, collector, base, emitter)
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha_forward: f64) -> Self {
        self.alpha_forward = alpha_forward;
        self.alpha_reverse = alpha_forward / 20.0;
        self
    }

    /// Set the forward current gain, `beta = alpha / (1 - alpha)`.
    #[must_use]
    pub fn with_beta(self, beta: f64) -> Self {
        self.with_alpha(beta / (beta + 1.0))
    }

    #[must_use]
    pub const fn with_saturation(mut self, saturation: f64) -> Self {
        self.saturation = saturation;
        self
    }

    #[must_use]
    pub const fn with_thermal_voltage(mut self, thermal_voltage: f64) -> Self {
        self.thermal_voltage = thermal_voltage;
        self
    }

    #[must_use]
    pub const fn polarity(&self) -> BjtPolarity {
        self.polarity
    }

    #[must_use]
    pub fn beta(&self) -> f64 {
        self.alpha_forward / (1.0 - self.alpha_forward)
    }

    #[must_use]
    pub fn collector_current(&self, x: &Solution<'_>) -> f64 {
        self.operating_point(x).collector
    }

    #[must_use]
    pub fn base_current(&self, x: &Solution<'_>) -> f64 {
        self.operating_point(x).base
    }

    /// Current leaving the emitter terminal.
    #[must_use]
    pub fn emitter_current(&self, x: &Solution<'_>) -> f64 {
        self.operating_point(x).emitter
    }

    fn operating_point(&self, x: &Solution<'_>) -> OperatingPoint {
        let [c, b, e] = self.pins;
        let s = self.polarity.sign();
        let vt = self.thermal_voltage;
        let (ef, def) = junction_exp(s * x.between(b, e) / vt);
        let (er, der) = junction_exp(s * x.between(b, c) / vt);

        let i_forward = self.saturation * (ef - 1.0);
        let i_reverse = self.saturation * (er - 1.0);
        let collector = s * (self.alpha_forward * i_forward - i_reverse);
        let emitter = s * (i_forward - self.alpha_reverse * i_reverse);

        OperatingPoint {
            collector,
            base: emitter - collector,
            emitter,
            g_forward: self.saturation / vt * def,
            g_reverse: self.saturation / vt * der,
        }
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([c, b, e], [sign, alpha, saturation, thermal_voltage]) =
            unpack("BJT", pins, params)?;
        let polarity = if sign < 0.0 {
            BjtPolarity::Pnp
        } else {
            BjtPolarity::Npn
        };
        Ok(Self::new(polarity, c, b, e)
            .with_alpha(alpha)
            .with_saturation(saturation)
            .with_thermal_voltage(thermal_voltage))
    }
}

impl Component for Bjt {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        if !(self.alpha_forward > 0.0 && self.alpha_forward < 1.0) {
            return Err(Error::invalid(
                "BJT",
                format!("forward alpha must be in (0, 1), got {}", self.alpha_forward),
            ));
        }
        require_positive("BJT", "saturation current", self.saturation)?;
        require_positive("BJT", "thermal voltage", self.thermal_voltage)
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new(self.beta(), "β"),
            Property::new(self.saturation, "A"),
        ]
    }

    fn params(&self) -> Vec<f64> {
        vec![
            self.polarity.sign(),
            self.alpha_forward,
            self.saturation,
            self.thermal_voltage,
        ]
    }

    fn stamp(&self, _stamper: &mut Stamper<'_>) {}

    /// Collector current.
    fn current(&self, x: &Solution<'_>) -> f64 {
        self.collector_current(x)
    }

    /// Base-emitter voltage.
    fn voltage(&self, x: &Solution<'_>) -> f64 {
        x.between(self.pins[1], self.pins[2])
    }

    fn power(&self, x: &Solution<'_>) -> f64 {
        let [c, b, e] = self.pins;
        let op = self.operating_point(x);
        x.between(c, e) * op.collector + x.between(b, e) * op.base
    }

    fn nonlinear(&self) -> Option<&dyn NonLinear> {
        Some(self)
    }
}

impl NonLinear for Bjt {
    fn residual(&self, x: &Solution<'_>, residual: &mut SourceStamper<'_>) {
        let [c, b, e] = self.pins;
        let op = self.operating_point(x);
        residual.inject(c, op.collector);
        residual.inject(b, op.base);
        residual.inject(e, -op.emitter);
    }

    fn jacobian(&self, x: &Solution<'_>, stamper: &mut Stamper<'_>, min_conductance: f64) {
        let [c, b, e] = self.pins;
        let op = self.operating_point(x);
        let gf = op.g_forward.max(min_conductance);
        let gr = op.g_reverse.max(min_conductance);
        let (af, ar) = (self.alpha_forward, self.alpha_reverse);

        // Columns are d/dV(base), d/dV(emitter), d/dV(collector).
        let rows = [
            (c, [af * gf - gr, -af * gf, gr]),
            (
                b,
                [
                    (1.0 - af) * gf + (1.0 - ar) * gr,
                    -(1.0 - af) * gf,
                    -(1.0 - ar) * gr,
                ],
            ),
            (e, [-gf + ar * gr, gf, -ar * gr]),
        ];
        for (row, [db, de, dc]) in rows {
            stamper.lhs_nodes(row, b, db);
            stamper.lhs_nodes(row, e, de);
            stamper.lhs_nodes(row, c, dc);
        }
    }
}
