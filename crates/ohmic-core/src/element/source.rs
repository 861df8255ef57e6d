use std::f64::consts::TAU;

use crate::element::{require_finite, require_positive, unpack, Component, Dynamic};
use crate::error::{Error, Result};
use crate::ids::Node;
use crate::mna::{Solution, SourceStamper, Stamper};
use crate::units::Property;

/// Time steps per quarter period needed to follow a periodic source.
const CYCLE_RESOLUTION: f64 = 2.0;

fn periodic_min_tick_rate(frequency: f64) -> f64 {
    1.0 / (frequency * 4.0 * CYCLE_RESOLUTION)
}

/// Ideal DC voltage source, `V(A) - V(B) = voltage`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageSource {
    pins: [Node; 2],
    voltage: f64,
    row: usize,
}

impl VoltageSource {
    #[must_use]
    pub const fn new(a: Node, b: Node, voltage: f64) -> Self {
        Self {
            pins: [a, b],
            voltage,
            row: usize::MAX,
        }
    }

    #[must_use]
    pub const fn source_voltage(&self) -> f64 {
        self.voltage
    }

    pub fn set_source_voltage(&mut self, voltage: f64) {
        self.voltage = voltage;
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [v]) = unpack("VoltageSource", pins, params)?;
        Ok(Self::new(a, b, v))
    }
}

impl Component for VoltageSource {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn extra_rows(&self) -> usize {
        1
    }

    fn assign_rows(&mut self, first: usize) {
        self.row = first;
    }

    fn validate(&self) -> Result<()> {
        require_finite("VoltageSource", "voltage", self.voltage)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.voltage, "V")]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.voltage]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.voltage_source(self.pins[0], self.pins[1], self.row, self.voltage);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.row)
    }
}

/// Ideal current source that pushes `current` out of pin A.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSource {
    pins: [Node; 2],
    current: f64,
}

impl CurrentSource {
    #[must_use]
    pub const fn new(a: Node, b: Node, current: f64) -> Self {
        Self {
            pins: [a, b],
            current,
        }
    }

    #[must_use]
    pub const fn source_current(&self) -> f64 {
        self.current
    }

    pub fn set_source_current(&mut self, current: f64) {
        self.current = current;
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [i]) = unpack("CurrentSource", pins, params)?;
        Ok(Self::new(a, b, i))
    }
}

impl Component for CurrentSource {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn validate(&self) -> Result<()> {
        require_finite("CurrentSource", "current", self.current)
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new(self.current, "A")]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.current]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.current_source(self.pins[0], self.pins[1], self.current);
    }

    fn current(&self, _x: &Solution<'_>) -> f64 {
        -self.current
    }
}

/// Sinusoidal voltage source, `amplitude * sin(2π f t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AcVoltageSource {
    pins: [Node; 2],
    amplitude: f64,
    frequency: f64,
    row: usize,
    omega_tick: f64,
    theta: f64,
    output: f64,
}

impl AcVoltageSource {
    #[must_use]
    pub const fn new(a: Node, b: Node, amplitude: f64, frequency: f64) -> Self {
        Self {
            pins: [a, b],
            amplitude,
            frequency,
            row: usize::MAX,
            omega_tick: 0.0,
            theta: 0.0,
            output: 0.0,
        }
    }

    #[must_use]
    pub const fn amplitude(&self) -> f64 {
        self.amplitude
    }

    #[must_use]
    pub const fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Change the frequency, keeping the current phase.
    pub fn set_frequency(&mut self, frequency: f64) {
        if self.frequency > 0.0 {
            self.omega_tick *= frequency / self.frequency;
        }
        self.frequency = frequency;
    }

    /// Voltage stamped for the most recent step.
    #[must_use]
    pub const fn output(&self) -> f64 {
        self.output
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [amplitude, frequency]) = unpack("ACVoltageSource", pins, params)?;
        Ok(Self::new(a, b, amplitude, frequency))
    }
}

impl Component for AcVoltageSource {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn extra_rows(&self) -> usize {
        1
    }

    fn assign_rows(&mut self, first: usize) {
        self.row = first;
    }

    fn validate(&self) -> Result<()> {
        require_finite("ACVoltageSource", "amplitude", self.amplitude)?;
        require_positive("ACVoltageSource", "frequency", self.frequency)
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new(self.amplitude, "V"),
            Property::new(self.frequency, "Hz"),
        ]
    }

    fn params(&self) -> Vec<f64> {
        vec![self.amplitude, self.frequency]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.voltage_source(self.pins[0], self.pins[1], self.row, 0.0);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.row)
    }

    fn dynamic(&self) -> Option<&dyn Dynamic> {
        Some(self)
    }

    fn dynamic_mut(&mut self) -> Option<&mut dyn Dynamic> {
        Some(self)
    }
}

impl Dynamic for AcVoltageSource {
    fn reset(&mut self) {
        self.output = 0.0;
    }

    fn initiate(&mut self, dt: f64) {
        self.omega_tick = TAU * self.frequency * dt;
        self.theta = self.omega_tick;
    }

    fn pre_step(&mut self, _x: &Solution<'_>, sources: &mut SourceStamper<'_>) {
        self.output = self.amplitude * self.theta.sin();
        sources.row(self.row, self.output);
    }

    fn post_step(&mut self, _x: &Solution<'_>) {
        self.theta += self.omega_tick;
    }

    fn min_tick_rate(&self) -> f64 {
        periodic_min_tick_rate(self.frequency)
    }
}

/// Square wave voltage source.
///
/// The output is `offset + amplitude` for the first `duty` fraction of each
/// period and `offset - amplitude` for the rest. `phase` shifts the wave in
/// radians.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareVoltageSource {
    pins: [Node; 2],
    amplitude: f64,
    frequency: f64,
    duty: f64,
    phase: f64,
    offset: f64,
    row: usize,
    dt: f64,
    time: f64,
    output: f64,
}

impl SquareVoltageSource {
    /// A symmetric wave: duty 0.5, no phase shift, no offset.
    #[must_use]
    pub const fn new(a: Node, b: Node, amplitude: f64, frequency: f64) -> Self {
        Self {
            pins: [a, b],
            amplitude,
            frequency,
            duty: 0.5,
            phase: 0.0,
            offset: 0.0,
            row: usize::MAX,
            dt: 0.0,
            time: 0.0,
            output: 0.0,
        }
    }

    #[must_use]
    pub const fn with_duty(mut self, duty: f64) -> Self {
        self.duty = duty;
        self
    }

    #[must_use]
    pub const fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn duty(&self) -> f64 {
        self.duty
    }

    #[must_use]
    pub const fn output(&self) -> f64 {
        self.output
    }

    /// Source voltage at time `t`.
    #[must_use]
    pub fn level_at(&self, t: f64) -> f64 {
        let period = 1.0 / self.frequency;
        let shifted = (t + period * self.phase / TAU).rem_euclid(period);
        if shifted < self.duty * period {
            self.offset + self.amplitude
        } else {
            self.offset - self.amplitude
        }
    }

    pub(crate) fn from_params(pins: &[Node], params: &[f64]) -> Result<Self> {
        let ([a, b], [amplitude, frequency, duty, phase, offset]) =
            unpack("SquareVoltageSource", pins, params)?;
        Ok(Self::new(a, b, amplitude, frequency)
            .with_duty(duty)
            .with_phase(phase)
            .with_offset(offset))
    }
}

impl Component for SquareVoltageSource {
    fn pins(&self) -> &[Node] {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut [Node] {
        &mut self.pins
    }

    fn extra_rows(&self) -> usize {
        1
    }

    fn assign_rows(&mut self, first: usize) {
        self.row = first;
    }

    fn validate(&self) -> Result<()> {
        const NAME: &str = "SquareVoltageSource";
        require_finite(NAME, "amplitude", self.amplitude)?;
        require_positive(NAME, "frequency", self.frequency)?;
        require_finite(NAME, "phase", self.phase)?;
        require_finite(NAME, "offset", self.offset)?;
        if self.duty > 0.0 && self.duty < 1.0 {
            Ok(())
        } else {
            Err(Error::invalid(
                NAME,
                format!("duty cycle must be in (0, 1), got {}", self.duty),
            ))
        }
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new(self.amplitude, "V"),
            Property::new(self.frequency, "Hz"),
            Property::new(self.duty * 100.0, "%"),
        ]
    }

    fn params(&self) -> Vec<f64> {
        vec![
            self.amplitude,
            self.frequency,
            self.duty,
            self.phase,
            self.offset,
        ]
    }

    fn stamp(&self, stamper: &mut Stamper<'_>) {
        stamper.voltage_source(self.pins[0], self.pins[1], self.row, 0.0);
    }

    fn current(&self, x: &Solution<'_>) -> f64 {
        x.row(self.row)
    }

    fn dynamic(&self) -> Option<&dyn Dynamic> {
        Some(self)
    }

    fn dynamic_mut(&mut self) -> Option<&mut dyn Dynamic> {
        Some(self)
    }
}

impl Dynamic for SquareVoltageSource {
    fn reset(&mut self) {
        self.output = 0.0;
    }

    fn initiate(&mut self, dt: f64) {
        self.dt = dt;
        self.time = dt;
    }

    fn pre_step(&mut self, _x: &Solution<'_>, sources: &mut SourceStamper<'_>) {
        self.output = self.level_at(self.time);
        sources.row(self.row, self.output);
    }

    fn post_step(&mut self, _x: &Solution<'_>) {
        self.time += self.dt;
    }

    fn min_tick_rate(&self) -> f64 {
        periodic_min_tick_rate(self.frequency)
    }
}
