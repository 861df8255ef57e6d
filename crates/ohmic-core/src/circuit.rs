//! Circuit assembly, compilation and transient stepping.
//!
//! A [`Circuit`] owns its elements. Compiling it assigns MNA rows, stamps
//! the time-invariant part of every element once and, for linear circuits,
//! caches the LU factors. Each [`Circuit::tick`] then only adds the per-step
//! sources of dynamic elements before solving.

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use crate::element::{Element, NonLinear, Variant};
use crate::error::{Error, Result};
use crate::ids::{ElementId, Node};
use crate::lu::LuDecomposition;
use crate::matrix::Matrix;
use crate::meter::Meter;
use crate::mna::{NodeMap, Solution, SourceStamper, Stamper, System};
use crate::newton;
use crate::topology::{Topology, TopologyReport};
use crate::units::format_properties;

pub use crate::newton::SolverOptions;

pub const DEFAULT_TICK_RATE: f64 = 0.05;

/// Step used to settle initial conditions during [`Circuit::prepare`].
const INITIAL_CONDITION_STEP: f64 = 1e-10;

/// Voltage, current and power of one element at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub time: f64,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

impl Reading {
    const fn unsolved(time: f64) -> Self {
        Self {
            time,
            voltage: f64::NAN,
            current: f64::NAN,
            power: f64::NAN,
        }
    }
}

/// Copy of the compiled MNA system and the latest solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub lhs: Matrix,
    /// Right-hand side of the most recent step, sources included.
    pub rhs: Vec<f64>,
    pub x: Vec<f64>,
    pub nodes: Vec<Node>,
}

type Callback = Box<dyn FnMut(&mut Element, &Reading)>;

struct Watcher {
    element: ElementId,
    callback: Callback,
}

#[derive(Debug)]
struct Compiled {
    /// Every element's pins at compile time, in element order.
    pins: Vec<Node>,
    nodes: NodeMap,
    system: System,
    step_rhs: Vec<f64>,
    lu: Option<LuDecomposition>,
}

pub struct Circuit {
    elements: Vec<Element>,
    names: Vec<Option<String>>,
    next_node: u32,
    tick_rate: f64,
    options: SolverOptions,
    watchers: Vec<Watcher>,
    compiled: Option<Compiled>,
    restamp: bool,
    time: f64,
    x: Vec<f64>,
}

impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circuit")
            .field("elements", &self.elements)
            .field("names", &self.names)
            .field("tick_rate", &self.tick_rate)
            .field("options", &self.options)
            .field("watchers", &self.watchers.len())
            .field("compiled", &self.compiled.is_some())
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(SolverOptions::default())
    }

    #[must_use]
    pub const fn with_options(options: SolverOptions) -> Self {
        Self {
            elements: Vec::new(),
            names: Vec::new(),
            next_node: 1,
            tick_rate: DEFAULT_TICK_RATE,
            options,
            watchers: Vec::new(),
            compiled: None,
            restamp: false,
            time: 0.0,
            x: Vec::new(),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SolverOptions) {
        self.options = options;
        self.compiled = None;
    }

    /// A node not used by any element yet.
    pub fn node(&mut self) -> Node {
        let node = Node::new(self.next_node);
        self.next_node += 1;
        node
    }

    pub fn add(&mut self, element: impl Into<Element>) -> ElementId {
        self.insert(None, element.into())
    }

    pub fn add_named(&mut self, name: impl Into<String>, element: impl Into<Element>) -> ElementId {
        self.insert(Some(name.into()), element.into())
    }

    fn insert(&mut self, name: Option<String>, element: Element) -> ElementId {
        self.reserve_nodes(element.pins());
        let id = ElementId::new(self.elements.len());
        debug!("added {} {id} on {:?}", element.name(), element.pins());
        self.elements.push(element);
        self.names.push(name);
        self.compiled = None;
        id
    }

    fn reserve_nodes(&mut self, pins: &[Node]) {
        if let Some(max) = pins.iter().map(|n| n.id()).max() {
            self.next_node = self.next_node.max(max.saturating_add(1));
        }
    }

    /// Move pin `pin` (0 = A) of an element to `node`.
    pub fn connect(&mut self, id: ElementId, pin: usize, node: Node) -> Result<()> {
        let element = self
            .elements
            .get_mut(id.index())
            .ok_or(Error::UnknownElement(id))?;
        let name = element.name();
        let slot = element
            .component_mut()
            .pins_mut()
            .get_mut(pin)
            .ok_or_else(|| Error::invalid(name, format!("no pin {pin}")))?;
        *slot = node;
        self.reserve_nodes(&[node]);
        self.compiled = None;
        Ok(())
    }

    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements
            .get(id.index())
            .ok_or(Error::UnknownElement(id))
    }

    /// Mutable access; the static system is rebuilt before the next step.
    /// Moving a pin through this handle recompiles the circuit on the next
    /// tick, like [`Circuit::connect`].
    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        let element = self
            .elements
            .get_mut(id.index())
            .ok_or(Error::UnknownElement(id))?;
        self.restamp = true;
        Ok(element)
    }

    pub fn element_as<T: Variant>(&self, id: ElementId) -> Result<&T> {
        let element = self.element(id)?;
        T::from_element(element).ok_or_else(|| Error::ElementKindMismatch {
            id,
            expected: T::KIND.name(),
            found: element.name(),
        })
    }

    pub fn element_as_mut<T: Variant>(&mut self, id: ElementId) -> Result<&mut T> {
        let element = self.element_mut(id)?;
        let found = element.name();
        T::from_element_mut(element).ok_or(Error::ElementKindMismatch {
            id,
            expected: T::KIND.name(),
            found,
        })
    }

    #[must_use]
    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.names.get(id.index())?.as_deref()
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .map(ElementId::new)
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(ElementId::new)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub const fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    /// Largest tick rate every dynamic element can follow.
    #[must_use]
    pub fn max_tick_rate(&self) -> f64 {
        self.elements
            .iter()
            .filter_map(|e| e.component().dynamic())
            .map(|d| d.min_tick_rate())
            .fold(f64::MAX, f64::min)
    }

    /// Tick rate the next compile will run at.
    #[must_use]
    pub fn effective_tick_rate(&self) -> f64 {
        self.tick_rate.min(self.max_tick_rate())
    }

    pub fn set_tick_rate(&mut self, dt: f64) -> Result<()> {
        let maximum = self.max_tick_rate();
        if !(dt.is_finite() && dt > 0.0 && dt <= maximum) {
            return Err(Error::InvalidTickRate {
                requested: dt,
                maximum,
            });
        }
        self.tick_rate = dt;
        self.compiled = None;
        Ok(())
    }

    /// Like [`Circuit::set_tick_rate`], but a step coarser than
    /// [`Circuit::max_tick_rate`] is lowered to it instead of rejected.
    pub fn set_tick_rate_clamped(&mut self, dt: f64) -> Result<()> {
        let maximum = self.max_tick_rate();
        if dt > maximum {
            warn!("tick rate {dt}s is too coarse for this circuit, using {maximum}s");
            return self.set_tick_rate(maximum);
        }
        self.set_tick_rate(dt)
    }

    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub const fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compile the circuit and settle its initial conditions. Time restarts at 0.
    pub fn prepare(&mut self) -> Result<()> {
        let result = self.compile();
        if result.is_err() {
            self.compiled = None;
        }
        result
    }

    fn compile(&mut self) -> Result<()> {
        self.compiled = None;
        Topology::build(&self.elements).check()?;
        for element in &self.elements {
            element.component().validate()?;
        }

        let nodes = NodeMap::from_pins(self.elements.iter().flat_map(Element::pins));
        let mut size = nodes.len();
        for element in &mut self.elements {
            let component = element.component_mut();
            let rows = component.extra_rows();
            if rows > 0 {
                component.assign_rows(size);
                size += rows;
            }
        }

        let maximum = self.max_tick_rate();
        if self.tick_rate > maximum {
            warn!(
                "tick rate {}s is too coarse for this circuit, using {maximum}s",
                self.tick_rate
            );
            self.tick_rate = maximum;
        }

        for element in &mut self.elements {
            if let Some(dynamic) = element.component_mut().dynamic_mut() {
                dynamic.reset();
                dynamic.initiate(INITIAL_CONDITION_STEP);
            }
        }

        self.time = 0.0;
        self.x = vec![0.0; size];
        self.compiled = Some(Compiled {
            pins: self.elements.iter().flat_map(Element::pins).copied().collect(),
            nodes,
            system: System::zeros(size),
            step_rhs: vec![0.0; size],
            lu: None,
        });
        self.restamp = true;
        self.step()?;

        for element in &mut self.elements {
            if let Some(dynamic) = element.component_mut().dynamic_mut() {
                dynamic.initiate(self.tick_rate);
            }
        }
        self.restamp = true;
        self.rebuild()?;

        info!(
            "compiled {} elements: {} nodes, {} unknowns, {} solver, tick rate {}s",
            self.elements.len(),
            self.compiled.as_ref().map_or(0, |c| c.nodes.len()),
            size,
            if self.is_nonlinear() { "newton" } else { "lu" },
            self.tick_rate
        );
        Ok(())
    }

    fn is_nonlinear(&self) -> bool {
        self.elements
            .iter()
            .any(|e| e.component().nonlinear().is_some())
    }

    /// Restamp the static system if an element changed since the last build.
    fn rebuild(&mut self) -> Result<()> {
        let dirty = self.elements.iter().any(|e| e.component().is_dirty());
        if !(self.restamp || dirty) {
            return Ok(());
        }
        let nonlinear = self.is_nonlinear();
        let Some(compiled) = self.compiled.as_mut() else {
            return Ok(());
        };

        let mut system = System::zeros(compiled.system.size());
        {
            let mut stamper = Stamper::new(&mut system, &compiled.nodes);
            for element in &mut self.elements {
                element.component_mut().clear_dirty();
                element.component().stamp(&mut stamper);
            }
        }
        compiled.lu = if nonlinear {
            None
        } else {
            Some(LuDecomposition::decompose_parallel(
                system.lhs.clone(),
                self.options.threads,
            )?)
        };
        debug!("stamped static system of size {}", system.size());
        compiled.system = system;
        self.restamp = false;
        Ok(())
    }

    /// Solve one step without advancing time.
    fn step(&mut self) -> Result<()> {
        self.rebuild()?;
        let Some(compiled) = self.compiled.as_mut() else {
            return Ok(());
        };

        let mut rhs = compiled.system.rhs.clone();
        {
            let solution = Solution::new(&self.x, &compiled.nodes);
            let mut sources = SourceStamper::new(&mut rhs, &compiled.nodes);
            for element in &mut self.elements {
                if let Some(dynamic) = element.component_mut().dynamic_mut() {
                    dynamic.pre_step(&solution, &mut sources);
                }
            }
        }

        self.x = match &compiled.lu {
            Some(lu) => lu.solve(&rhs),
            None => {
                let devices: Vec<&dyn NonLinear> = self
                    .elements
                    .iter()
                    .filter_map(|e| e.component().nonlinear())
                    .collect();
                newton::solve(
                    &compiled.system.lhs,
                    &rhs,
                    &devices,
                    &compiled.nodes,
                    &self.x,
                    &self.options,
                )?
                .x
            }
        };
        compiled.step_rhs = rhs;

        let solution = Solution::new(&self.x, &compiled.nodes);
        for element in &mut self.elements {
            if let Some(dynamic) = element.component_mut().dynamic_mut() {
                dynamic.post_step(&solution);
            }
        }
        Ok(())
    }

    /// Compile unless a compiled system matching the current wiring exists.
    fn ensure_compiled(&mut self) -> Result<()> {
        let rewired = self.compiled.as_ref().is_some_and(|compiled| {
            !compiled
                .pins
                .iter()
                .eq(self.elements.iter().flat_map(Element::pins))
        });
        if rewired {
            debug!("element pins moved since the last compile, recompiling");
            let pins: Vec<Node> = self.elements.iter().flat_map(Element::pins).copied().collect();
            self.reserve_nodes(&pins);
            self.compiled = None;
        }
        if self.compiled.is_none() {
            self.prepare()?;
        }
        Ok(())
    }

    /// Advance the simulation by one tick, compiling first if needed.
    pub fn tick(&mut self) -> Result<()> {
        self.ensure_compiled()?;
        self.step()?;
        self.time += self.tick_rate;
        self.run_watchers();
        Ok(())
    }

    /// Tick until `seconds` of simulated time have elapsed.
    pub fn tick_for(&mut self, seconds: f64) -> Result<()> {
        self.tick_while(seconds, |_| {})
    }

    /// Simulate for `seconds`, recording every tick of the probed elements.
    pub fn run(&mut self, seconds: f64, probes: &[ElementId]) -> Result<Vec<Meter>> {
        for &id in probes {
            self.element(id)?;
        }
        let mut meters: Vec<Meter> = probes.iter().map(|&id| Meter::new(id)).collect();
        self.tick_while(seconds, |circuit| {
            for meter in &mut meters {
                meter.record(circuit.reading_unchecked(meter.element()));
            }
        })?;
        Ok(meters)
    }

    fn tick_while(&mut self, seconds: f64, mut after_tick: impl FnMut(&Self)) -> Result<()> {
        self.ensure_compiled()?;
        let mut elapsed = 0.0;
        while seconds > elapsed {
            self.tick()?;
            after_tick(self);
            elapsed += self.tick_rate;
        }
        Ok(())
    }

    /// Run `callback` after every tick with the element and its reading.
    pub fn watch<F>(&mut self, id: ElementId, callback: F) -> Result<()>
    where
        F: FnMut(&mut Element, &Reading) + 'static,
    {
        self.element(id)?;
        self.watchers.push(Watcher {
            element: id,
            callback: Box::new(callback),
        });
        Ok(())
    }

    fn run_watchers(&mut self) {
        if self.watchers.is_empty() {
            return;
        }
        let mut watchers = std::mem::take(&mut self.watchers);
        for watcher in &mut watchers {
            let reading = self.reading_unchecked(watcher.element);
            if let Some(element) = self.elements.get_mut(watcher.element.index()) {
                (watcher.callback)(element, &reading);
            }
        }
        self.watchers = watchers;
        self.restamp = true;
    }

    fn solution(&self) -> Option<Solution<'_>> {
        self.compiled
            .as_ref()
            .map(|compiled| Solution::new(&self.x, &compiled.nodes))
    }

    fn reading_unchecked(&self, id: ElementId) -> Reading {
        match (self.solution(), self.elements.get(id.index())) {
            (Some(x), Some(element)) => {
                let component = element.component();
                Reading {
                    time: self.time,
                    voltage: component.voltage(&x),
                    current: component.current(&x),
                    power: component.power(&x),
                }
            }
            _ => Reading::unsolved(self.time),
        }
    }

    /// Voltage, current and power of an element; NaN before compilation.
    pub fn reading(&self, id: ElementId) -> Result<Reading> {
        self.element(id)?;
        Ok(self.reading_unchecked(id))
    }

    pub fn voltage(&self, id: ElementId) -> Result<f64> {
        Ok(self.reading(id)?.voltage)
    }

    pub fn current(&self, id: ElementId) -> Result<f64> {
        Ok(self.reading(id)?.current)
    }

    pub fn power(&self, id: ElementId) -> Result<f64> {
        Ok(self.reading(id)?.power)
    }

    #[must_use]
    pub fn node_voltage(&self, node: Node) -> f64 {
        self.solution().map_or(f64::NAN, |x| x.voltage(node))
    }

    /// The compiled system, `None` before compilation.
    #[must_use]
    pub fn system(&self) -> Option<SystemSnapshot> {
        self.compiled.as_ref().map(|compiled| SystemSnapshot {
            lhs: compiled.system.lhs.clone(),
            rhs: compiled.step_rhs.clone(),
            x: self.x.clone(),
            nodes: compiled.nodes.nodes().to_vec(),
        })
    }

    #[must_use]
    pub fn topology(&self) -> TopologyReport {
        let extra_rows = self
            .elements
            .iter()
            .map(|e| e.component().extra_rows())
            .sum();
        Topology::build(&self.elements).report(self.elements.len(), extra_rows)
    }

    /// Graphviz DOT of the circuit, edges labelled with element names.
    #[must_use]
    pub fn dot(&self) -> String {
        Topology::build(&self.elements).to_dot(|id| self.label(id))
    }

    /// The user given name, or the element kind and id.
    #[must_use]
    pub fn label(&self, id: ElementId) -> String {
        match (self.name(id), self.elements.get(id.index())) {
            (Some(name), _) => name.to_string(),
            (None, Some(element)) => format!("{}{id}", element.name()),
            (None, None) => id.to_string(),
        }
    }

    /// One-line summary such as `Resistor(4Ω)[1,gnd]: 8.00v, 2.00A, 16.00W`.
    pub fn describe(&self, id: ElementId) -> Result<String> {
        let element = self.element(id)?;
        let component = element.component();
        let pins = component
            .pins()
            .iter()
            .map(|&pin| match &self.compiled {
                Some(compiled) => compiled.nodes.label(pin),
                None => pin.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");
        let reading = self.reading_unchecked(id);
        Ok(format!(
            "{}({})[{}]: {:.2}v, {:.2}A, {:.2}W",
            element.name(),
            format_properties(&component.properties(), 2),
            pins,
            reading.voltage,
            reading.current,
            reading.power
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::element::{
        AcVoltageSource, Bjt, Capacitor, Cccs, Ccvs, CurrentSource, Diode, Inductor, Relay,
        Resistor, SquareVoltageSource, Switch, Vccs, Vcvs, VoltageSource,
    };
    use crate::meter::Quantity;

    fn approx(actual: f64, expected: f64) -> bool {
        if expected == 0.0 {
            actual.abs() < 0.1
        } else {
            ((actual - expected) / expected).abs() < 0.01
        }
    }

    #[track_caller]
    fn assert_reading(circuit: &Circuit, id: ElementId, voltage: f64, current: f64) {
        let reading = circuit.reading(id).unwrap();
        assert!(
            approx(reading.voltage, voltage) && approx(reading.current, current),
            "{}: expected {voltage}v {current}A, got {reading:?}",
            circuit.describe(id).unwrap()
        );
    }

    #[track_caller]
    fn assert_abs(circuit: &Circuit, id: ElementId, voltage: f64, current: f64, power: f64) {
        let r = circuit.reading(id).unwrap();
        assert!(
            approx(r.voltage.abs(), voltage)
                && approx(r.current.abs(), current)
                && approx(r.power.abs(), power),
            "{}: expected {voltage}v {current}A {power}W",
            circuit.describe(id).unwrap()
        );
    }

    #[test]
    fn test_resistor_network() {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        let v = c.add(VoltageSource::new(n1, Node::GROUND, 32.0));
        let r1 = c.add(Resistor::new(n1, n2, 20.0));
        let r2 = c.add(Resistor::new(n2, Node::GROUND, 8.0));
        let r3 = c.add(Resistor::new(n2, n3, 4.0));
        let r4 = c.add(Resistor::new(n3, Node::GROUND, 24.0));
        c.prepare().unwrap();

        assert_abs(&c, v, 32.0, 4.0, 128.0);
        assert_abs(&c, r1, 20.0, 1.0, 20.0);
        assert_abs(&c, r2, 8.0, 4.0, 32.0);
        assert_abs(&c, r3, 4.0, 1.0, 4.0);
        assert_abs(&c, r4, 24.0, 3.0, 72.0);
    }

    #[test]
    fn test_readings_are_nan_before_compile() {
        let mut c = Circuit::new();
        let n1 = c.node();
        let r = c.add(Resistor::new(n1, Node::GROUND, 1.0));
        assert!(c.voltage(r).unwrap().is_nan());
        assert!(c.node_voltage(n1).is_nan());
        assert!(c.system().is_none());
        assert!(matches!(
            c.voltage(ElementId::new(9)),
            Err(Error::UnknownElement(_))
        ));
    }

    #[test]
    fn test_describe_format() {
        let mut c = Circuit::new();
        let n1 = c.node();
        c.add(VoltageSource::new(n1, Node::GROUND, 8.0));
        let r = c.add(Resistor::new(n1, Node::GROUND, 4.0));
        c.prepare().unwrap();
        assert_eq!(
            c.describe(r).unwrap(),
            "Resistor(4Ω)[1,gnd]: 8.00v, 2.00A, 16.00W"
        );
    }

    #[test]
    fn test_capacitor_charges() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        let v = c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        let r = c.add(Resistor::new(n1, n2, 1.0));
        let cap = c.add(Capacitor::new(n2, Node::GROUND, 0.01));
        c.set_tick_rate(0.001).unwrap();
        c.prepare().unwrap();

        assert_reading(&c, v, 10.0, -10.0);
        assert_reading(&c, r, 10.0, 10.0);
        assert_reading(&c, cap, 0.0, 10.0);

        c.tick_for(0.6).unwrap();
        assert_reading(&c, cap, 10.0, 0.0);
        assert_reading(&c, r, 0.0, 0.0);
    }

    #[test]
    fn test_inductor_current_builds_up() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        c.add(Resistor::new(n1, n2, 1.0));
        let l = c.add(Inductor::new(n2, Node::GROUND, 0.01));
        c.set_tick_rate(0.001).unwrap();
        c.prepare().unwrap();

        assert_reading(&c, l, 10.0, 0.0);
        c.tick_for(1.0).unwrap();
        assert_reading(&c, l, 0.0, 10.0);
    }

    #[test]
    fn test_current_source_into_resistor() {
        let mut c = Circuit::new();
        let n1 = c.node();
        let i = c.add(CurrentSource::new(n1, Node::GROUND, 2.0));
        let r = c.add(Resistor::new(n1, Node::GROUND, 5.0));
        c.prepare().unwrap();
        assert_reading(&c, r, 10.0, 2.0);
        assert_reading(&c, i, 10.0, -2.0);
        assert!(approx(c.power(i).unwrap(), -20.0));
    }

    #[test]
    fn test_controlled_sources() {
        // CCCS: output into r2, controlled by the current through r1.
        let mut c = Circuit::new();
        let (a, b, x) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(a, Node::GROUND, 10.0));
        c.add(Resistor::new(a, b, 10.0));
        let cccs = c.add(Cccs::new(x, Node::GROUND, b, Node::GROUND, 3.0));
        c.add(Resistor::new(x, Node::GROUND, 100.0));
        c.prepare().unwrap();
        assert!(approx(c.voltage(cccs).unwrap().abs(), 300.0));
        assert!(approx(c.current(cccs).unwrap().abs(), 3.0));

        let mut c = Circuit::new();
        let (a, b, x) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(a, Node::GROUND, 5.0));
        c.add(Resistor::new(a, b, 5.0));
        c.add(Resistor::new(b, Node::GROUND, 10.0));
        let vcvs = c.add(Vcvs::new(x, Node::GROUND, b, Node::GROUND, 3.0));
        c.add(Resistor::new(x, Node::GROUND, 50.0));
        c.prepare().unwrap();
        assert!(approx(c.voltage(vcvs).unwrap().abs(), 10.0));
        assert!(approx(c.current(vcvs).unwrap().abs(), 0.2));

        let mut c = Circuit::new();
        let (a, b, x) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(a, Node::GROUND, 1000.0));
        c.add(Resistor::new(a, b, 1000.0));
        let ccvs = c.add(Ccvs::new(x, Node::GROUND, b, Node::GROUND, 2.0));
        c.add(Resistor::new(x, Node::GROUND, 0.5));
        c.prepare().unwrap();
        assert!(approx(c.voltage(ccvs).unwrap().abs(), 2.0));
        assert!(approx(c.current(ccvs).unwrap().abs(), 4.0));

        let mut c = Circuit::new();
        let (a, x) = (c.node(), c.node());
        c.add(VoltageSource::new(a, Node::GROUND, 1000.0));
        c.add(Vccs::new(x, Node::GROUND, a, Node::GROUND, 1e-3));
        let r = c.add(Resistor::new(x, Node::GROUND, 0.5));
        c.prepare().unwrap();
        assert!(approx(c.voltage(r).unwrap().abs(), 0.5));
        assert!(approx(c.current(r).unwrap().abs(), 1.0));
    }

    #[test]
    fn test_diode_forward_and_reverse() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        let v = c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        c.add(Resistor::new(n1, n2, 1.0));
        let d = c.add(Diode::new(n2, Node::GROUND));
        c.prepare().unwrap();
        assert_reading(&c, d, 0.41559, 9.584_412);

        c.element_as_mut::<VoltageSource>(v)
            .unwrap()
            .set_source_voltage(-10.0);
        c.tick().unwrap();
        let i = c.current(d).unwrap();
        assert!(i < 0.0 && i.abs() < 1.1e-6, "reverse current {i}");
    }

    #[test]
    fn test_series_diodes() {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        let r = c.add(Resistor::new(n1, n2, 10.0));
        let d1 = c.add(Diode::new(n2, n3));
        let d2 = c.add(Diode::new(n3, Node::GROUND));
        c.prepare().unwrap();
        assert_reading(&c, r, 9.289_49, 0.928_949);
        assert_reading(&c, d1, 0.35525, 0.928_949);
        assert_reading(&c, d2, 0.35525, 0.928_949);
    }

    #[test]
    fn test_half_wave_rectifier() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        let source = c.add(AcVoltageSource::new(n1, Node::GROUND, -10.0, 1.0));
        let r = c.add(Resistor::new(n1, n2, 0.5));
        let d = c.add(Diode::from_forward_voltage(n2, Node::GROUND, 0.7, 0.08, 1e-3));
        c.prepare().unwrap();
        assert!(approx(c.voltage(source).unwrap(), 0.0));
        assert!(approx(c.current(d).unwrap(), 0.0));

        c.tick_for(0.25).unwrap();
        assert!(approx(c.voltage(source).unwrap(), -10.0));
        assert!(approx(c.voltage(d).unwrap(), -9.9995));

        c.tick_for(0.25).unwrap();
        assert!(approx(c.voltage(source).unwrap(), 0.0));

        c.tick_for(0.25).unwrap();
        assert_reading(&c, source, 10.0, -16.898_573);
        assert_reading(&c, r, 8.449_29, 16.898_573);
        assert_reading(&c, d, 1.550_71, 16.898_573);

        c.tick_for(0.25).unwrap();
        assert!(approx(c.voltage(source).unwrap(), 0.0));
    }

    #[test]
    fn test_full_wave_rectifier() {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        let source = c.add(AcVoltageSource::new(n1, n2, 12.0, 2.0));
        c.add(Diode::new(n1, n3));
        c.add(Diode::new(Node::GROUND, n1));
        c.add(Diode::new(n2, n3));
        c.add(Diode::new(Node::GROUND, n2));
        c.add(Capacitor::new(n3, Node::GROUND, 0.5));
        let load = c.add(Resistor::new(n3, Node::GROUND, 2.0));
        c.set_tick_rate(0.005).unwrap();

        let meters = c.run(0.5, &[load, source]).unwrap();
        assert_eq!(meters[0].len(), 100);
        assert!(approx(meters[0].average(Quantity::Voltage), 9.502_059));
        assert!(approx(meters[0].rms(Quantity::Voltage), 9.791_584));
        assert!(approx(meters[1].rms(Quantity::Voltage), 12.0 / 2.0_f64.sqrt()));
    }

    fn bjt_bias(rb: f64) -> (Circuit, ElementId, Node, Node) {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        c.add(Resistor::new(n1, n2, 1e3));
        c.add(Resistor::new(n1, n3, rb));
        let q = c.add(Bjt::npn(n2, n3, Node::GROUND).with_beta(100.0));
        (c, q, n2, n3)
    }

    #[test]
    fn test_bjt_active_region() {
        let (mut c, q, collector, base) = bjt_bias(200e3);
        c.prepare().unwrap();
        let bjt = c.element_as::<Bjt>(q).unwrap();
        let x = c.solution().unwrap();
        let (ic, ib) = (bjt.collector_current(&x), bjt.base_current(&x));
        assert!(approx(ic, 4.986e-3), "ic {ic}");
        assert!(approx(ib, 48.9e-6), "ib {ib}");
        assert!(ic / ib > 95.0 && ic / ib < 105.0);
        assert!(approx(c.node_voltage(collector), 5.014));
        assert!(approx(c.node_voltage(base), 0.2204));
        assert!(approx(c.current(q).unwrap(), 4.986e-3));
    }

    #[test]
    fn test_bjt_saturation() {
        let (mut c, q, collector, _) = bjt_bias(10e3);
        c.prepare().unwrap();
        assert!(approx(c.current(q).unwrap(), 9.936e-3));
        assert!(approx(c.node_voltage(collector), 0.0642));
    }

    #[test]
    fn test_bjt_cutoff() {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        c.add(Resistor::new(n1, n2, 1e3));
        c.add(Resistor::new(n3, Node::GROUND, 1e3));
        let q = c.add(Bjt::npn(n2, n3, Node::GROUND).with_beta(100.0));
        c.prepare().unwrap();
        assert!(c.current(q).unwrap().abs() < 1e-5);
    }

    #[test]
    fn test_pnp_mirrors_npn() {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 10.0));
        c.add(Resistor::new(n2, Node::GROUND, 1e3));
        c.add(Resistor::new(n3, Node::GROUND, 200e3));
        let q = c.add(Bjt::pnp(n2, n3, n1).with_beta(100.0));
        c.prepare().unwrap();
        assert!(approx(c.current(q).unwrap(), -4.986e-3));
        assert!(approx(c.node_voltage(n2), 4.9859));
    }

    #[test]
    fn test_switch_restamps_on_toggle() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 800.0));
        let sw = c.add(Switch::new(n1, n2, true).with_resistances(12.0, 1e6));
        let r = c.add(Resistor::new(n2, Node::GROUND, 100.0));
        c.prepare().unwrap();
        assert_reading(&c, sw, 800.0, 8e-4);
        assert_reading(&c, r, 0.08, 8e-4);

        c.element_as_mut::<Switch>(sw).unwrap().set_open(false);
        c.tick().unwrap();
        assert_reading(&c, sw, 85.71, 7.1428);
        assert_reading(&c, r, 714.28, 7.1428);
    }

    #[test]
    fn test_relay_pulls_in() {
        let mut c = Circuit::new();
        let (supply, coil, load_supply, load) = (c.node(), c.node(), c.node(), c.node());
        c.add(VoltageSource::new(supply, Node::GROUND, 12.0));
        c.add(Resistor::new(supply, coil, 100.0));
        c.add(VoltageSource::new(load_supply, Node::GROUND, 10.0));
        let relay = c.add(Relay::new(load_supply, load, coil, Node::GROUND));
        let r = c.add(Resistor::new(load, Node::GROUND, 10.0));
        c.set_tick_rate(1e-3).unwrap();
        c.prepare().unwrap();
        assert!(c.element_as::<Relay>(relay).unwrap().is_open());
        assert!(c.current(r).unwrap() < 1e-4);

        c.tick_for(0.1).unwrap();
        assert!(!c.element_as::<Relay>(relay).unwrap().is_open());
        assert!(approx(c.current(r).unwrap(), 1.0));
    }

    #[test]
    fn test_square_wave_levels() {
        let mut c = Circuit::new();
        let n1 = c.node();
        let source = c.add(SquareVoltageSource::new(n1, Node::GROUND, 5.0, 1.0));
        c.add(Resistor::new(n1, Node::GROUND, 1.0));
        c.set_tick_rate(0.1).unwrap();
        c.prepare().unwrap();
        c.tick().unwrap();
        assert!(approx(c.voltage(source).unwrap(), 5.0));
        c.tick_for(0.5).unwrap();
        assert!(approx(c.voltage(source).unwrap(), -5.0));
    }

    #[test]
    fn test_tick_rate_limits() {
        let mut c = Circuit::new();
        let n1 = c.node();
        c.add(AcVoltageSource::new(n1, Node::GROUND, 1.0, 60.0));
        c.add(Resistor::new(n1, Node::GROUND, 1.0));
        assert!(matches!(
            c.set_tick_rate(0.0),
            Err(Error::InvalidTickRate { .. })
        ));
        assert!(c.set_tick_rate(0.01).is_err());

        c.prepare().unwrap();
        assert!((c.tick_rate() - 1.0 / 480.0).abs() < 1e-12);
    }

    #[test]
    fn test_tick_compiles_on_demand() {
        let mut c = Circuit::new();
        let n1 = c.node();
        let r = c.add(Resistor::new(n1, Node::GROUND, 2.0));
        c.add(VoltageSource::new(n1, Node::GROUND, 4.0));
        c.tick().unwrap();
        assert!(c.is_compiled());
        assert!(approx(c.current(r).unwrap(), 2.0));
        assert!(approx(c.time(), DEFAULT_TICK_RATE));
    }

    #[test]
    fn test_watcher_sees_every_tick() {
        let mut c = Circuit::new();
        let n1 = c.node();
        let r = c.add(Resistor::new(n1, Node::GROUND, 2.0));
        c.add(VoltageSource::new(n1, Node::GROUND, 4.0));
        c.set_tick_rate(0.1).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        c.watch(r, move |element, reading| {
            sink.borrow_mut().push(reading.current);
            if let Some(resistor) = Resistor::from_element_mut(element) {
                resistor.set_resistance(4.0);
            }
        })
        .unwrap();

        c.tick_for(0.3).unwrap();
        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(approx(seen[0], 2.0));
        assert!(approx(seen[1], 1.0));
    }

    #[test]
    fn test_connect_rewires() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 6.0));
        let r1 = c.add(Resistor::new(n1, n2, 1.0));
        c.add(Resistor::new(n2, Node::GROUND, 2.0));
        c.prepare().unwrap();
        assert!(approx(c.current(r1).unwrap(), 2.0));

        let r3 = c.add(Resistor::new(n1, Node::GROUND, 3.0));
        c.connect(r3, 0, n2).unwrap();
        assert!(!c.is_compiled());
        c.prepare().unwrap();
        // 1 Ω in series with 2 Ω || 3 Ω
        assert!(approx(c.current(r1).unwrap(), 6.0 / 2.2));
        assert!(c.connect(r3, 4, n1).is_err());
    }

    #[test]
    fn test_names_and_kind_checks() {
        let mut c = Circuit::new();
        let n1 = c.node();
        let r = c.add_named("load", Resistor::new(n1, Node::GROUND, 1.0));
        let v = c.add(VoltageSource::new(n1, Node::GROUND, 1.0));
        assert_eq!(c.find("load"), Some(r));
        assert_eq!(c.name(r), Some("load"));
        assert_eq!(c.name(v), None);
        assert_eq!(c.label(v), "VoltageSource#1");
        let err = c.element_as::<Capacitor>(r).unwrap_err();
        assert!(matches!(
            err,
            Error::ElementKindMismatch { expected: "Capacitor", found: "Resistor", .. }
        ));
    }

    #[test]
    fn test_system_snapshot() {
        let mut c = Circuit::new();
        let n1 = c.node();
        c.add(VoltageSource::new(n1, Node::GROUND, 5.0));
        c.add(Resistor::new(n1, Node::GROUND, 0.5));
        c.prepare().unwrap();
        let snapshot = c.system().unwrap();
        assert_eq!(snapshot.lhs.rows(), vec![vec![2.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(snapshot.rhs, vec![0.0, 5.0]);
        assert!((snapshot.x[0] - 5.0).abs() < 1e-12);
        assert!((snapshot.x[1] + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_dangling_circuit_fails_to_compile() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 5.0));
        c.add(Resistor::new(n1, Node::GROUND, 1.0));
        c.add(Resistor::new(n1, n2, 1.0));
        assert!(matches!(c.prepare(), Err(Error::DanglingNode { .. })));
    }

    #[track_caller]
    fn assert_all(circuit: &Circuit, expected: &[[f64; 3]]) {
        assert_eq!(circuit.len(), expected.len());
        for (id, &[voltage, current, power]) in circuit.ids().zip(expected) {
            assert_abs(circuit, id, voltage, current, power);
        }
    }

    fn series_rlc(resistance: f64) -> Circuit {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 12.0));
        c.add(Resistor::new(n2, n1, resistance));
        c.add(Capacitor::new(n3, n2, 0.01));
        c.add(Inductor::new(n3, Node::GROUND, 0.1));
        c
    }

    #[test]
    fn test_series_rlc_settles() {
        let mut c = series_rlc(1.0);
        c.prepare().unwrap();
        assert_all(
            &c,
            &[[12.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [12.0, 0.0, 0.0]],
        );

        c.tick_for(1.0).unwrap();
        assert_all(
            &c,
            &[[12.0, 0.0, 0.0], [0.0, 0.0, 0.0], [12.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        );
    }

    #[test]
    fn test_series_rlc_overshoots() {
        let mut c = series_rlc(1.0);
        c.set_tick_rate(0.001).unwrap();
        let capacitor = ElementId::new(2);
        let inductor = ElementId::new(3);
        let meters = c.run(1.0, &[capacitor]).unwrap();

        assert!(approx(-meters[0].min(Quantity::Voltage), 18.901));
        assert!(approx(c.current(inductor).unwrap(), -0.005_645));
    }

    #[test]
    fn test_overdamped_series_rlc() {
        let mut c = series_rlc(6.0);
        c.prepare().unwrap();
        c.tick_for(0.38).unwrap();
        assert_all(
            &c,
            &[[12.0, 0.0, 0.0], [0.0, 0.0, 0.0], [12.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        );
    }

    #[test]
    fn test_parallel_rlc() {
        let mut c = Circuit::new();
        let (n1, n2) = (c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 12.0));
        c.add(Resistor::new(n1, n2, 1.0));
        c.add(Resistor::new(n2, Node::GROUND, 1.0));
        c.add(Capacitor::new(n2, Node::GROUND, 0.01));
        c.add(Inductor::new(n2, Node::GROUND, 0.1));
        c.prepare().unwrap();
        // the capacitor shorts the output at t = 0
        assert_all(
            &c,
            &[
                [12.0, 12.0, 144.0],
                [12.0, 12.0, 144.0],
                [0.0, 0.0, 0.0],
                [0.0, 12.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
        );

        c.tick_for(3.0).unwrap();
        // ...and the inductor does once it has charged
        assert_all(
            &c,
            &[
                [12.0, 12.0, 144.0],
                [12.0, 12.0, 144.0],
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 12.0, 0.0],
            ],
        );
    }

    /// 36 V through 12 Ω into a ladder of reactive elements: two in series
    /// to ground, one in series towards a 12 Ω branch and three in parallel
    /// at the end of it.
    fn ladder(build: impl Fn(Node, Node, f64) -> Element) -> Circuit {
        let mut c = Circuit::new();
        let (top, mid, left, right, tail) = (c.node(), c.node(), c.node(), c.node(), c.node());
        c.add(VoltageSource::new(top, Node::GROUND, 36.0));
        c.add(Resistor::new(mid, top, 12.0));
        c.add(Resistor::new(left, tail, 12.0));
        c.add(build(right, Node::GROUND, 0.3));
        c.add(build(left, right, 0.3));
        c.add(build(mid, left, 0.02));
        for _ in 0..3 {
            c.add(build(tail, Node::GROUND, 400e-6));
        }
        c
    }

    #[test]
    fn test_capacitor_ladder() {
        let mut c = ladder(|a, b, value| Capacitor::new(a, b, value).into());
        c.prepare().unwrap();
        assert_all(
            &c,
            &[
                [36.0, 3.0, 108.0],
                [36.0, 3.0, 108.0],
                [0.0, 0.0, 0.0],
                [0.0, 3.0, 0.0],
                [0.0, 3.0, 0.0],
                [0.0, 3.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
        );

        c.tick_for(2.0).unwrap();
        // series capacitors split the voltage by inverse capacitance
        assert_all(
            &c,
            &[
                [36.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [2.102, 0.0, 0.0],
                [2.102, 0.0, 0.0],
                [31.79, 0.0, 0.0],
                [4.205, 0.0, 0.0],
                [4.205, 0.0, 0.0],
                [4.205, 0.0, 0.0],
            ],
        );
    }

    #[test]
    fn test_inductor_ladder() {
        let mut c = ladder(|a, b, value| Inductor::new(a, b, value).into());
        c.prepare().unwrap();
        assert_all(
            &c,
            &[
                [36.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.1192, 0.0, 0.0],
                [0.1192, 0.0, 0.0],
                [35.76, 0.0, 0.0],
                [0.2384, 0.0, 0.0],
                [0.2384, 0.0, 0.0],
                [0.2384, 0.0, 0.0],
            ],
        );

        c.tick_for(1.0).unwrap();
        assert_all(
            &c,
            &[
                [36.0, 3.0, 108.0],
                [36.0, 3.0, 108.0],
                [0.0, 0.0, 0.0],
                [0.0, 3.0, 0.0],
                [0.0, 3.0, 0.0],
                [0.0, 3.0, 0.0],
                [0.0, 0.000_159, 0.0],
                [0.0, 0.000_159, 0.0],
                [0.0, 0.000_159, 0.0],
            ],
        );
    }

    #[test]
    fn test_two_sources_and_three_capacitors() {
        let mut c = Circuit::new();
        let (n1, n2, n3, n4, n5, n6) = (c.node(), c.node(), c.node(), c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, n2, 12.0));
        c.add(VoltageSource::new(n3, n6, -16.0));
        c.add(Resistor::new(n4, Node::GROUND, 12.0));
        c.add(Resistor::new(Node::GROUND, n5, 8.0));
        c.add(Resistor::new(n2, Node::GROUND, 30.0));
        c.add(Resistor::new(n6, n5, 0.5));
        c.add(Capacitor::new(n1, n3, 0.75));
        c.add(Capacitor::new(n3, n5, 1.0));
        c.add(Capacitor::new(n3, n4, 0.5));
        c.prepare().unwrap();
        assert_all(
            &c,
            &[
                [12.0, 0.3448, 4.1379],
                [16.0, 32.0, 512.0],
                [1.655, 0.1379, 0.2283],
                [1.655, 0.2069, 0.3425],
                [10.345, 0.3448, 3.567],
                [16.0, 32.0, 512.0],
                [0.0, 0.3448, 0.0],
                [0.0, 31.79, 0.0],
                [0.0, 0.1379, 0.0],
            ],
        );

        c.tick_for(60.0).unwrap();
        assert_all(
            &c,
            &[
                [12.0, 0.101_14, 1.2137],
                [16.0, 0.125_27, 2.0043],
                [0.2646, 0.022_05, 0.0],
                [0.9855, 0.123_19, 0.1214],
                [3.034, 0.101_14, 0.3069],
                [0.0626, 0.125_27, 0.0],
                [23.92, 0.101_14, 2.419],
                [15.94, 0.002_085, 0.0],
                [14.69, 0.022_05, 0.3238],
            ],
        );
    }

    #[test]
    fn test_pin_moved_through_element_mut_recompiles() {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add(VoltageSource::new(n1, Node::GROUND, 6.0));
        let r1 = c.add(Resistor::new(n1, n2, 1.0));
        let r2 = c.add(Resistor::new(n2, Node::GROUND, 2.0));
        let r3 = c.add(Resistor::new(n1, Node::GROUND, 3.0));
        c.prepare().unwrap();
        assert!(approx(c.current(r1).unwrap(), 2.0));

        // n3 is not part of the compiled system yet
        c.element_mut(r2).unwrap().component_mut().pins_mut()[1] = n3;
        c.element_mut(r3).unwrap().component_mut().pins_mut()[0] = n3;
        assert!(c.is_compiled());
        c.tick().unwrap();
        assert!(approx(c.current(r1).unwrap(), 1.0));
        assert!(approx(c.node_voltage(n3), 3.0));

        let loose = c.node();
        c.element_mut(r3).unwrap().component_mut().pins_mut()[0] = loose;
        assert!(matches!(c.tick(), Err(Error::DanglingNode { .. })));
    }

    #[test]
    fn test_clamped_tick_rate() {
        let mut c = Circuit::new();
        let n1 = c.node();
        c.add(AcVoltageSource::new(n1, Node::GROUND, 1.0, 50.0));
        c.add(Resistor::new(n1, Node::GROUND, 1.0));
        assert!((c.effective_tick_rate() - 0.0025).abs() < 1e-12);

        c.set_tick_rate_clamped(DEFAULT_TICK_RATE).unwrap();
        assert!((c.tick_rate() - 0.0025).abs() < 1e-12);
        c.set_tick_rate_clamped(0.001).unwrap();
        assert!((c.tick_rate() - 0.001).abs() < 1e-12);
        assert!(c.set_tick_rate_clamped(-1.0).is_err());
        assert!(c.set_tick_rate_clamped(f64::NAN).is_err());
        c.tick().unwrap();
    }
}
