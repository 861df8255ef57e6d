//! TOML netlists.
//!
//! ```toml
//! tick_rate = 0.001
//!
//! [[element]]
//! kind = "voltage_source"
//! name = "supply"
//! nodes = ["in", "gnd"]
//! voltage = 10.0
//!
//! [[element]]
//! kind = "resistor"
//! nodes = ["in", "gnd"]
//! resistance = 1e3
//! ```
//!
//! Node names are free-form strings; `gnd`, `ground` and `0` all refer to
//! the ground node.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::element::{
    AcVoltageSource, Bjt, BjtPolarity, Capacitor, Cccs, Ccvs, Component, CurrentSource, Diode,
    Element, ElementKind, Inductor, Relay, Resistor, SquareVoltageSource, Switch, Vccs, Vcvs,
    VoltageSource,
};
use crate::error::{Error, Result};
use crate::ids::Node;

/// Current at which `forward_voltage` is measured when none is given.
const DEFAULT_ON_CURRENT: f64 = 1e-3;

/// A circuit description as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Netlist {
    /// Simulation step in seconds; the circuit default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_rate: Option<f64>,

    #[serde(default)]
    pub element: Vec<ElementSpec>,
}

/// One `[[element]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Node names in pin order A, B, C, D.
    pub nodes: Vec<String>,

    #[serde(flatten)]
    pub params: ElementParams,
}

/// Kind-specific parameters, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementParams {
    Resistor {
        resistance: f64,
    },
    Capacitor {
        capacitance: f64,
    },
    Inductor {
        inductance: f64,
    },
    VoltageSource {
        voltage: f64,
    },
    CurrentSource {
        current: f64,
    },
    AcVoltageSource {
        amplitude: f64,
        frequency: f64,
    },
    SquareVoltageSource {
        amplitude: f64,
        frequency: f64,
        #[serde(default = "default_duty")]
        duty: f64,
        #[serde(default)]
        phase: f64,
        #[serde(default)]
        offset: f64,
    },
    Vcvs {
        gain: f64,
    },
    Vccs {
        gain: f64,
    },
    Cccs {
        gain: f64,
    },
    Ccvs {
        gain: f64,
    },
    Diode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        saturation: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emission: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thermal_voltage: Option<f64>,
        /// Derive the emission coefficient from a point on the I-V curve.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        forward_voltage: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_current: Option<f64>,
    },
    Bjt {
        #[serde(default = "default_polarity")]
        polarity: BjtPolarity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        beta: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        saturation: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thermal_voltage: Option<f64>,
    },
    Switch {
        #[serde(default)]
        open: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        closed_resistance: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        open_resistance: Option<f64>,
    },
    Relay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coil_inductance: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operating_current: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        closed_resistance: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        open_resistance: Option<f64>,
    },
}

const fn default_duty() -> f64 {
    0.5
}

const fn default_polarity() -> BjtPolarity {
    BjtPolarity::Npn
}

/// True for the names that refer to the ground node.
#[must_use]
pub fn is_ground_name(name: &str) -> bool {
    name == "0" || name.eq_ignore_ascii_case("gnd") || name.eq_ignore_ascii_case("ground")
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl FromStr for Netlist {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Netlist(format!("failed to parse netlist: {e}")))
    }
}

impl Netlist {
    /// Load a netlist from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&content).map_err(|e| {
            Error::Netlist(format!(
                "failed to parse netlist from {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the netlist to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?).map_err(Error::Io)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Netlist(format!("failed to serialize netlist: {e}")))
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    /// Build a circuit. Nodes are numbered in order of first appearance.
    ///
    /// # Errors
    ///
    /// Returns an error for a wrong node count, an invalid parameter or an
    /// invalid tick rate.
    pub fn to_circuit(&self) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        let mut nodes: HashMap<&str, Node> = HashMap::new();

        for (index, spec) in self.element.iter().enumerate() {
            let kind = spec.params.kind();
            let (expected, _) = kind.arity();
            if spec.nodes.len() != expected {
                return Err(Error::Netlist(format!(
                    "element {} ({}) needs {expected} nodes, got {}",
                    spec.name.as_deref().unwrap_or(&index.to_string()),
                    kind.name(),
                    spec.nodes.len()
                )));
            }

            let pins: Vec<Node> = spec
                .nodes
                .iter()
                .map(|name| {
                    if is_ground_name(name) {
                        Node::GROUND
                    } else {
                        *nodes.entry(name.as_str()).or_insert_with(|| circuit.node())
                    }
                })
                .collect();

            let element = spec.params.build(&pins)?;
            element.component().validate()?;
            match &spec.name {
                Some(name) => circuit.add_named(name.clone(), element),
                None => circuit.add(element),
            };
        }

        if let Some(dt) = self.tick_rate {
            circuit.set_tick_rate(dt)?;
        }
        Ok(circuit)
    }

    /// Describe an existing circuit. Nodes are named `n<id>`, ground `gnd`.
    #[must_use]
    pub fn from_circuit(circuit: &Circuit) -> Self {
        let element = circuit
            .ids()
            .zip(circuit.elements())
            .map(|(id, element)| ElementSpec {
                name: circuit.name(id).map(str::to_string),
                nodes: element
                    .pins()
                    .iter()
                    .map(|pin| {
                        if pin.is_ground() {
                            "gnd".to_string()
                        } else {
                            format!("n{}", pin.id())
                        }
                    })
                    .collect(),
                params: ElementParams::of(element),
            })
            .collect();

        Self {
            tick_rate: Some(circuit.effective_tick_rate()),
            element,
        }
    }
}

impl ElementParams {
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Resistor { .. } => ElementKind::Resistor,
            Self::Capacitor { .. } => ElementKind::Capacitor,
            Self::Inductor { .. } => ElementKind::Inductor,
            Self::VoltageSource { .. } => ElementKind::VoltageSource,
            Self::CurrentSource { .. } => ElementKind::CurrentSource,
            Self::AcVoltageSource { .. } => ElementKind::AcVoltageSource,
            Self::SquareVoltageSource { .. } => ElementKind::SquareVoltageSource,
            Self::Vcvs { .. } => ElementKind::Vcvs,
            Self::Vccs { .. } => ElementKind::Vccs,
            Self::Cccs { .. } => ElementKind::Cccs,
            Self::Ccvs { .. } => ElementKind::Ccvs,
            Self::Diode { .. } => ElementKind::Diode,
            Self::Bjt { .. } => ElementKind::Bjt,
            Self::Switch { .. } => ElementKind::Switch,
            Self::Relay { .. } => ElementKind::Relay,
        }
    }

    /// Instantiate the element on `pins`, which must match the kind's arity.
    fn build(&self, pins: &[Node]) -> Result<Element> {
        let pin = |i: usize| pins.get(i).copied().unwrap_or_default();
        let (a, b, c, d) = (pin(0), pin(1), pin(2), pin(3));

        let element: Element = match *self {
            Self::Resistor { resistance } => Resistor::new(a, b, resistance).into(),
            Self::Capacitor { capacitance } => Capacitor::new(a, b, capacitance).into(),
            Self::Inductor { inductance } => Inductor::new(a, b, inductance).into(),
            Self::VoltageSource { voltage } => VoltageSource::new(a, b, voltage).into(),
            Self::CurrentSource { current } => CurrentSource::new(a, b, current).into(),
            Self::AcVoltageSource {
                amplitude,
                frequency,
            } => AcVoltageSource::new(a, b, amplitude, frequency).into(),
            Self::SquareVoltageSource {
                amplitude,
                frequency,
                duty,
                phase,
                offset,
            } => SquareVoltageSource::new(a, b, amplitude, frequency)
                .with_duty(duty)
                .with_phase(phase)
                .with_offset(offset)
                .into(),
            Self::Vcvs { gain } => Vcvs::new(a, b, c, d, gain).into(),
            Self::Vccs { gain } => Vccs::new(a, b, c, d, gain).into(),
            Self::Cccs { gain } => Cccs::new(a, b, c, d, gain).into(),
            Self::Ccvs { gain } => Ccvs::new(a, b, c, d, gain).into(),
            Self::Diode {
                saturation,
                emission,
                thermal_voltage,
                forward_voltage,
                on_current,
            } => {
                let base = Diode::new(a, b);
                let saturation = saturation.unwrap_or(base.saturation());
                let default_emission = base.emission();
                let mut diode = match (forward_voltage, emission) {
                    (Some(_), Some(_)) => {
                        return Err(Error::Netlist(
                            "diode takes either forward_voltage or emission, not both".into(),
                        ))
                    }
                    (Some(v), None) => Diode::from_forward_voltage(
                        a,
                        b,
                        v,
                        on_current.unwrap_or(DEFAULT_ON_CURRENT),
                        saturation,
                    ),
                    (None, emission) => base
                        .with_saturation(saturation)
                        .with_emission(emission.unwrap_or(default_emission)),
                };
                if let Some(vt) = thermal_voltage {
                    diode = diode.with_thermal_voltage(vt);
                }
                diode.into()
            }
            Self::Bjt {
                polarity,
                beta,
                alpha,
                saturation,
                thermal_voltage,
            } => {
                let mut bjt = Bjt::new(polarity, a, b, c);
                bjt = match (beta, alpha) {
                    (Some(_), Some(_)) => {
                        return Err(Error::Netlist(
                            "bjt takes either beta or alpha, not both".into(),
                        ))
                    }
                    (Some(beta), None) => bjt.with_beta(beta),
                    (None, Some(alpha)) => bjt.with_alpha(alpha),
                    (None, None) => bjt,
                };
                if let Some(saturation) = saturation {
                    bjt = bjt.with_saturation(saturation);
                }
                if let Some(vt) = thermal_voltage {
                    bjt = bjt.with_thermal_voltage(vt);
                }
                bjt.into()
            }
            Self::Switch {
                open,
                closed_resistance,
                open_resistance,
            } => {
                let switch = Switch::new(a, b, open);
                let defaults = switch.params();
                switch
                    .with_resistances(
                        closed_resistance.unwrap_or(defaults[1]),
                        open_resistance.unwrap_or(defaults[2]),
                    )
                    .into()
            }
            Self::Relay {
                coil_inductance,
                operating_current,
                closed_resistance,
                open_resistance,
            } => {
                let relay = Relay::new(a, b, c, d);
                let defaults = relay.params();
                relay
                    .with_coil_inductance(coil_inductance.unwrap_or(defaults[0]))
                    .with_operating_current(operating_current.unwrap_or(defaults[1]))
                    .with_resistances(
                        closed_resistance.unwrap_or(defaults[2]),
                        open_resistance.unwrap_or(defaults[3]),
                    )
                    .into()
            }
        };
        Ok(element)
    }

    /// Parameters of an existing element, with every optional value filled in.
    fn of(element: &Element) -> Self {
        let p = element.component().params();
        let at = |i: usize| p.get(i).copied().unwrap_or(f64::NAN);
        match element.kind() {
            ElementKind::Resistor => Self::Resistor { resistance: at(0) },
            ElementKind::Capacitor => Self::Capacitor { capacitance: at(0) },
            ElementKind::Inductor => Self::Inductor { inductance: at(0) },
            ElementKind::VoltageSource => Self::VoltageSource { voltage: at(0) },
            ElementKind::CurrentSource => Self::CurrentSource { current: at(0) },
            ElementKind::AcVoltageSource => Self::AcVoltageSource {
                amplitude: at(0),
                frequency: at(1),
            },
            ElementKind::SquareVoltageSource => Self::SquareVoltageSource {
                amplitude: at(0),
                frequency: at(1),
                duty: at(2),
                phase: at(3),
                offset: at(4),
            },
            ElementKind::Vcvs => Self::Vcvs { gain: at(0) },
            ElementKind::Vccs => Self::Vccs { gain: at(0) },
            ElementKind::Cccs => Self::Cccs { gain: at(0) },
            ElementKind::Ccvs => Self::Ccvs { gain: at(0) },
            ElementKind::Diode => Self::Diode {
                saturation: Some(at(0)),
                emission: Some(at(1)),
                thermal_voltage: Some(at(2)),
                forward_voltage: None,
                on_current: None,
            },
            ElementKind::Bjt => Self::Bjt {
                polarity: if at(0) < 0.0 {
                    BjtPolarity::Pnp
                } else {
                    BjtPolarity::Npn
                },
                beta: None,
                alpha: Some(at(1)),
                saturation: Some(at(2)),
                thermal_voltage: Some(at(3)),
            },
            ElementKind::Switch => Self::Switch {
                open: at(0) > 0.5,
                closed_resistance: Some(at(1)),
                open_resistance: Some(at(2)),
            },
            ElementKind::Relay => Self::Relay {
                coil_inductance: Some(at(0)),
                operating_current: Some(at(1)),
                closed_resistance: Some(at(2)),
                open_resistance: Some(at(3)),
            },
        }
    }
}
