//! Circuit elements and the traits the solver drives them through.
//!
//! Every element follows the passive sign convention: its voltage is
//! `V(A) - V(B)`, its current flows through it from pin A to pin B, and a
//! positive power is absorbed.

mod controlled;
mod passive;
mod semiconductor;
mod source;
mod switching;

pub use controlled::{Cccs, Ccvs, Vccs, Vcvs};
pub use passive::{Capacitor, Inductor, Resistor};
pub use semiconductor::{Bjt, BjtPolarity, Diode};
pub use source::{AcVoltageSource, CurrentSource, SquareVoltageSource, VoltageSource};
pub use switching::{Relay, Switch};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::Node;
use crate::mna::{Solution, SourceStamper, Stamper};
use crate::units::Property;

/// Behaviour shared by every element.
pub trait Component {
    /// Pins in order A, B, C, D.
    fn pins(&self) -> &[Node];

    /// Moving a pin makes the owning circuit recompile before its next tick.
    fn pins_mut(&mut self) -> &mut [Node];

    /// Number of extra MNA unknowns this element needs.
    fn extra_rows(&self) -> usize {
        0
    }

    /// Receive the first of the `extra_rows()` rows allocated to this element.
    fn assign_rows(&mut self, _first: usize) {}

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn properties(&self) -> Vec<Property>;

    /// Parameter values in the order accepted by [`Element::from_parts`].
    fn params(&self) -> Vec<f64>;

    /// Stamp the time-invariant part of the element.
    fn stamp(&self, stamper: &mut Stamper<'_>);

    fn current(&self, x: &Solution<'_>) -> f64;

    fn voltage(&self, x: &Solution<'_>) -> f64 {
        let pins = self.pins();
        x.between(pins[0], pins[1])
    }

    fn power(&self, x: &Solution<'_>) -> f64 {
        self.voltage(x) * self.current(x)
    }

    fn dynamic(&self) -> Option<&dyn Dynamic> {
        None
    }

    fn dynamic_mut(&mut self) -> Option<&mut dyn Dynamic> {
        None
    }

    fn nonlinear(&self) -> Option<&dyn NonLinear> {
        None
    }

    /// True when the stamped LHS no longer matches the element state.
    fn is_dirty(&self) -> bool {
        false
    }

    fn clear_dirty(&mut self) {}
}

/// Elements whose stamps change from one time step to the next.
pub trait Dynamic {
    /// Forget any state carried from a previous simulation.
    fn reset(&mut self) {}

    /// Recompute the companion model for time step `dt`.
    fn initiate(&mut self, dt: f64);

    /// Stamp the per-step sources, given the solution at time `t`.
    fn pre_step(&mut self, x: &Solution<'_>, sources: &mut SourceStamper<'_>);

    /// Update state from the solution at time `t + dt`.
    fn post_step(&mut self, x: &Solution<'_>);

    /// Largest time step this element can be simulated with.
    fn min_tick_rate(&self) -> f64 {
        f64::MAX
    }
}

/// Elements whose current is a non-linear function of the node voltages.
pub trait NonLinear {
    /// Add the device currents leaving each node to `residual`.
    fn residual(&self, x: &Solution<'_>, residual: &mut SourceStamper<'_>);

    /// Stamp the small-signal conductances at the operating point `x`.
    fn jacobian(&self, x: &Solution<'_>, stamper: &mut Stamper<'_>, min_conductance: f64);
}

/// Typed access to one element variant.
pub trait Variant: Sized {
    const KIND: ElementKind;

    fn from_element(element: &Element) -> Option<&Self>;

    fn from_element_mut(element: &mut Element) -> Option<&mut Self>;
}

macro_rules! elements {
    ($($variant:ident($ty:ty) = $tag:literal, $display:literal;)*) => {
        /// Any element a [`Circuit`](crate::Circuit) can hold.
        #[derive(Debug, Clone)]
        pub enum Element {
            $($variant($ty),)*
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum ElementKind {
            $($variant,)*
        }

        impl ElementKind {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Tag used by the binary codec.
            #[must_use]
            pub const fn tag(self) -> u16 {
                match self {
                    $(Self::$variant => $tag,)*
                }
            }

            #[must_use]
            pub fn from_tag(tag: u16) -> Option<Self> {
                Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
            }

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $display,)*
                }
            }
        }

        impl Element {
            #[must_use]
            pub fn component(&self) -> &dyn Component {
                match self {
                    $(Self::$variant(e) => e,)*
                }
            }

            pub fn component_mut(&mut self) -> &mut dyn Component {
                match self {
                    $(Self::$variant(e) => e,)*
                }
            }

            #[must_use]
            pub const fn kind(&self) -> ElementKind {
                match self {
                    $(Self::$variant(_) => ElementKind::$variant,)*
                }
            }

            /// Rebuild an element from its kind, pins and [`Component::params`].
            pub fn from_parts(kind: ElementKind, pins: &[Node], params: &[f64]) -> Result<Self> {
                let element = match kind {
                    $(ElementKind::$variant => Self::$variant(<$ty>::from_params(pins, params)?),)*
                };
                element.component().validate()?;
                Ok(element)
            }
        }

        $(
            impl From<$ty> for Element {
                fn from(element: $ty) -> Self {
                    Self::$variant(element)
                }
            }

            impl Variant for $ty {
                const KIND: ElementKind = ElementKind::$variant;

                fn from_element(element: &Element) -> Option<&Self> {
                    match element {
                        Element::$variant(e) => Some(e),
                        _ => None,
                    }
                }

                fn from_element_mut(element: &mut Element) -> Option<&mut Self> {
                    match element {
                        Element::$variant(e) => Some(e),
                        _ => None,
                    }
                }
            }
        )*
    };
}

elements! {
    Resistor(Resistor) = 1, "Resistor";
    Capacitor(Capacitor) = 2, "Capacitor";
    Inductor(Inductor) = 3, "Inductor";
    VoltageSource(VoltageSource) = 4, "VoltageSource";
    CurrentSource(CurrentSource) = 5, "CurrentSource";
    AcVoltageSource(AcVoltageSource) = 6, "ACVoltageSource";
    SquareVoltageSource(SquareVoltageSource) = 7, "SquareVoltageSource";
    Vcvs(Vcvs) = 8, "VCVS";
    Vccs(Vccs) = 9, "VCCS";
    Cccs(Cccs) = 10, "CCCS";
    Ccvs(Ccvs) = 11, "CCVS";
    Diode(Diode) = 12, "Diode";
    Bjt(Bjt) = 13, "BJT";
    Switch(Switch) = 14, "Switch";
    Relay(Relay) = 15, "Relay";
}

impl ElementKind {
    /// Number of pins and parameters an element of this kind carries.
    #[must_use]
    pub const fn arity(self) -> (usize, usize) {
        match self {
            Self::Resistor
            | Self::Capacitor
            | Self::Inductor
            | Self::VoltageSource
            | Self::CurrentSource => (2, 1),
            Self::AcVoltageSource => (2, 2),
            Self::SquareVoltageSource => (2, 5),
            Self::Vcvs | Self::Vccs | Self::Cccs | Self::Ccvs => (4, 1),
            Self::Diode | Self::Switch => (2, 3),
            Self::Bjt => (3, 4),
            Self::Relay => (4, 4),
        }
    }
}

impl Element {
    #[must_use]
    pub fn pins(&self) -> &[Node] {
        self.component().pins()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Split raw codec/netlist values into fixed pin and parameter arrays.
pub(crate) fn unpack<const P: usize, const N: usize>(
    element: &'static str,
    pins: &[Node],
    params: &[f64],
) -> Result<([Node; P], [f64; N])> {
    let pins: [Node; P] = pins
        .try_into()
        .map_err(|_| Error::invalid(element, format!("expected {P} pins, got {}", pins.len())))?;
    let params: [f64; N] = params.try_into().map_err(|_| {
        Error::invalid(
            element,
            format!("expected {N} parameters, got {}", params.len()),
        )
    })?;
    Ok((pins, params))
}

pub(crate) fn require_positive(element: &'static str, what: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid(
            element,
            format!("{what} must be positive and finite, got {value}"),
        ))
    }
}

pub(crate) fn require_finite(element: &'static str, what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid(element, format!("{what} must be finite, got {value}")))
    }
}
