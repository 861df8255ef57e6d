//! SPICE deck export.
//!
//! Nodes keep their numeric ids, ground is `0`. Current-controlled sources
//! get a generated zero-volt sense source for their control branch. Switches
//! and relay contacts are written as resistors of their present state.

use std::f64::consts::TAU;

use crate::circuit::Circuit;
use crate::element::{Element, ElementKind, Relay, Variant};
use crate::ids::{ElementId, Node};

/// Six significant digits, exponent notation outside `1e-3..1e6`.
fn num(value: f64) -> String {
    let rounded: f64 = format!("{value:.5e}").parse().unwrap_or(value);
    let abs = rounded.abs();
    if abs > 0.0 && !(1e-3..1e6).contains(&abs) {
        format!("{rounded:e}")
    } else {
        format!("{rounded}")
    }
}

fn nodes(pins: &[Node]) -> String {
    pins.iter()
        .map(|pin| pin.id().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `PULSE` arguments reproducing a square source from `t = 0`.
fn pulse(params: &[f64]) -> String {
    let [amplitude, frequency, duty, phase, offset] = params else {
        return String::new();
    };
    let period = 1.0 / frequency;
    let high_for = duty * period;
    let start = (period * phase / TAU).rem_euclid(period);
    let (high, low) = (offset + amplitude, offset - amplitude);

    let (initial, pulsed, delay, width) = if start < high_for {
        (high, low, high_for - start, period - high_for)
    } else {
        (low, high, period - start, high_for)
    };
    format!(
        "PULSE({} {} {} 0 0 {} {})",
        num(initial),
        num(pulsed),
        num(delay),
        num(width),
        num(period)
    )
}

struct Deck {
    lines: Vec<String>,
    models: Vec<String>,
}

impl Deck {
    fn element(&mut self, id: ElementId, element: &Element) {
        let n = id.index() + 1;
        let pins = element.pins();
        let p = element.component().params();
        let at = |i: usize| p.get(i).copied().unwrap_or(f64::NAN);

        match element.kind() {
            ElementKind::Resistor => self.push(format!("R{n} {} {}", nodes(pins), num(at(0)))),
            ElementKind::Capacitor => self.push(format!("C{n} {} {}", nodes(pins), num(at(0)))),
            ElementKind::Inductor => self.push(format!("L{n} {} {}", nodes(pins), num(at(0)))),
            ElementKind::VoltageSource => {
                self.push(format!("V{n} {} DC {}", nodes(pins), num(at(0))));
            }
            // SPICE current sources push current out of their second node.
            ElementKind::CurrentSource => {
                self.push(format!("I{n} {} {} DC {}", pins[1].id(), pins[0].id(), num(at(0))));
            }
            ElementKind::AcVoltageSource => self.push(format!(
                "V{n} {} SIN(0 {} {})",
                nodes(pins),
                num(at(0)),
                num(at(1))
            )),
            ElementKind::SquareVoltageSource => {
                self.push(format!("V{n} {} {}", nodes(pins), pulse(&p)));
            }
            ElementKind::Vcvs => self.push(format!("E{n} {} {}", nodes(pins), num(at(0)))),
            ElementKind::Vccs => self.push(format!("G{n} {} {}", nodes(pins), num(at(0)))),
            ElementKind::Cccs | ElementKind::Ccvs => {
                let letter = if element.kind() == ElementKind::Cccs { 'F' } else { 'H' };
                self.push(format!("Vsense{n} {} 0", nodes(&pins[2..])));
                self.push(format!(
                    "{letter}{n} {} Vsense{n} {}",
                    nodes(&pins[..2]),
                    num(at(0))
                ));
            }
            ElementKind::Diode => {
                self.push(format!("D{n} {} D{n}", nodes(pins)));
                self.models
                    .push(format!(".model D{n} D(IS={} N={})", num(at(0)), num(at(1))));
            }
            ElementKind::Bjt => {
                let (polarity, alpha) = (if at(0) < 0.0 { "PNP" } else { "NPN" }, at(1));
                let reverse = alpha / 20.0;
                self.push(format!("Q{n} {} Q{n}", nodes(pins)));
                self.models.push(format!(
                    ".model Q{n} {polarity}(IS={} BF={} BR={})",
                    num(at(2)),
                    num(alpha / (1.0 - alpha)),
                    num(reverse / (1.0 - reverse))
                ));
            }
            ElementKind::Switch => {
                let resistance = if at(0) > 0.5 { at(2) } else { at(1) };
                self.push(format!("R{n} {} {}", nodes(pins), num(resistance)));
            }
            ElementKind::Relay => {
                let open = Relay::from_element(element).map_or(true, Relay::is_open);
                let resistance = if open { at(3) } else { at(2) };
                self.push(format!("R{n} {} {}", nodes(&pins[..2]), num(resistance)));
                self.push(format!("Lcoil{n} {} {}", nodes(&pins[2..]), num(at(0))));
            }
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push(line);
    }
}

/// Render `circuit` as a SPICE deck, with a `.tran` card when `tran` gives
/// `(step, stop)`.
#[must_use]
pub fn export_spice(circuit: &Circuit, title: &str, tran: Option<(f64, f64)>) -> String {
    let mut deck = Deck {
        lines: vec![title.to_string()],
        models: Vec::new(),
    };

    for (id, element) in circuit.ids().zip(circuit.elements()) {
        if let Some(name) = circuit.name(id) {
            deck.push(format!("* {name}"));
        }
        deck.element(id, element);
    }

    deck.lines.append(&mut deck.models);
    if let Some((step, stop)) = tran {
        deck.lines.push(format!(".tran {} {}", num(step), num(stop)));
    }
    deck.lines.push(".end".to_string());

    let mut out = deck.lines.join("\n");
    out.push('\n');
    out
}
