//! SI prefix formatting for element properties and readings.

use serde::Serialize;

/// A named quantity exposed by an element, e.g. a resistance in ohms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Property {
    pub value: f64,
    pub symbol: &'static str,
}

impl Property {
    #[must_use]
    pub const fn new(value: f64, symbol: &'static str) -> Self {
        Self { value, symbol }
    }
}

const PREFIXES: [(f64, &str, f64); 7] = [
    (1e12, "T", 1e-12),
    (1e9, "G", 1e-9),
    (1e6, "M", 1e-6),
    (1e3, "k", 1e-3),
    (1.0, "", 1.0),
    (1e-3, "m", 1e3),
    (1e-6, "μ", 1e6),
];

/// Render `value` with an SI prefix, rounded to `precision` decimals.
///
/// Values larger than 1e15 or smaller than 1e-9 in magnitude are printed
/// without a prefix.
#[must_use]
pub fn format_si(value: f64, unit: &str, precision: usize) -> String {
    let abs = value.abs();
    if !value.is_finite() || abs > 1e15 || abs < 1e-9 {
        return format!("{}{}", trim_decimal(value, precision), unit);
    }

    let (prefix, mult) = PREFIXES
        .iter()
        .find(|(limit, _, _)| abs >= *limit)
        .map_or(("n", 1e9), |(_, prefix, mult)| (*prefix, *mult));

    format!("{}{}{}", trim_decimal(value * mult, precision), prefix, unit)
}

/// Join several properties with commas, as shown in element descriptions.
#[must_use]
pub fn format_properties(properties: &[Property], precision: usize) -> String {
    properties
        .iter()
        .map(|p| format_si(p.value, p.symbol, precision))
        .collect::<Vec<_>>()
        .join(",")
}

fn trim_decimal(value: f64, precision: usize) -> String {
    let mut s = format!("{value:.precision$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s.remove(0);
    }
    s
}
