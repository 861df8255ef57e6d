//! Sample recording for one element across a simulation run.

use serde::{Deserialize, Serialize};

use crate::circuit::Reading;
use crate::ids::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Voltage,
    Current,
    Power,
}

impl Quantity {
    pub const ALL: [Self; 3] = [Self::Voltage, Self::Current, Self::Power];

    const fn of(self, reading: &Reading) -> f64 {
        match self {
            Self::Voltage => reading.voltage,
            Self::Current => reading.current,
            Self::Power => reading.power,
        }
    }
}

/// Statistics of one quantity over all recorded samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub average: f64,
    pub rms: f64,
    pub min: f64,
    pub max: f64,
    /// Trapezoidal integral over time, e.g. energy for power.
    pub integral: f64,
}

/// Records the readings of one element, one sample per step.
#[derive(Debug, Clone, PartialEq)]
pub struct Meter {
    element: ElementId,
    samples: Vec<Reading>,
}

impl Meter {
    #[must_use]
    pub const fn new(element: ElementId) -> Self {
        Self {
            element,
            samples: Vec::new(),
        }
    }

    #[must_use]
    pub const fn element(&self) -> ElementId {
        self.element
    }

    pub fn record(&mut self, reading: Reading) {
        self.samples.push(reading);
    }

    #[must_use]
    pub fn samples(&self) -> &[Reading] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn values(&self, quantity: Quantity) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(move |r| quantity.of(r))
    }

    /// Arithmetic mean of the samples; NaN when nothing was recorded.
    #[must_use]
    pub fn average(&self, quantity: Quantity) -> f64 {
        self.values(quantity).sum::<f64>() / self.samples.len() as f64
    }

    #[must_use]
    pub fn rms(&self, quantity: Quantity) -> f64 {
        (self.values(quantity).map(|v| v * v).sum::<f64>() / self.samples.len() as f64).sqrt()
    }

    #[must_use]
    pub fn min(&self, quantity: Quantity) -> f64 {
        self.values(quantity).reduce(f64::min).unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn max(&self, quantity: Quantity) -> f64 {
        self.values(quantity).reduce(f64::max).unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn integral(&self, quantity: Quantity) -> f64 {
        self.samples
            .windows(2)
            .map(|w| (w[1].time - w[0].time) * (quantity.of(&w[0]) + quantity.of(&w[1])) / 2.0)
            .sum()
    }

    #[must_use]
    pub fn summary(&self, quantity: Quantity) -> Summary {
        Summary {
            average: self.average(quantity),
            rms: self.rms(quantity),
            min: self.min(quantity),
            max: self.max(quantity),
            integral: self.integral(quantity),
        }
    }
}
