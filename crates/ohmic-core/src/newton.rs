//! Damped Newton-Raphson for circuits with non-linear devices.
//!
//! The solved equation is `f(x) = G x - z + i(x) = 0`, where `G x = z` is the
//! linear part of the MNA system and `i(x)` holds the device currents leaving
//! each node.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::element::NonLinear;
use crate::error::{Error, Result};
use crate::lu::LuDecomposition;
use crate::matrix::{norm, step, sub, Matrix};
use crate::mna::{NodeMap, Solution, SourceStamper, Stamper, System};

pub const DEFAULT_MAX_ITERATIONS: usize = 500;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_DAMPING_STEPS: usize = 50;
pub const DEFAULT_MIN_CONDUCTANCE: f64 = 1e-12;

/// Knobs for the linear and non-linear solvers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Convergence threshold on both the residual and the update norm.
    pub tolerance: f64,
    /// How often a Newton step may be halved before it is taken anyway.
    pub max_damping_steps: usize,
    /// Floor for device small-signal conductances, keeps the Jacobian regular.
    pub min_conductance: f64,
    /// Worker threads for LU elimination.
    pub threads: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            max_damping_steps: DEFAULT_MAX_DAMPING_STEPS,
            min_conductance: DEFAULT_MIN_CONDUCTANCE,
            threads: 1,
        }
    }
}

impl SolverOptions {
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn with_max_damping_steps(mut self, steps: usize) -> Self {
        self.max_damping_steps = steps;
        self
    }

    #[must_use]
    pub const fn with_min_conductance(mut self, conductance: f64) -> Self {
        self.min_conductance = conductance;
        self
    }

    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// Result of a converged Newton solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Converged {
    pub x: Vec<f64>,
    pub iterations: usize,
}

/// Solve `lhs x - rhs + i(x) = 0` starting from `x0`.
pub fn solve(
    lhs: &Matrix,
    rhs: &[f64],
    devices: &[&dyn NonLinear],
    nodes: &NodeMap,
    x0: &[f64],
    options: &SolverOptions,
) -> Result<Converged> {
    let residual = |x: &[f64]| {
        let mut f = sub(&lhs.mul_vec(x), rhs);
        let solution = Solution::new(x, nodes);
        let mut sources = SourceStamper::new(&mut f, nodes);
        for device in devices {
            device.residual(&solution, &mut sources);
        }
        f
    };

    let mut x = x0.to_vec();
    let mut f = residual(&x);
    let mut f_norm = norm(&f);
    let mut dx_norm = f64::INFINITY;
    let mut iterations = 0;

    while f_norm >= options.tolerance && dx_norm >= options.tolerance {
        if iterations == options.max_iterations {
            return Err(Error::NoConvergence {
                iterations,
                residual: f_norm,
            });
        }
        iterations += 1;

        let mut jacobian = System {
            lhs: lhs.clone(),
            rhs: vec![0.0; rhs.len()],
        };
        {
            let solution = Solution::new(&x, nodes);
            let mut stamper = Stamper::new(&mut jacobian, nodes);
            for device in devices {
                device.jacobian(&solution, &mut stamper, options.min_conductance);
            }
        }
        let dx = LuDecomposition::decompose_parallel(jacobian.lhs, options.threads)?.solve(&f);

        let mut scale = 1.0;
        let mut trial = step(&x, &dx, scale);
        let mut f_trial = residual(&trial);
        let mut halvings = 0;
        while !improves(norm(&f_trial), f_norm) && halvings < options.max_damping_steps {
            scale *= 0.5;
            trial = step(&x, &dx, scale);
            f_trial = residual(&trial);
            halvings += 1;
        }

        dx_norm = norm(&sub(&x, &trial));
        x = trial;
        f = f_trial;
        f_norm = norm(&f);
        trace!("newton iteration {iterations}: |f| = {f_norm:e}, |dx| = {dx_norm:e}, damping {halvings}");
    }

    Ok(Converged { x, iterations })
}

fn improves(candidate: f64, current: f64) -> bool {
    candidate.is_finite() && candidate < current
}
