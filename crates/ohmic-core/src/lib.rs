//! Core simulation engine for ohmic.
//!
//! This crate implements transient circuit simulation with Modified Nodal
//! Analysis: a dense LU solver, element stamps with backward Euler companion
//! models for reactive parts, Newton-Raphson for non-linear devices, and the
//! file formats (TOML netlists, a compact binary codec, SPICE export) used to
//! move circuits in and out of the engine.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod circuit;
pub mod codec;
pub mod element;
pub mod error;
pub mod ids;
pub mod lu;
pub mod matrix;
pub mod meter;
pub mod mna;
pub mod netlist;
pub mod newton;
pub mod spice;
pub mod topology;
pub mod units;

pub use circuit::{Circuit, Reading, SolverOptions, SystemSnapshot};
pub use element::{Element, ElementKind};
pub use error::{Error, Result};
pub use ids::{ElementId, Node};
pub use meter::Meter;
pub use netlist::Netlist;
