//! Nonlinear operating-point solver.
//!
//! Every traced device sits in the same single-loop circuit:
//!
//! ```text
//!   Vs ──[ R ]──┬── V
//!               │
//!            device
//!               │
//!   0 ──────────┘
//! ```
//!
//! The operating point is the terminal voltage `V*` where the device law
//! meets the loop law:
//!
//! ```text
//! I_device(V*) = (Vs − V*) / R
//! ```
//!
//! It is found with a damped iteration whose step is clamped per device
//! family. The diode takes full Newton steps using its closed-form slope;
//! the transistor curves use a fixed-point relaxation on the loop voltage.
//! Running out of iterations is not an error; the last iterate is accepted.

mod newton;

pub use newton::{Iteration, LoopCircuit, NewtonRaphson, OperatingPoint};

/// Iteration cap shared by every device family.
pub const MAX_ITERATIONS: usize = 24;

/// Step tolerance for the diode solve (volts).
pub const DIODE_TOLERANCE: f64 = 1e-9;

/// Step tolerance for the transistor solves (volts).
pub const TRANSISTOR_TOLERANCE: f64 = 1e-6;

/// Largest voltage step per iteration for diodes and BJTs.
pub const JUNCTION_MAX_STEP: f64 = 0.1;

/// Largest voltage step per iteration for MOSFETs.
pub const MOSFET_MAX_STEP: f64 = 0.2;

/// Series resistance floor, keeps the loop conductance finite.
pub const MIN_SERIES_RESISTANCE: f64 = 1e-9;
