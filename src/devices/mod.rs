//! Device model library.
//!
//! Pure, stateless current laws for the three traced device families:
//! - [`DiodeParams`]: Shockley diode
//! - [`BjtCurve`]: bipolar transistor output curve at a fixed base current
//! - [`MosfetCurve`]: square-law MOSFET output curve at a fixed gate voltage
//!
//! Every model implements [`DeviceModel`], which is all the operating-point
//! solver needs to know about a device.

mod bjt;
mod diode;
mod mosfet;

pub use bjt::{BjtCurve, BjtParams, COLLECTOR_CEILING};
pub use diode::{DiodeParams, EXP_ARG_LIMIT};
pub use mosfet::{MosfetCurve, MosfetParams, MosfetRegion, CUTOFF_CURRENT};

/// A two-terminal current law `I(V)` with its voltage derivative.
pub trait DeviceModel {
    /// Device current at terminal voltage `v`.
    fn current(&self, v: f64) -> f64;

    /// Derivative `dI/dV` at terminal voltage `v`.
    fn slope(&self, v: f64) -> f64;
}
