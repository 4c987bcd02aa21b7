//! BJT (Bipolar Junction Transistor) family-curve model.
//!
//! Each curve holds the base current fixed and traces collector current
//! against collector-emitter voltage:
//!
//!   Ic = clamp(β·Ib·(1 − exp(−Vce/Ve)), 0, 1.2·β·Ib)
//!
//! `Ve` is the knee voltage that shapes the saturation region. Which base
//! current is active is chosen by the drive generator, so a curve is a pure
//! function of `Vce`.

use serde::{Deserialize, Serialize};

use super::DeviceModel;

/// Ceiling on collector current as a multiple of `β·Ib`.
pub const COLLECTOR_CEILING: f64 = 1.2;

/// Parameters for a BJT family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BjtParams {
    /// Base currents (A), one family curve each, in display order
    pub base_currents: Vec<f64>,
    /// Forward current gain (β)
    pub beta: f64,
    /// Knee voltage (Ve) of the saturation region
    pub knee_voltage: f64,
}

impl Default for BjtParams {
    fn default() -> Self {
        Self {
            base_currents: Self::default_base_currents(),
            beta: 100.0,
            knee_voltage: 0.2,
        }
    }
}

impl BjtParams {
    /// Base currents used when none are configured: 10, 20, 30, 40 µA.
    pub fn default_base_currents() -> Vec<f64> {
        vec![10e-6, 20e-6, 30e-6, 40e-6]
    }

    /// Number of family curves.
    pub fn curve_count(&self) -> usize {
        self.base_currents.len()
    }

    /// The curve for the given family index, wrapping out-of-range indices.
    pub fn curve(&self, index: usize) -> BjtCurve {
        let base_current = if self.base_currents.is_empty() {
            0.0
        } else {
            self.base_currents[index % self.base_currents.len()]
        };
        BjtCurve {
            base_current,
            beta: self.beta,
            knee_voltage: self.knee_voltage,
        }
    }
}

/// One BJT output curve at a fixed base current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BjtCurve {
    pub base_current: f64,
    pub beta: f64,
    pub knee_voltage: f64,
}

impl BjtCurve {
    /// Collector current once fully out of saturation (β·Ib).
    pub fn active_current(&self) -> f64 {
        self.beta * self.base_current
    }

    fn unclamped(&self, vce: f64) -> f64 {
        self.active_current() * (1.0 - (-vce / self.knee_voltage).exp())
    }

    fn ceiling(&self) -> f64 {
        COLLECTOR_CEILING * self.active_current()
    }
}

impl DeviceModel for BjtCurve {
    fn current(&self, vce: f64) -> f64 {
        self.unclamped(vce).clamp(0.0, self.ceiling().max(0.0))
    }

    fn slope(&self, vce: f64) -> f64 {
        let raw = self.unclamped(vce);
        if raw <= 0.0 || raw >= self.ceiling() {
            return 0.0;
        }
        self.active_current() / self.knee_voltage * (-vce / self.knee_voltage).exp()
    }
}
