//! MOSFET family-curve model.
//!
//! Square-law model with three regions:
//! - Cutoff (`Vgs <= Vth`): current pinned to a small floor so the loop
//!   equation stays well-defined
//! - Triode (`Vds < Vgs - Vth`): `Id = k·((Vgs − Vth)·Vds − Vds²/2)`
//! - Saturation: `Id = 0.5·k·(Vgs − Vth)²`
//!
//! Both conducting branches are clamped to be non-negative.

use serde::{Deserialize, Serialize};

use super::DeviceModel;

/// Drain current reported in cutoff.
pub const CUTOFF_CURRENT: f64 = 1e-12;

/// Operating region of a MOSFET curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MosfetRegion {
    Cutoff,
    Triode,
    Saturation,
}

/// Parameters for a MOSFET family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MosfetParams {
    /// Gate-source voltages (V), one family curve each, in display order
    pub gate_voltages: Vec<f64>,
    /// Threshold voltage (Vth)
    pub threshold: f64,
    /// Transconductance parameter k (A/V²)
    pub k: f64,
}

impl Default for MosfetParams {
    fn default() -> Self {
        Self {
            gate_voltages: Self::default_gate_voltages(),
            threshold: 2.5,
            k: 2e-3,
        }
    }
}

impl MosfetParams {
    /// Gate voltages used when none are configured.
    pub fn default_gate_voltages() -> Vec<f64> {
        vec![3.0, 3.5, 4.0, 4.5]
    }

    /// Number of family curves.
    pub fn curve_count(&self) -> usize {
        self.gate_voltages.len()
    }

    /// The curve for the given family index, wrapping out-of-range indices.
    pub fn curve(&self, index: usize) -> MosfetCurve {
        let vgs = if self.gate_voltages.is_empty() {
            0.0
        } else {
            self.gate_voltages[index % self.gate_voltages.len()]
        };
        MosfetCurve {
            vgs,
            threshold: self.threshold,
            k: self.k,
        }
    }
}

/// One MOSFET output curve at a fixed gate-source voltage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MosfetCurve {
    pub vgs: f64,
    pub threshold: f64,
    pub k: f64,
}

impl MosfetCurve {
    /// Overdrive voltage `Vgs − Vth`.
    pub fn overdrive(&self) -> f64 {
        self.vgs - self.threshold
    }

    /// Drain current once the channel pinches off.
    pub fn saturation_current(&self) -> f64 {
        let vov = self.overdrive();
        if vov <= 0.0 {
            CUTOFF_CURRENT
        } else {
            0.5 * self.k * vov * vov
        }
    }

    /// Region the device operates in at the given drain-source voltage.
    pub fn region(&self, vds: f64) -> MosfetRegion {
        let vov = self.overdrive();
        if vov <= 0.0 {
            MosfetRegion::Cutoff
        } else if vds < vov {
            MosfetRegion::Triode
        } else {
            MosfetRegion::Saturation
        }
    }
}

impl DeviceModel for MosfetCurve {
    fn current(&self, vds: f64) -> f64 {
        let vov = self.overdrive();
        match self.region(vds) {
            MosfetRegion::Cutoff => CUTOFF_CURRENT,
            MosfetRegion::Triode => (self.k * (vov * vds - 0.5 * vds * vds)).max(0.0),
            MosfetRegion::Saturation => (0.5 * self.k * vov * vov).max(0.0),
        }
    }

    fn slope(&self, vds: f64) -> f64 {
        match self.region(vds) {
            MosfetRegion::Triode if vds >= 0.0 => self.k * (self.overdrive() - vds),
            _ => 0.0,
        }
    }
}
