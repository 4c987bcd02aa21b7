//! Simulation samples: the only values the engine hands to its consumers.

use serde::Serialize;

use crate::config::DeviceKind;
use crate::devices::MosfetRegion;

/// Variant-specific quantities recorded with each sample.
///
/// Serialized as a flat JSON object for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Auxiliary {
    #[serde(rename_all = "camelCase")]
    Diode {
        junction_voltage: f64,
        iterations: usize,
        converged: bool,
    },
    #[serde(rename_all = "camelCase")]
    Bjt {
        vce: f64,
        base_current: f64,
        curve: usize,
        converged: bool,
    },
    #[serde(rename_all = "camelCase")]
    Mosfet {
        vds: f64,
        vgs: f64,
        region: MosfetRegion,
        curve: usize,
        converged: bool,
    },
    #[serde(rename_all = "camelCase")]
    Instrument {
        raw: f64,
        corrected: f64,
        overridden: bool,
    },
    #[serde(rename_all = "camelCase")]
    Appliance {
        bus_voltage: f64,
        power_w: f64,
        energy_wh: f64,
        running: usize,
    },
    #[serde(rename_all = "camelCase")]
    Battery {
        soc: f64,
        bus_voltage: f64,
        power_w: f64,
        runtime_hours: Option<f64>,
    },
}

impl Auxiliary {
    /// Whether every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Auxiliary::Diode {
                junction_voltage, ..
            } => junction_voltage.is_finite(),
            Auxiliary::Bjt {
                vce, base_current, ..
            } => vce.is_finite() && base_current.is_finite(),
            Auxiliary::Mosfet { vds, vgs, .. } => vds.is_finite() && vgs.is_finite(),
            Auxiliary::Instrument { raw, corrected, .. } => raw.is_finite() && corrected.is_finite(),
            Auxiliary::Appliance {
                bus_voltage,
                power_w,
                energy_wh,
                ..
            } => bus_voltage.is_finite() && power_w.is_finite() && energy_wh.is_finite(),
            Auxiliary::Battery {
                soc,
                bus_voltage,
                power_w,
                runtime_hours,
            } => {
                soc.is_finite()
                    && bus_voltage.is_finite()
                    && power_w.is_finite()
                    && runtime_hours.map_or(true, f64::is_finite)
            }
        }
    }

    /// The aux payload as a JSON object string.
    pub fn to_json(&self) -> String {
        // Plain floats, bools and integers always serialize
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One accepted tick. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSample {
    /// Monotonically increasing, starting at 1, never reused
    pub index: u64,
    pub device_kind: DeviceKind,
    /// Excitation applied this tick
    pub drive_value: f64,
    pub measured_current: f64,
    pub aux: Auxiliary,
    /// Host clock at capture (ms); for export and debugging only
    pub timestamp_ms: f64,
}
