//! Battery / UPS state-of-charge integrator.
//!
//! Each accepted tick moves charge in or out of the pack with an explicit
//! forward-Euler step:
//!
//! 1. `required = load / inverter_efficiency`,
//!    `supplied = charger_current · bus · charging_efficiency`
//! 2. `net = required − supplied` (positive discharges)
//! 3. `I = net / bus` using the previous tick's bus voltage
//! 4. `bus' = clamp(bus − I·Rint, 0.5·Vnom, 1.2·Vnom)`
//! 5. `I = net / bus'`
//! 6. `ΔSOC% = −(I·Δt/3600) / capacity · 100`
//! 7. `soc = clamp(soc + ΔSOC%, 0, 100)`, then `bus = OCV(soc)`
//!
//! There is no adaptive step sizing. At the throttled tick rate this is
//! adequate for visualization; it is not a certification-grade model.

use serde::{Deserialize, Serialize};

/// Storage chemistry, selecting the OCV curve and loss coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Chemistry {
    LeadAcid,
    LithiumIon,
    #[default]
    LiFePo4,
}

/// Open-circuit voltage as a fraction of nominal, by SOC percent.
const LEAD_ACID_OCV: &[(f64, f64)] = &[
    (0.0, 0.875),
    (20.0, 0.93),
    (50.0, 0.975),
    (80.0, 1.02),
    (100.0, 1.075),
];

const LITHIUM_ION_OCV: &[(f64, f64)] = &[
    (0.0, 0.84),
    (10.0, 0.93),
    (20.0, 0.96),
    (50.0, 1.0),
    (80.0, 1.05),
    (90.0, 1.08),
    (100.0, 1.14),
];

const LIFEPO4_OCV: &[(f64, f64)] = &[
    (0.0, 0.78),
    (10.0, 0.97),
    (20.0, 0.99),
    (50.0, 1.0),
    (80.0, 1.01),
    (90.0, 1.02),
    (100.0, 1.06),
];

impl Chemistry {
    /// OCV curve points `(soc %, V/Vnom)`, ascending in SOC.
    fn ocv_table(&self) -> &'static [(f64, f64)] {
        match self {
            Chemistry::LeadAcid => LEAD_ACID_OCV,
            Chemistry::LithiumIon => LITHIUM_ION_OCV,
            Chemistry::LiFePo4 => LIFEPO4_OCV,
        }
    }

    /// Open-circuit voltage over nominal voltage at the given SOC percent.
    pub fn open_circuit_ratio(&self, soc: f64) -> f64 {
        let table = self.ocv_table();
        let soc = soc.clamp(0.0, 100.0);

        for pair in table.windows(2) {
            let (s0, r0) = pair[0];
            let (s1, r1) = pair[1];
            if soc <= s1 {
                return r0 + (r1 - r0) * (soc - s0) / (s1 - s0);
            }
        }
        table[table.len() - 1].1
    }

    /// Internal resistance of one module (ohms).
    pub fn module_resistance(&self) -> f64 {
        match self {
            Chemistry::LeadAcid => 0.02,
            Chemistry::LithiumIon => 0.008,
            Chemistry::LiFePo4 => 0.005,
        }
    }

    /// Fraction of charger power that ends up stored.
    pub fn charging_efficiency(&self) -> f64 {
        match self {
            Chemistry::LeadAcid => 0.85,
            Chemistry::LithiumIon => 0.95,
            Chemistry::LiFePo4 => 0.97,
        }
    }
}

/// Parameters for a battery pack and the load it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryParams {
    /// Nominal voltage of one series module (V)
    pub nominal_voltage: f64,
    /// Capacity of one parallel string (Ah)
    pub capacity_ah: f64,
    /// Modules in series
    pub series_cells: u32,
    /// Strings in parallel
    pub parallel_cells: u32,
    pub chemistry: Chemistry,
    /// Charger output current (A)
    pub charger_current: f64,
    /// Inverter efficiency, in (0, 1]
    pub inverter_efficiency: f64,
    /// AC load served through the inverter (W)
    pub load_w: f64,
    /// SOC the pack starts at and returns to on reset (%)
    pub initial_soc: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        BatteryPreset::HomeUps.params()
    }
}

impl BatteryParams {
    /// Nominal pack voltage.
    pub fn pack_voltage(&self) -> f64 {
        self.nominal_voltage * self.series_cells.max(1) as f64
    }

    /// Pack capacity in amp-hours.
    pub fn pack_capacity_ah(&self) -> f64 {
        self.capacity_ah * self.parallel_cells.max(1) as f64
    }

    /// Pack internal resistance.
    pub fn internal_resistance(&self) -> f64 {
        self.chemistry.module_resistance() * self.series_cells.max(1) as f64
            / self.parallel_cells.max(1) as f64
    }

    /// Open-circuit pack voltage at the given SOC percent.
    pub fn open_circuit_voltage(&self, soc: f64) -> f64 {
        self.chemistry.open_circuit_ratio(soc) * self.pack_voltage()
    }
}

/// Named battery configurations offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatteryPreset {
    /// 48 V LiFePO4 home UPS, 100 Ah
    HomeUps,
    /// 48 V lead-acid telecom plant, 4 × 12 V blocks, 200 Ah
    Telecom,
    /// 12 V lead-acid automotive battery, 60 Ah
    Automotive,
}

impl BatteryPreset {
    pub fn params(&self) -> BatteryParams {
        match self {
            BatteryPreset::HomeUps => BatteryParams {
                nominal_voltage: 48.0,
                capacity_ah: 100.0,
                series_cells: 1,
                parallel_cells: 1,
                chemistry: Chemistry::LiFePo4,
                charger_current: 0.0,
                inverter_efficiency: 0.92,
                load_w: 500.0,
                initial_soc: 80.0,
            },
            BatteryPreset::Telecom => BatteryParams {
                nominal_voltage: 12.0,
                capacity_ah: 100.0,
                series_cells: 4,
                parallel_cells: 2,
                chemistry: Chemistry::LeadAcid,
                charger_current: 10.0,
                inverter_efficiency: 0.9,
                load_w: 800.0,
                initial_soc: 80.0,
            },
            BatteryPreset::Automotive => BatteryParams {
                nominal_voltage: 12.0,
                capacity_ah: 60.0,
                series_cells: 1,
                parallel_cells: 1,
                chemistry: Chemistry::LeadAcid,
                charger_current: 0.0,
                inverter_efficiency: 0.85,
                load_w: 150.0,
                initial_soc: 80.0,
            },
        }
    }
}

/// Mutable pack state, owned by the battery model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageState {
    /// State of charge (%), always within [0, 100]
    pub soc: f64,
    /// Open-circuit bus voltage the next tick starts from
    pub bus_voltage: f64,
}

impl StorageState {
    /// Fresh state at the pack's initial SOC.
    pub fn new(params: &BatteryParams) -> Self {
        Self::at_soc(params, params.initial_soc)
    }

    /// State at an explicit SOC percent.
    pub fn at_soc(params: &BatteryParams, soc: f64) -> Self {
        let soc = if soc.is_finite() { soc.clamp(0.0, 100.0) } else { 0.0 };
        Self {
            soc,
            bus_voltage: params.open_circuit_voltage(soc),
        }
    }
}

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageStep {
    /// Battery current, positive when discharging (A)
    pub current: f64,
    /// Bus voltage after the internal-resistance drop (V)
    pub bus_voltage: f64,
    /// Net power drawn from the pack (W)
    pub net_power: f64,
    /// SOC after the step (%)
    pub soc: f64,
    /// Hours until empty at this current, while discharging
    pub runtime_hours: Option<f64>,
}

/// Advance `state` by `dt_s` seconds at the given AC load.
pub fn integrate(state: &mut StorageState, params: &BatteryParams, load_w: f64, dt_s: f64) -> StorageStep {
    let v_nom = params.pack_voltage();
    let bus = state.bus_voltage;

    let required = load_w / params.inverter_efficiency;
    let supplied = params.charger_current * bus * params.chemistry.charging_efficiency();
    let net_power = required - supplied;

    let first_current = net_power / bus;
    let bus_loaded =
        (bus - first_current * params.internal_resistance()).clamp(0.5 * v_nom, 1.2 * v_nom);
    let current = net_power / bus_loaded;

    let delta_ah = current * dt_s / 3600.0;
    let delta_soc = -delta_ah / params.pack_capacity_ah() * 100.0;
    let soc = (state.soc + delta_soc).clamp(0.0, 100.0);

    // A degenerate step must not poison the stored charge
    if soc.is_finite() {
        state.soc = soc;
    }
    state.bus_voltage = params.open_circuit_voltage(state.soc);

    let runtime_hours = if current > 0.0 {
        Some(state.soc / 100.0 * params.pack_capacity_ah() / current)
    } else {
        None
    };

    StorageStep {
        current,
        bus_voltage: bus_loaded,
        net_power,
        soc: state.soc,
        runtime_hours,
    }
}
