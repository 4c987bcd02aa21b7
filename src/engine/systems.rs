//! Time-integrating and signal models: battery pack, appliance bus and the
//! calibration instruments.

use crate::config::{DeviceKind, DeviceParams, SimulationConfig};
use crate::drive::Drive;
use crate::energy::{appliance, integrate, ApplianceParams, BatteryParams, StorageState};
use crate::instruments::InstrumentParams;
use crate::sample::Auxiliary;

use super::model::{Reading, SimulationModel, TickContext};

fn battery_params(config: &SimulationConfig) -> BatteryParams {
    match &config.device_params {
        DeviceParams::Battery(p) => p.clone(),
        _ => BatteryParams::default(),
    }
}

/// Battery pack feeding an inverter load, with an optional charger.
///
/// The drive value is the AC load in watts. State of charge only changes on
/// accepted ticks, so a paused engine leaves it exactly where it was.
#[derive(Debug, Clone)]
pub struct BatteryModel {
    state: StorageState,
}

impl BatteryModel {
    /// A pack at the configured initial SOC.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            state: StorageState::new(&battery_params(config)),
        }
    }

    pub fn state(&self) -> &StorageState {
        &self.state
    }
}

impl SimulationModel for BatteryModel {
    fn kind(&self) -> DeviceKind {
        DeviceKind::BatteryPack
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, ctx: &TickContext) -> Reading {
        let params = battery_params(config);
        let step = integrate(&mut self.state, &params, drive.value, ctx.dt_s);
        Reading {
            measured_current: step.current,
            aux: Auxiliary::Battery {
                soc: step.soc,
                bus_voltage: step.bus_voltage,
                power_w: step.net_power,
                runtime_hours: step.runtime_hours,
            },
        }
    }

    fn reset(&mut self, config: &SimulationConfig) {
        self.state = StorageState::new(&battery_params(config));
    }
}

/// A set of household appliances behind the supply's series resistance.
#[derive(Debug, Clone, Default)]
pub struct ApplianceModel {
    energy_wh: f64,
}

impl ApplianceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Energy delivered since the last reset (Wh).
    pub fn energy_wh(&self) -> f64 {
        self.energy_wh
    }
}

impl SimulationModel for ApplianceModel {
    fn kind(&self) -> DeviceKind {
        DeviceKind::ApplianceSet
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, ctx: &TickContext) -> Reading {
        let fallback;
        let params = match &config.device_params {
            DeviceParams::Appliances(p) => p,
            _ => {
                fallback = ApplianceParams::default();
                &fallback
            }
        };

        let load = appliance::solve_load(params, drive.value, config.series_resistance, ctx.elapsed_s);
        let energy = self.energy_wh + load.power_w * ctx.dt_s / 3600.0;
        if energy.is_finite() {
            self.energy_wh = energy;
        }

        Reading {
            measured_current: load.current,
            aux: Auxiliary::Appliance {
                bus_voltage: load.bus_voltage,
                power_w: load.power_w,
                energy_wh: self.energy_wh,
                running: load.running,
            },
        }
    }

    fn reset(&mut self, _config: &SimulationConfig) {
        self.energy_wh = 0.0;
    }
}

/// Multimeter, oscilloscope or function generator panel.
///
/// The drive value is the signal amplitude; the calibrated reading is
/// reported as the current it pushes through the series resistance.
#[derive(Debug, Clone)]
pub struct InstrumentModel {
    kind: DeviceKind,
}

impl InstrumentModel {
    pub fn new(kind: DeviceKind) -> Self {
        Self { kind }
    }
}

impl SimulationModel for InstrumentModel {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, ctx: &TickContext) -> Reading {
        let reading = match &config.device_params {
            DeviceParams::Instrument(p) => p.read(drive.value, ctx.elapsed_s),
            _ => InstrumentParams::for_kind(self.kind).read(drive.value, ctx.elapsed_s),
        };
        Reading {
            measured_current: reading.corrected / config.series_resistance,
            aux: Auxiliary::Instrument {
                raw: reading.raw,
                corrected: reading.corrected,
                overridden: reading.overridden,
            },
        }
    }

    fn reset(&mut self, _config: &SimulationConfig) {}

    fn retarget(&mut self, config: &SimulationConfig) -> bool {
        if config.device_kind.is_instrument() {
            self.kind = config.device_kind;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{Appliance, Chemistry};
    use crate::instruments::{Calibration, Waveform};
    use approx::assert_abs_diff_eq;

    fn ctx(dt_s: f64, elapsed_s: f64) -> TickContext {
        TickContext {
            index: 1,
            dt_s,
            elapsed_s,
            now_ms: elapsed_s * 1000.0,
        }
    }

    fn fixed(value: f64) -> Drive {
        Drive { value, curve: 0 }
    }

    #[test]
    fn test_battery_discharges_under_load() {
        let config = SimulationConfig::for_kind(DeviceKind::BatteryPack);
        let mut model = BatteryModel::new(&config);
        assert_eq!(model.state().soc, 80.0);

        let mut last = model.state().soc;
        for i in 1..=20 {
            let reading = model.step(&config, fixed(500.0), &ctx(0.1, i as f64 * 0.1));
            assert!(reading.measured_current > 0.0);
            assert!(model.state().soc < last);
            last = model.state().soc;
        }

        model.reset(&config);
        assert_eq!(model.state().soc, 80.0);
    }

    #[test]
    fn test_battery_charger_outpacing_load_charges() {
        let params = BatteryParams {
            chemistry: Chemistry::LithiumIon,
            charger_current: 50.0,
            load_w: 100.0,
            ..BatteryParams::default()
        };
        let config = SimulationConfig::for_kind(DeviceKind::BatteryPack)
            .with_params(DeviceParams::Battery(params));
        let mut model = BatteryModel::new(&config);

        let reading = model.step(&config, fixed(100.0), &ctx(60.0, 60.0));
        assert!(reading.measured_current < 0.0);
        assert!(model.state().soc > 80.0);
        match reading.aux {
            Auxiliary::Battery { runtime_hours, .. } => assert_eq!(runtime_hours, None),
            other => panic!("unexpected aux {other:?}"),
        }
    }

    #[test]
    fn test_appliance_energy_accumulates() {
        let params = ApplianceParams {
            appliances: vec![Appliance::new("heater", 1000.0)],
        };
        let config = SimulationConfig::for_kind(DeviceKind::ApplianceSet)
            .with_series_resistance(0.0)
            .with_params(DeviceParams::Appliances(params))
            .sanitized();
        let mut model = ApplianceModel::new();

        for i in 1..=36 {
            model.step(&config, fixed(230.0), &ctx(100.0, i as f64 * 100.0));
        }
        // 1 kW for one hour
        assert_abs_diff_eq!(model.energy_wh(), 1000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_instrument_applies_calibration() {
        let params = InstrumentParams {
            waveform: Waveform::Dc,
            calibration: Calibration {
                gain: 2.0,
                offset: 0.5,
            },
            ..InstrumentParams::for_kind(DeviceKind::Multimeter)
        };
        let config = SimulationConfig::for_kind(DeviceKind::Multimeter)
            .with_params(DeviceParams::Instrument(params));
        let mut model = InstrumentModel::new(DeviceKind::Multimeter);

        let reading = model.step(&config, fixed(5.0), &ctx(0.1, 0.1));
        assert_abs_diff_eq!(reading.measured_current, 10.5 / 1000.0, epsilon = 1e-12);
        assert_eq!(
            reading.aux,
            Auxiliary::Instrument {
                raw: 5.0,
                corrected: 10.5,
                overridden: false,
            }
        );
    }

    #[test]
    fn test_instrument_manual_override_bypasses_signal() {
        let params = InstrumentParams {
            manual_override: Some(1.25),
            ..InstrumentParams::for_kind(DeviceKind::Oscilloscope)
        };
        let config = SimulationConfig::for_kind(DeviceKind::Oscilloscope)
            .with_params(DeviceParams::Instrument(params));
        let mut model = InstrumentModel::new(DeviceKind::Oscilloscope);

        for i in 0..5 {
            let reading = model.step(&config, fixed(2.0), &ctx(0.06, i as f64 * 0.137));
            match reading.aux {
                Auxiliary::Instrument { raw, overridden, .. } => {
                    assert_eq!(raw, 1.25);
                    assert!(overridden);
                }
                other => panic!("unexpected aux {other:?}"),
            }
        }
    }

    #[test]
    fn test_instrument_retargets_between_panels() {
        let mut model = InstrumentModel::new(DeviceKind::Multimeter);
        assert!(model.retarget(&SimulationConfig::for_kind(DeviceKind::FunctionGenerator)));
        assert_eq!(model.kind(), DeviceKind::FunctionGenerator);
        assert!(!model.retarget(&SimulationConfig::for_kind(DeviceKind::Diode)));
    }
}
