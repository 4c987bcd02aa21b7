//! Simulation configuration.
//!
//! A [`SimulationConfig`] is owned by the caller and replaced wholesale when
//! the user edits a control. The engine only ever reads it. Two views are
//! provided:
//!
//! - [`SimulationConfig::validate`] rejects bad values, for loading configs
//!   at the edge (CLI, wasm host)
//! - [`SimulationConfig::sanitized`] repairs bad values with documented
//!   fallbacks, for the tick path, which must never fail

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::devices::{BjtParams, DiodeParams, MosfetParams};
use crate::energy::{ApplianceParams, BatteryParams};
use crate::error::{Result, VoltlabError};
use crate::instruments::InstrumentParams;
use crate::solver::MIN_SERIES_RESISTANCE;

/// Series resistance used when the configured one is not a number.
pub const FALLBACK_SERIES_RESISTANCE: f64 = 1000.0;

/// Tick interval used when the configured one is unusable.
pub const FALLBACK_TIMESTEP_MS: f64 = 100.0;

/// Inverter efficiency used when the configured one is outside (0, 1].
pub const FALLBACK_INVERTER_EFFICIENCY: f64 = 0.9;

/// Battery capacity used when the configured one is not positive.
pub const FALLBACK_CAPACITY_AH: f64 = 100.0;

/// Fewest points a sweep can have.
pub const MIN_SWEEP_STEPS: usize = 2;

/// Most points a sweep can have.
pub const MAX_SWEEP_STEPS: usize = 100_000;

/// Which simulation variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    #[default]
    Diode,
    Bjt,
    Mosfet,
    Multimeter,
    Oscilloscope,
    FunctionGenerator,
    ApplianceSet,
    BatteryPack,
}

impl DeviceKind {
    /// Every kind, in panel order.
    pub const ALL: [DeviceKind; 8] = [
        DeviceKind::Diode,
        DeviceKind::Bjt,
        DeviceKind::Mosfet,
        DeviceKind::Multimeter,
        DeviceKind::Oscilloscope,
        DeviceKind::FunctionGenerator,
        DeviceKind::ApplianceSet,
        DeviceKind::BatteryPack,
    ];

    /// Stable name used on the wire and in CSV exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Diode => "diode",
            DeviceKind::Bjt => "bjt",
            DeviceKind::Mosfet => "mosfet",
            DeviceKind::Multimeter => "multimeter",
            DeviceKind::Oscilloscope => "oscilloscope",
            DeviceKind::FunctionGenerator => "functionGenerator",
            DeviceKind::ApplianceSet => "applianceSet",
            DeviceKind::BatteryPack => "batteryPack",
        }
    }

    /// Number of samples kept in history for this kind.
    pub fn default_history_capacity(&self) -> usize {
        match self {
            DeviceKind::Diode | DeviceKind::Bjt | DeviceKind::Mosfet => 240,
            DeviceKind::Multimeter => 480,
            DeviceKind::Oscilloscope | DeviceKind::FunctionGenerator => 600,
            DeviceKind::ApplianceSet => 720,
            DeviceKind::BatteryPack => 1440,
        }
    }

    /// Whether this kind is one of the calibration panels.
    pub fn is_instrument(&self) -> bool {
        matches!(
            self,
            DeviceKind::Multimeter | DeviceKind::Oscilloscope | DeviceKind::FunctionGenerator
        )
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = VoltlabError;

    /// Accepts the wire name in any case, with or without `-`/`_`.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        DeviceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_lowercase() == key)
            .ok_or_else(|| VoltlabError::invalid_config("deviceKind", format!("unknown device kind '{s}'")))
    }
}

/// How the excitation evolves from tick to tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriveMode {
    #[default]
    Fixed,
    Sweep,
}

/// A linear sweep over `steps` points from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRange {
    pub from: f64,
    pub to: f64,
    pub steps: usize,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self {
            from: 0.0,
            to: 5.0,
            steps: 10,
        }
    }
}

impl SweepRange {
    pub fn new(from: f64, to: f64, steps: usize) -> Self {
        Self { from, to, steps }
    }

    /// Value of point `index`, linearly interpolated across the range.
    pub fn value_at(&self, index: usize) -> f64 {
        if self.steps < MIN_SWEEP_STEPS {
            return self.from;
        }
        let t = index.min(self.steps - 1) as f64 / (self.steps - 1) as f64;
        self.from + (self.to - self.from) * t
    }
}

impl FromStr for SweepRange {
    type Err = VoltlabError;

    /// Parses `from:to:steps`, e.g. `0:5:10`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || VoltlabError::invalid_config("sweepRange", format!("expected 'from:to:steps', got '{s}'"));
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(bad());
        }
        let from = parts[0].trim().parse::<f64>().map_err(|_| bad())?;
        let to = parts[1].trim().parse::<f64>().map_err(|_| bad())?;
        let steps = parts[2].trim().parse::<usize>().map_err(|_| bad())?;
        Ok(Self { from, to, steps })
    }
}

/// Variant-specific parameter record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeviceParams {
    Diode(DiodeParams),
    Bjt(BjtParams),
    Mosfet(MosfetParams),
    Instrument(InstrumentParams),
    Appliances(ApplianceParams),
    Battery(BatteryParams),
}

impl DeviceParams {
    /// Default parameters for a device kind.
    pub fn for_kind(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Diode => DeviceParams::Diode(DiodeParams::default()),
            DeviceKind::Bjt => DeviceParams::Bjt(BjtParams::default()),
            DeviceKind::Mosfet => DeviceParams::Mosfet(MosfetParams::default()),
            DeviceKind::Multimeter | DeviceKind::Oscilloscope | DeviceKind::FunctionGenerator => {
                DeviceParams::Instrument(InstrumentParams::for_kind(kind))
            }
            DeviceKind::ApplianceSet => DeviceParams::Appliances(ApplianceParams::default()),
            DeviceKind::BatteryPack => DeviceParams::Battery(BatteryParams::default()),
        }
    }

    /// Whether this record can drive the given kind.
    pub fn matches(&self, kind: DeviceKind) -> bool {
        match self {
            DeviceParams::Diode(_) => kind == DeviceKind::Diode,
            DeviceParams::Bjt(_) => kind == DeviceKind::Bjt,
            DeviceParams::Mosfet(_) => kind == DeviceKind::Mosfet,
            DeviceParams::Instrument(_) => kind.is_instrument(),
            DeviceParams::Appliances(_) => kind == DeviceKind::ApplianceSet,
            DeviceParams::Battery(_) => kind == DeviceKind::BatteryPack,
        }
    }
}

/// Configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    pub device_kind: DeviceKind,
    /// Source voltage (V); the excitation for every kind but the battery
    pub source_voltage: f64,
    /// Series resistance (Ω), floored at 1e-9
    pub series_resistance: f64,
    pub mode: DriveMode,
    /// Used when `mode` is [`DriveMode::Sweep`]
    pub sweep_range: SweepRange,
    pub device_params: DeviceParams,
    /// Minimum milliseconds between accepted ticks
    pub timestep_ms: f64,
    /// Simulated seconds per wall-clock second, for integrating variants
    pub time_scale: f64,
    /// Overrides the per-kind history length
    pub history_capacity: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::for_kind(DeviceKind::Diode)
    }
}

impl SimulationConfig {
    /// Panel defaults for a device kind.
    pub fn for_kind(kind: DeviceKind) -> Self {
        let (source_voltage, series_resistance, mode, sweep_range, timestep_ms) = match kind {
            DeviceKind::Diode => (5.0, 1000.0, DriveMode::Fixed, SweepRange::new(0.0, 5.0, 50), 80.0),
            DeviceKind::Bjt | DeviceKind::Mosfet => {
                (10.0, 1000.0, DriveMode::Sweep, SweepRange::new(0.0, 10.0, 60), 60.0)
            }
            DeviceKind::Multimeter => (5.0, 1000.0, DriveMode::Fixed, SweepRange::new(0.0, 10.0, 20), 120.0),
            DeviceKind::Oscilloscope => (2.0, 1000.0, DriveMode::Fixed, SweepRange::new(0.5, 5.0, 10), 60.0),
            DeviceKind::FunctionGenerator => {
                (1.0, 1000.0, DriveMode::Fixed, SweepRange::new(0.5, 5.0, 10), 60.0)
            }
            DeviceKind::ApplianceSet => (230.0, 0.5, DriveMode::Fixed, SweepRange::new(180.0, 250.0, 15), 100.0),
            DeviceKind::BatteryPack => (48.0, 1000.0, DriveMode::Fixed, SweepRange::new(0.0, 2000.0, 20), 100.0),
        };

        Self {
            device_kind: kind,
            source_voltage,
            series_resistance,
            mode,
            sweep_range,
            device_params: DeviceParams::for_kind(kind),
            timestep_ms,
            time_scale: 1.0,
            history_capacity: None,
        }
    }

    /// Set the source voltage.
    pub fn with_source_voltage(mut self, source_voltage: f64) -> Self {
        self.source_voltage = source_voltage;
        self
    }

    /// Set the series resistance (Ω).
    pub fn with_series_resistance(mut self, series_resistance: f64) -> Self {
        self.series_resistance = series_resistance;
        self
    }

    /// Switch to a triangular sweep over the given range.
    pub fn with_sweep(mut self, from: f64, to: f64, steps: usize) -> Self {
        self.mode = DriveMode::Sweep;
        self.sweep_range = SweepRange::new(from, to, steps);
        self
    }

    /// Switch to a constant excitation.
    pub fn with_fixed(mut self) -> Self {
        self.mode = DriveMode::Fixed;
        self
    }

    /// Replace the parameter record.
    pub fn with_params(mut self, params: DeviceParams) -> Self {
        self.device_params = params;
        self
    }

    /// Set the minimum interval between accepted ticks.
    pub fn with_timestep_ms(mut self, timestep_ms: f64) -> Self {
        self.timestep_ms = timestep_ms;
        self
    }

    /// Set how many simulated seconds pass per wall-clock second.
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Override the history length.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Load a config from JSON. Fields that are left out take the defaults
    /// of the named `deviceKind`.
    pub fn from_json(json: &str) -> Result<Self> {
        let overlay: Value = serde_json::from_str(json)?;
        let kind = match overlay.get("deviceKind") {
            Some(v) => serde_json::from_value::<DeviceKind>(v.clone())?,
            None => DeviceKind::default(),
        };

        let mut merged = serde_json::to_value(Self::for_kind(kind))?;
        merge_json(&mut merged, overlay);
        Ok(serde_json::from_value(merged)?)
    }

    /// Load a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VoltlabError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Excitation used in fixed mode: the battery's load power, or the
    /// source voltage for every other kind.
    pub fn fixed_excitation(&self) -> f64 {
        match (&self.device_kind, &self.device_params) {
            (DeviceKind::BatteryPack, DeviceParams::Battery(b)) => b.load_w,
            _ => self.source_voltage,
        }
    }

    /// Number of family curves the drive generator cycles through.
    pub fn curve_count(&self) -> usize {
        match &self.device_params {
            DeviceParams::Bjt(p) => p.curve_count().max(1),
            DeviceParams::Mosfet(p) => p.curve_count().max(1),
            _ => 1,
        }
    }

    /// History length in effect.
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
            .unwrap_or_else(|| self.device_kind.default_history_capacity())
            .max(1)
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, field: &str, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(VoltlabError::invalid_config(field, message))
            }
        };

        check(
            self.source_voltage.is_finite() && self.source_voltage >= 0.0,
            "sourceVoltage",
            "must be a finite, non-negative number",
        )?;
        check(
            self.series_resistance.is_finite() && self.series_resistance >= 0.0,
            "seriesResistance",
            "must be a finite, non-negative number",
        )?;
        check(
            self.timestep_ms.is_finite() && self.timestep_ms > 0.0,
            "timestepMs",
            "must be a positive number",
        )?;
        check(
            self.time_scale.is_finite() && self.time_scale >= 0.0,
            "timeScale",
            "must be a finite, non-negative number",
        )?;
        check(
            self.history_capacity != Some(0),
            "historyCapacity",
            "must hold at least one sample",
        )?;
        if self.mode == DriveMode::Sweep {
            check(
                self.sweep_range.from.is_finite() && self.sweep_range.to.is_finite(),
                "sweepRange",
                "bounds must be finite",
            )?;
            check(
                self.sweep_range.steps >= MIN_SWEEP_STEPS,
                "sweepRange.steps",
                "a sweep needs at least two points",
            )?;
            check(
                self.sweep_range.steps <= MAX_SWEEP_STEPS,
                "sweepRange.steps",
                "a sweep can have at most 100000 points",
            )?;
        }
        check(
            self.device_params.matches(self.device_kind),
            "deviceParams",
            "parameter record does not match deviceKind",
        )?;

        match &self.device_params {
            DeviceParams::Diode(p) => {
                check(
                    p.saturation_current.is_finite() && p.saturation_current > 0.0,
                    "deviceParams.saturationCurrent",
                    "must be positive",
                )?;
                check(p.ideality >= 1.0, "deviceParams.ideality", "must be at least 1")?;
            }
            DeviceParams::Bjt(p) => {
                check(!p.base_currents.is_empty(), "deviceParams.baseCurrents", "must not be empty")?;
                check(
                    p.beta.is_finite() && p.beta > 0.0,
                    "deviceParams.beta",
                    "must be positive",
                )?;
                check(p.knee_voltage > 0.0, "deviceParams.kneeVoltage", "must be positive")?;
            }
            DeviceParams::Mosfet(p) => {
                check(!p.gate_voltages.is_empty(), "deviceParams.gateVoltages", "must not be empty")?;
                check(p.k.is_finite() && p.k > 0.0, "deviceParams.k", "must be positive")?;
                check(p.threshold.is_finite(), "deviceParams.threshold", "must be finite")?;
            }
            DeviceParams::Instrument(p) => {
                check(
                    p.calibration.gain.is_finite() && p.calibration.offset.is_finite(),
                    "deviceParams.calibration",
                    "gain and offset must be finite",
                )?;
                check(
                    p.frequency_hz.is_finite() && p.frequency_hz >= 0.0,
                    "deviceParams.frequencyHz",
                    "must be a finite, non-negative number",
                )?;
            }
            DeviceParams::Appliances(p) => {
                check(
                    p.appliances.iter().all(|a| a.power_w.is_finite() && a.power_w >= 0.0),
                    "deviceParams.appliances",
                    "power must be finite and non-negative",
                )?;
            }
            DeviceParams::Battery(p) => {
                check(
                    p.nominal_voltage.is_finite() && p.nominal_voltage > 0.0,
                    "deviceParams.nominalVoltage",
                    "must be positive",
                )?;
                check(
                    p.capacity_ah.is_finite() && p.capacity_ah > 0.0,
                    "deviceParams.capacityAh",
                    "must be positive",
                )?;
                check(
                    p.inverter_efficiency > 0.0 && p.inverter_efficiency <= 1.0,
                    "deviceParams.inverterEfficiency",
                    "must be within (0, 1]",
                )?;
                check(
                    p.charger_current.is_finite() && p.charger_current >= 0.0,
                    "deviceParams.chargerCurrent",
                    "must be a finite, non-negative number",
                )?;
                check(
                    p.load_w.is_finite() && p.load_w >= 0.0,
                    "deviceParams.loadW",
                    "must be a finite, non-negative number",
                )?;
                check(
                    (0.0..=100.0).contains(&p.initial_soc),
                    "deviceParams.initialSoc",
                    "must be within [0, 100]",
                )?;
            }
        }

        Ok(())
    }

    /// A copy with every unusable value replaced by its fallback.
    ///
    /// Each replacement is logged at debug level; the engine runs this on
    /// every tick. The result always passes the engine's numeric
    /// preconditions, so a bad edit can never stop the tick loop.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();

        if !c.source_voltage.is_finite() {
            fallback("sourceVoltage", c.source_voltage, 0.0);
            c.source_voltage = 0.0;
        }
        if !c.series_resistance.is_finite() {
            fallback("seriesResistance", c.series_resistance, FALLBACK_SERIES_RESISTANCE);
            c.series_resistance = FALLBACK_SERIES_RESISTANCE;
        }
        c.series_resistance = c.series_resistance.max(MIN_SERIES_RESISTANCE);

        if !(c.timestep_ms.is_finite() && c.timestep_ms > 0.0) {
            fallback("timestepMs", c.timestep_ms, FALLBACK_TIMESTEP_MS);
            c.timestep_ms = FALLBACK_TIMESTEP_MS;
        }
        if !(c.time_scale.is_finite() && c.time_scale >= 0.0) {
            fallback("timeScale", c.time_scale, 1.0);
            c.time_scale = 1.0;
        }
        if c.sweep_range.steps < MIN_SWEEP_STEPS {
            fallback("sweepRange.steps", c.sweep_range.steps as f64, MIN_SWEEP_STEPS as f64);
            c.sweep_range.steps = MIN_SWEEP_STEPS;
        }
        if c.sweep_range.steps > MAX_SWEEP_STEPS {
            fallback("sweepRange.steps", c.sweep_range.steps as f64, MAX_SWEEP_STEPS as f64);
            c.sweep_range.steps = MAX_SWEEP_STEPS;
        }
        if !(c.sweep_range.from.is_finite() && c.sweep_range.to.is_finite()) {
            let default = SimulationConfig::for_kind(c.device_kind).sweep_range;
            debug!(
                from = c.sweep_range.from,
                to = c.sweep_range.to,
                "non-finite sweep bounds, using panel defaults"
            );
            c.sweep_range = default;
        }

        if !c.device_params.matches(c.device_kind) {
            debug!(kind = %c.device_kind, "parameter record does not match device kind, using defaults");
            c.device_params = DeviceParams::for_kind(c.device_kind);
        }

        match &mut c.device_params {
            DeviceParams::Diode(p) => {
                let default = DiodeParams::default();
                if !(p.saturation_current.is_finite() && p.saturation_current > 0.0) {
                    fallback("saturationCurrent", p.saturation_current, default.saturation_current);
                    p.saturation_current = default.saturation_current;
                }
                if !(p.ideality.is_finite() && p.ideality >= 1.0) {
                    fallback("ideality", p.ideality, default.ideality);
                    p.ideality = default.ideality;
                }
            }
            DeviceParams::Bjt(p) => {
                let default = BjtParams::default();
                if p.base_currents.is_empty() || p.base_currents.iter().any(|ib| !ib.is_finite()) {
                    debug!("unusable base current list, using defaults");
                    p.base_currents = BjtParams::default_base_currents();
                }
                if !(p.beta.is_finite() && p.beta > 0.0) {
                    fallback("beta", p.beta, default.beta);
                    p.beta = default.beta;
                }
                if !(p.knee_voltage.is_finite() && p.knee_voltage > 0.0) {
                    fallback("kneeVoltage", p.knee_voltage, default.knee_voltage);
                    p.knee_voltage = default.knee_voltage;
                }
            }
            DeviceParams::Mosfet(p) => {
                let default = MosfetParams::default();
                if p.gate_voltages.is_empty() || p.gate_voltages.iter().any(|v| !v.is_finite()) {
                    debug!("unusable gate voltage list, using defaults");
                    p.gate_voltages = MosfetParams::default_gate_voltages();
                }
                if !(p.k.is_finite() && p.k > 0.0) {
                    fallback("k", p.k, default.k);
                    p.k = default.k;
                }
                if !p.threshold.is_finite() {
                    fallback("threshold", p.threshold, default.threshold);
                    p.threshold = default.threshold;
                }
            }
            DeviceParams::Instrument(p) => {
                if !p.calibration.gain.is_finite() {
                    fallback("calibration.gain", p.calibration.gain, 1.0);
                    p.calibration.gain = 1.0;
                }
                if !p.calibration.offset.is_finite() {
                    fallback("calibration.offset", p.calibration.offset, 0.0);
                    p.calibration.offset = 0.0;
                }
                if !(p.frequency_hz.is_finite() && p.frequency_hz >= 0.0) {
                    fallback("frequencyHz", p.frequency_hz, 1.0);
                    p.frequency_hz = 1.0;
                }
                if !p.dc_offset.is_finite() {
                    fallback("dcOffset", p.dc_offset, 0.0);
                    p.dc_offset = 0.0;
                }
                if matches!(p.manual_override, Some(v) if !v.is_finite()) {
                    debug!("non-finite manual override ignored");
                    p.manual_override = None;
                }
            }
            DeviceParams::Appliances(p) => {
                for appliance in &mut p.appliances {
                    if !(appliance.power_w.is_finite() && appliance.power_w >= 0.0) {
                        fallback("appliance.powerW", appliance.power_w, 0.0);
                        appliance.power_w = 0.0;
                    }
                    if !(appliance.standby_w.is_finite() && appliance.standby_w >= 0.0) {
                        appliance.standby_w = 0.0;
                    }
                }
            }
            DeviceParams::Battery(p) => {
                if !(p.nominal_voltage.is_finite() && p.nominal_voltage > 0.0) {
                    let default = BatteryParams::default().nominal_voltage;
                    fallback("nominalVoltage", p.nominal_voltage, default);
                    p.nominal_voltage = default;
                }
                if !(p.capacity_ah.is_finite() && p.capacity_ah > 0.0) {
                    fallback("capacityAh", p.capacity_ah, FALLBACK_CAPACITY_AH);
                    p.capacity_ah = FALLBACK_CAPACITY_AH;
                }
                if !(p.inverter_efficiency > 0.0 && p.inverter_efficiency <= 1.0) {
                    fallback("inverterEfficiency", p.inverter_efficiency, FALLBACK_INVERTER_EFFICIENCY);
                    p.inverter_efficiency = FALLBACK_INVERTER_EFFICIENCY;
                }
                if !(p.charger_current.is_finite() && p.charger_current >= 0.0) {
                    fallback("chargerCurrent", p.charger_current, 0.0);
                    p.charger_current = 0.0;
                }
                if !(p.load_w.is_finite() && p.load_w >= 0.0) {
                    fallback("loadW", p.load_w, 0.0);
                    p.load_w = 0.0;
                }
                if !p.initial_soc.is_finite() {
                    fallback("initialSoc", p.initial_soc, 80.0);
                    p.initial_soc = 80.0;
                }
                p.initial_soc = p.initial_soc.clamp(0.0, 100.0);
                p.series_cells = p.series_cells.max(1);
                p.parallel_cells = p.parallel_cells.max(1);
            }
        }

        c
    }
}

fn fallback(field: &str, value: f64, replacement: f64) {
    debug!(field, value, replacement, "invalid config value replaced");
}

/// Recursively overlay `overlay` onto `base`. Objects merge key by key;
/// everything else is replaced.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
