//! The seam between the generic engine and each simulation variant.

use crate::config::{DeviceKind, SimulationConfig};
use crate::drive::Drive;
use crate::sample::Auxiliary;

use super::systems::{ApplianceModel, BatteryModel, InstrumentModel};
use super::tracers::{BjtTracer, DiodeTracer, MosfetTracer};

/// Timing of the tick being computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Index the resulting sample will carry
    pub index: u64,
    /// Simulated seconds since the previous accepted tick
    pub dt_s: f64,
    /// Simulated seconds since the model was (re)started, including this tick
    pub elapsed_s: f64,
    /// Host clock (ms)
    pub now_ms: f64,
}

/// What a model reports for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub measured_current: f64,
    pub aux: Auxiliary,
}

impl Reading {
    pub fn is_finite(&self) -> bool {
        self.measured_current.is_finite() && self.aux.is_finite()
    }
}

/// A device or integration strategy driven by [`super::SimulationEngine`].
///
/// The engine hands every model an already sanitized config, so models may
/// assume finite parameters and a matching parameter record.
pub trait SimulationModel {
    /// The kind this model currently simulates.
    fn kind(&self) -> DeviceKind;

    /// Compute one tick. Models that carry state across ticks must leave it
    /// untouched when the result is not finite.
    fn step(&mut self, config: &SimulationConfig, drive: Drive, ctx: &TickContext) -> Reading;

    /// Return to the state a fresh model for `config` would have.
    fn reset(&mut self, config: &SimulationConfig);

    /// Switch to `config.device_kind`. Returns `false` when this model
    /// cannot simulate that kind.
    fn retarget(&mut self, config: &SimulationConfig) -> bool {
        config.device_kind == self.kind()
    }
}

/// Any of the built-in models, selectable at runtime.
#[derive(Debug, Clone)]
pub enum AnyModel {
    Diode(DiodeTracer),
    Bjt(BjtTracer),
    Mosfet(MosfetTracer),
    Instrument(InstrumentModel),
    Appliance(ApplianceModel),
    Battery(BatteryModel),
}

impl AnyModel {
    /// Build the model for `config.device_kind`.
    pub fn for_config(config: &SimulationConfig) -> Self {
        match config.device_kind {
            DeviceKind::Diode => AnyModel::Diode(DiodeTracer::new()),
            DeviceKind::Bjt => AnyModel::Bjt(BjtTracer::new()),
            DeviceKind::Mosfet => AnyModel::Mosfet(MosfetTracer::new()),
            kind @ (DeviceKind::Multimeter | DeviceKind::Oscilloscope | DeviceKind::FunctionGenerator) => {
                AnyModel::Instrument(InstrumentModel::new(kind))
            }
            DeviceKind::ApplianceSet => AnyModel::Appliance(ApplianceModel::new()),
            DeviceKind::BatteryPack => AnyModel::Battery(BatteryModel::new(config)),
        }
    }

    fn inner(&self) -> &dyn SimulationModel {
        match self {
            AnyModel::Diode(m) => m,
            AnyModel::Bjt(m) => m,
            AnyModel::Mosfet(m) => m,
            AnyModel::Instrument(m) => m,
            AnyModel::Appliance(m) => m,
            AnyModel::Battery(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SimulationModel {
        match self {
            AnyModel::Diode(m) => m,
            AnyModel::Bjt(m) => m,
            AnyModel::Mosfet(m) => m,
            AnyModel::Instrument(m) => m,
            AnyModel::Appliance(m) => m,
            AnyModel::Battery(m) => m,
        }
    }
}

impl SimulationModel for AnyModel {
    fn kind(&self) -> DeviceKind {
        self.inner().kind()
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, ctx: &TickContext) -> Reading {
        self.inner_mut().step(config, drive, ctx)
    }

    fn reset(&mut self, config: &SimulationConfig) {
        self.inner_mut().reset(config)
    }

    fn retarget(&mut self, config: &SimulationConfig) -> bool {
        if config.device_kind != self.kind() {
            *self = AnyModel::for_config(config);
        }
        true
    }
}
