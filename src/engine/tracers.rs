//! Curve tracers for the three semiconductor devices.
//!
//! Each tracer solves the device in the series loop once per tick. The
//! previous tick's terminal voltage seeds the next solve, so a slow sweep
//! stays on the curve without a cold start every tick.

use crate::config::{DeviceKind, DeviceParams, SimulationConfig};
use crate::devices::{BjtCurve, BjtParams, DiodeParams, MosfetCurve, MosfetParams};
use crate::drive::Drive;
use crate::sample::Auxiliary;
use crate::solver::{LoopCircuit, NewtonRaphson, OperatingPoint};

use super::model::{Reading, SimulationModel, TickContext};

/// Solve with `solver` and move the warm seed only when the result is usable.
fn solve_warm<D: crate::devices::DeviceModel>(
    solver: &NewtonRaphson,
    seed: &mut f64,
    config: &SimulationConfig,
    drive: Drive,
    device: &D,
) -> OperatingPoint {
    let circuit = LoopCircuit::new(drive.value, config.series_resistance);
    let op = solver.solve(&circuit, device, *seed);
    if op.is_finite() {
        *seed = op.voltage;
    }
    op
}

/// Diode in series with the source resistor.
#[derive(Debug, Clone)]
pub struct DiodeTracer {
    solver: NewtonRaphson,
    seed: f64,
}

impl Default for DiodeTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiodeTracer {
    pub fn new() -> Self {
        Self {
            solver: NewtonRaphson::diode(),
            seed: 0.0,
        }
    }

    /// Junction voltage the next solve starts from.
    pub fn seed(&self) -> f64 {
        self.seed
    }
}

impl SimulationModel for DiodeTracer {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Diode
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, _ctx: &TickContext) -> Reading {
        let fallback;
        let params = match &config.device_params {
            DeviceParams::Diode(p) => p,
            _ => {
                fallback = DiodeParams::default();
                &fallback
            }
        };

        let op = solve_warm(&self.solver, &mut self.seed, config, drive, params);
        Reading {
            measured_current: op.current,
            aux: Auxiliary::Diode {
                junction_voltage: op.voltage,
                iterations: op.iterations,
                converged: op.converged,
            },
        }
    }

    fn reset(&mut self, _config: &SimulationConfig) {
        self.seed = 0.0;
    }
}

/// Bipolar transistor output curves, one base current at a time.
#[derive(Debug, Clone)]
pub struct BjtTracer {
    solver: NewtonRaphson,
    seed: f64,
}

impl Default for BjtTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl BjtTracer {
    pub fn new() -> Self {
        Self {
            solver: NewtonRaphson::bjt(),
            seed: 0.0,
        }
    }

    /// Collector voltage the next solve starts from.
    pub fn seed(&self) -> f64 {
        self.seed
    }

    fn curve(config: &SimulationConfig, index: usize) -> BjtCurve {
        match &config.device_params {
            DeviceParams::Bjt(p) => p.curve(index),
            _ => BjtParams::default().curve(index),
        }
    }
}

impl SimulationModel for BjtTracer {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Bjt
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, _ctx: &TickContext) -> Reading {
        let curve = Self::curve(config, drive.curve);
        let op = solve_warm(&self.solver, &mut self.seed, config, drive, &curve);
        Reading {
            measured_current: op.current,
            aux: Auxiliary::Bjt {
                vce: op.voltage,
                base_current: curve.base_current,
                curve: drive.curve,
                converged: op.converged,
            },
        }
    }

    fn reset(&mut self, _config: &SimulationConfig) {
        self.seed = 0.0;
    }
}

/// MOSFET output curves, one gate voltage at a time.
#[derive(Debug, Clone)]
pub struct MosfetTracer {
    solver: NewtonRaphson,
    seed: f64,
}

impl Default for MosfetTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl MosfetTracer {
    pub fn new() -> Self {
        Self {
            solver: NewtonRaphson::mosfet(),
            seed: 0.0,
        }
    }

    fn curve(config: &SimulationConfig, index: usize) -> MosfetCurve {
        match &config.device_params {
            DeviceParams::Mosfet(p) => p.curve(index),
            _ => MosfetParams::default().curve(index),
        }
    }
}

impl SimulationModel for MosfetTracer {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Mosfet
    }

    fn step(&mut self, config: &SimulationConfig, drive: Drive, _ctx: &TickContext) -> Reading {
        let curve = Self::curve(config, drive.curve);
        let op = solve_warm(&self.solver, &mut self.seed, config, drive, &curve);
        Reading {
            measured_current: op.current,
            aux: Auxiliary::Mosfet {
                vds: op.voltage,
                vgs: curve.vgs,
                region: curve.region(op.voltage),
                curve: drive.curve,
                converged: op.converged,
            },
        }
    }

    fn reset(&mut self, _config: &SimulationConfig) {
        self.seed = 0.0;
    }
}
