//! # Voltlab Core
//!
//! A real-time simulation engine for interactive electronics and energy
//! panels.
//!
//! This library provides:
//! - Curve tracers for diodes, BJTs and MOSFETs in a series-resistor loop,
//!   solved with a damped Newton or relaxation iteration
//! - A battery pack integrator with chemistry-specific open-circuit curves
//! - An appliance bus model and calibration instruments (multimeter,
//!   oscilloscope, function generator)
//! - A frame-paced engine that throttles, pauses and records bounded history
//!
//! ## Architecture
//!
//! - [`devices`] - Pure current laws for the traced devices
//! - [`solver`] - Operating-point solver for the single-loop circuit
//! - [`energy`] - Battery and appliance models
//! - [`instruments`] - Signal generation and calibration
//! - [`drive`] - Fixed and ping-pong sweep excitation
//! - [`engine`] - Scheduler, model trait and the generic engine
//! - [`history`] - Bounded sample history
//! - [`export`] - CSV and JSON export
//! - [`config`] - Serializable configuration with validation and repair
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! voltlab --kind mosfet --sweep 0:10:60 --frames 600 --output mosfet.csv
//! ```
//!
//! ### Library
//!
//! ```
//! use voltlab_core::{DeviceKind, SimulationConfig, SimulationEngine};
//!
//! let config = SimulationConfig::for_kind(DeviceKind::Diode);
//! let mut engine = SimulationEngine::for_config(&config);
//!
//! // Call once per frame with the host clock in milliseconds
//! for frame in 0..60 {
//!     engine.tick(&config, frame as f64 * 16.0);
//! }
//! assert!(!engine.history().is_empty());
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmSimulation } from 'voltlab_core';
//!
//! const sim = new WasmSimulation('{"deviceKind": "batteryPack"}');
//! requestAnimationFrame(function frame(now) {
//!   sim.tick(now);
//!   requestAnimationFrame(frame);
//! });
//! ```

pub mod config;
pub mod devices;
pub mod drive;
pub mod energy;
pub mod engine;
pub mod error;
pub mod export;
pub mod history;
pub mod instruments;
pub mod sample;
pub mod solver;

// Re-export main types for convenience
pub use config::{DeviceKind, DeviceParams, DriveMode, SimulationConfig, SweepRange};
pub use engine::{AnyModel, FrameHandle, SimulationEngine, SimulationModel};
pub use error::{Result, VoltlabError};
pub use history::HistoryBuffer;
pub use sample::{Auxiliary, SimulationSample};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmSimulation;

/// Thermal voltage kT/q at 300 K (V)
pub const THERMAL_VOLTAGE: f64 = 0.025852;
