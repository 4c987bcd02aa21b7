//! WASM bindings for Voltlab Core.
//!
//! This module provides JavaScript-friendly bindings for driving a
//! simulation from a browser's animation-frame loop.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmSimulation } from 'voltlab_core';
//!
//! await init();
//!
//! const sim = new WasmSimulation('{"deviceKind": "diode", "sourceVoltage": 5}');
//!
//! let frame = requestAnimationFrame(function loop(now) {
//!   if (sim.tick(now)) {
//!     chart.update(JSON.parse(sim.latest_json()));
//!   }
//!   frame = requestAnimationFrame(loop);
//! });
//!
//! // Leaving the page
//! cancelAnimationFrame(frame);
//! sim.dispose();
//! ```

use wasm_bindgen::prelude::*;

use crate::config::{DeviceKind, SimulationConfig};
use crate::engine::{AnyModel, SimulationEngine};
use crate::error::VoltlabError;
use crate::export;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(e: VoltlabError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn disposed() -> VoltlabError {
    VoltlabError::WasmError {
        message: "simulation has been disposed".to_string(),
    }
}

/// WASM-compatible simulation instance.
///
/// Wraps a [`SimulationEngine`] together with the config it runs, since the
/// host hands config edits over as JSON rather than keeping a Rust value.
#[wasm_bindgen]
pub struct WasmSimulation {
    engine: Option<SimulationEngine<AnyModel>>,
    config: SimulationConfig,
}

#[wasm_bindgen]
impl WasmSimulation {
    /// Create a simulation from a JSON config.
    ///
    /// # Arguments
    /// * `config_json` - Config object; missing fields take the defaults of
    ///   its `deviceKind`. An empty string selects the diode defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSimulation, JsValue> {
        let config = if config_json.trim().is_empty() {
            SimulationConfig::default()
        } else {
            SimulationConfig::from_json(config_json).map_err(js_error)?
        };
        Ok(Self::from_config(config))
    }

    /// Create a simulation with the panel defaults for a device kind.
    ///
    /// # Example
    /// ```javascript
    /// const sim = WasmSimulation.for_kind('batteryPack');
    /// ```
    #[wasm_bindgen]
    pub fn for_kind(kind: &str) -> Result<WasmSimulation, JsValue> {
        let kind: DeviceKind = kind.parse().map_err(js_error)?;
        Ok(Self::from_config(SimulationConfig::for_kind(kind)))
    }

    /// Offer an animation frame. Returns `true` when it produced a sample.
    ///
    /// # Arguments
    /// * `now_ms` - The frame timestamp passed to the `requestAnimationFrame` callback
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> bool {
        match self.engine.as_mut() {
            Some(engine) => engine.tick(&self.config, now_ms).is_some(),
            None => false,
        }
    }

    /// Pause or resume.
    #[wasm_bindgen]
    pub fn set_running(&mut self, running: bool, now_ms: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_running(running, now_ms);
        }
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.engine.as_ref().map_or(false, |e| e.is_running())
    }

    /// Replace the config. Takes effect on the next tick.
    ///
    /// Values the engine cannot use are repaired on each tick rather than
    /// rejected here; only malformed JSON is an error.
    #[wasm_bindgen]
    pub fn set_config(&mut self, config_json: &str) -> Result<(), JsValue> {
        self.config = SimulationConfig::from_json(config_json).map_err(js_error)?;
        Ok(())
    }

    /// The config currently in effect, as JSON.
    #[wasm_bindgen]
    pub fn config_json(&self) -> Result<String, JsValue> {
        self.config.to_json().map_err(js_error)
    }

    /// Clear history and restart the model from its initial state.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reset(&self.config);
        }
    }

    /// Latest sample as JSON, or `undefined` before the first tick.
    #[wasm_bindgen]
    pub fn latest_json(&self) -> Option<String> {
        let sample = self.engine.as_ref()?.latest()?;
        serde_json::to_string(sample).ok()
    }

    /// Entire history as a JSON array, oldest first.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        let engine = self.engine.as_ref().ok_or_else(disposed).map_err(js_error)?;
        export::to_json(&engine.snapshot()).map_err(js_error)
    }

    /// Entire history as CSV, header first.
    #[wasm_bindgen]
    pub fn to_csv(&self) -> Result<String, JsValue> {
        let engine = self.engine.as_ref().ok_or_else(disposed).map_err(js_error)?;
        Ok(export::to_csv(engine.history().iter()))
    }

    /// Number of samples in history.
    #[wasm_bindgen(getter)]
    pub fn len(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.history().len())
    }

    /// Drop all simulation state. Later calls are no-ops or errors.
    #[wasm_bindgen]
    pub fn dispose(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.dispose();
        }
    }
}

impl WasmSimulation {
    fn from_config(config: SimulationConfig) -> Self {
        Self {
            engine: Some(SimulationEngine::for_config(&config)),
            config,
        }
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Names of every simulation variant, as accepted by `for_kind`.
#[wasm_bindgen]
pub fn device_kinds() -> Vec<String> {
    DeviceKind::ALL.iter().map(|k| k.as_str().to_string()).collect()
}
