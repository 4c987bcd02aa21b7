//! The generic simulation engine.
//!
//! [`SimulationEngine`] owns everything that persists between ticks: the
//! model's own state, the frame scheduler, the drive generator and the
//! history buffer. The host calls [`SimulationEngine::tick`] once per frame
//! with the current config and clock; the engine decides whether the frame
//! is a tick, computes it and records the sample.
//!
//! ## Tick pipeline
//!
//! 1. Throttle: skip unless `timestepMs` has passed (or while paused)
//! 2. Sanitize the config, rebuilding the model if `deviceKind` changed
//! 3. Drive generator produces the excitation and family curve
//! 4. Model computes the reading over the elapsed (scaled) time
//! 5. Non-finite readings are replaced by the last good sample
//! 6. Append to history

mod model;
mod scheduler;
mod systems;
mod tracers;

pub use model::{AnyModel, Reading, SimulationModel, TickContext};
pub use scheduler::{FrameHandle, FrameScheduler};
pub use systems::{ApplianceModel, BatteryModel, InstrumentModel};
pub use tracers::{BjtTracer, DiodeTracer, MosfetTracer};

use tracing::{debug, info, warn};

use crate::config::{SimulationConfig, FALLBACK_TIMESTEP_MS};
use crate::drive::DriveGenerator;
use crate::history::HistoryBuffer;
use crate::sample::SimulationSample;

/// One running simulation.
pub struct SimulationEngine<M: SimulationModel> {
    model: M,
    scheduler: FrameScheduler,
    drive: DriveGenerator,
    history: HistoryBuffer,
    /// Index the next sample will carry
    next_index: u64,
    /// Simulated seconds since the model was (re)started
    elapsed_s: f64,
    /// Whether the last accepted tick had to repair its config
    config_repaired: bool,
}

impl SimulationEngine<AnyModel> {
    /// Build an engine with the model `config.device_kind` selects.
    pub fn for_config(config: &SimulationConfig) -> Self {
        let clean = config.sanitized();
        Self::new(AnyModel::for_config(&clean), &clean)
    }
}

impl<M: SimulationModel> SimulationEngine<M> {
    /// Create a running engine around `model`.
    pub fn new(model: M, config: &SimulationConfig) -> Self {
        let capacity = config.history_capacity();
        info!(kind = %model.kind(), capacity, "simulation created");
        Self {
            model,
            scheduler: FrameScheduler::new(),
            drive: DriveGenerator::new(),
            history: HistoryBuffer::new(capacity),
            next_index: 1,
            elapsed_s: 0.0,
            config_repaired: false,
        }
    }

    /// Offer a frame at host time `now_ms`.
    ///
    /// Returns the new sample when the frame was accepted as a tick.
    pub fn tick(&mut self, config: &SimulationConfig, now_ms: f64) -> Option<&SimulationSample> {
        let interval = if config.timestep_ms.is_finite() && config.timestep_ms > 0.0 {
            config.timestep_ms
        } else {
            FALLBACK_TIMESTEP_MS
        };
        let dt_ms = self.scheduler.poll(now_ms, interval)?;

        let clean = config.sanitized();
        let repaired = clean != *config;
        if repaired && !self.config_repaired {
            warn!(kind = %clean.device_kind, "config has unusable values, running with fallbacks");
        }
        self.config_repaired = repaired;
        let config = clean;

        if config.device_kind != self.model.kind() {
            if !self.model.retarget(&config) {
                warn!(
                    model = %self.model.kind(),
                    requested = %config.device_kind,
                    "model cannot simulate requested kind, tick skipped"
                );
                return None;
            }
            debug!(kind = %config.device_kind, "device kind changed, model rebuilt");
            self.restart(&config);
        }

        let capacity = config.history_capacity();
        if capacity != self.history.capacity() {
            self.history.set_capacity(capacity);
        }

        let drive = self.drive.next(&config);
        let dt_s = dt_ms / 1000.0 * config.time_scale;
        self.elapsed_s += dt_s;
        let ctx = TickContext {
            index: self.next_index,
            dt_s,
            elapsed_s: self.elapsed_s,
            now_ms,
        };

        let reading = self.model.step(&config, drive, &ctx);

        let sample = if reading.is_finite() && drive.value.is_finite() {
            SimulationSample {
                index: ctx.index,
                device_kind: config.device_kind,
                drive_value: drive.value,
                measured_current: reading.measured_current,
                aux: reading.aux,
                timestamp_ms: now_ms,
            }
        } else {
            let Some(good) = self.history.latest() else {
                warn!(index = ctx.index, "non-finite reading with no prior sample, tick dropped");
                return None;
            };
            warn!(index = ctx.index, "non-finite reading replaced by last good sample");
            SimulationSample {
                index: ctx.index,
                timestamp_ms: now_ms,
                ..good.clone()
            }
        };

        if let Err(e) = self.history.append(sample) {
            // Indices are only ever handed out here, so this cannot happen
            warn!(error = %e, "sample rejected by history");
            return None;
        }
        self.next_index += 1;
        self.history.latest()
    }

    /// Pause or resume at host time `now_ms`. While paused no state changes.
    pub fn set_running(&mut self, running: bool, now_ms: f64) {
        if running {
            self.scheduler.resume(now_ms);
        } else {
            self.scheduler.pause();
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Explicit user reset: clear history and return the model, sweep and
    /// clock to their starting state. Sample indices keep counting.
    pub fn reset(&mut self, config: &SimulationConfig) {
        let config = config.sanitized();
        if config.device_kind != self.model.kind() && !self.model.retarget(&config) {
            warn!(requested = %config.device_kind, "model cannot simulate requested kind");
        }
        self.restart(&config);
        self.history.set_capacity(config.history_capacity());
        self.scheduler.restart();
        info!(kind = %self.model.kind(), "simulation reset");
    }

    fn restart(&mut self, config: &SimulationConfig) {
        self.model.reset(config);
        self.drive.reset();
        self.history.clear();
        self.elapsed_s = 0.0;
    }

    /// Hand the engine the host's frame registration so disposal releases it.
    pub fn attach_frame_handle(&mut self, handle: Box<dyn FrameHandle>) {
        self.scheduler.attach(handle);
    }

    /// Release the frame registration and drop all simulation state.
    pub fn dispose(mut self) {
        self.scheduler.dispose();
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Ordered copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<SimulationSample> {
        self.history.snapshot()
    }

    pub fn latest(&self) -> Option<&SimulationSample> {
        self.history.latest()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Simulated seconds since the last restart.
    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceKind, DeviceParams};
    use crate::devices::DiodeParams;
    use crate::drive::Drive;
    use crate::sample::Auxiliary;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Fails every `nth` tick with NaN.
    struct Flaky {
        ticks: u64,
        nth: u64,
    }

    impl SimulationModel for Flaky {
        fn kind(&self) -> DeviceKind {
            DeviceKind::Multimeter
        }

        fn step(&mut self, _config: &SimulationConfig, drive: Drive, _ctx: &TickContext) -> Reading {
            self.ticks += 1;
            let raw = if self.ticks % self.nth == 0 { f64::NAN } else { drive.value };
            Reading {
                measured_current: raw,
                aux: Auxiliary::Instrument {
                    raw,
                    corrected: raw,
                    overridden: false,
                },
            }
        }

        fn reset(&mut self, _config: &SimulationConfig) {
            self.ticks = 0;
        }
    }

    struct Handle(Rc<Cell<bool>>);

    impl FrameHandle for Handle {
        fn cancel(&mut self) -> crate::error::Result<()> {
            self.0.set(true);
            Ok(())
        }
    }

    fn run_frames(engine: &mut SimulationEngine<AnyModel>, config: &SimulationConfig, frames: usize) {
        for frame in 0..frames {
            engine.tick(config, frame as f64 * 16.0);
        }
    }

    #[test]
    fn test_throttled_ticks_produce_sequential_indices() {
        let config = SimulationConfig::for_kind(DeviceKind::Diode).with_timestep_ms(100.0);
        let mut engine = SimulationEngine::for_config(&config);

        // 16 ms frames for one second: ticks at 0, 112, 224, ...
        run_frames(&mut engine, &config, 63);
        let indices: Vec<u64> = engine.history().iter().map(|s| s.index).collect();
        assert_eq!(indices, (1..=9).collect::<Vec<_>>());
        assert!(engine.history().iter().all(|s| s.device_kind == DeviceKind::Diode));
    }

    #[test]
    fn test_non_finite_reading_reuses_last_good_sample() {
        let config = SimulationConfig::for_kind(DeviceKind::Multimeter);
        let mut engine = SimulationEngine::new(Flaky { ticks: 0, nth: 3 }, &config);

        for i in 0..6 {
            engine.tick(&config, i as f64 * 1000.0);
        }

        let samples = engine.snapshot();
        assert_eq!(samples.len(), 6);
        assert!(samples.iter().all(|s| s.measured_current.is_finite() && s.aux.is_finite()));
        assert_eq!(samples[2].measured_current, samples[1].measured_current);
        assert_eq!(samples[2].index, 3);
        assert_eq!(samples[2].timestamp_ms, 2000.0);
    }

    #[test]
    fn test_non_finite_first_reading_is_dropped() {
        let config = SimulationConfig::for_kind(DeviceKind::Multimeter);
        let mut engine = SimulationEngine::new(Flaky { ticks: 0, nth: 1 }, &config);
        assert!(engine.tick(&config, 0.0).is_none());
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_invalid_config_does_not_stop_ticks() {
        let good = SimulationConfig::for_kind(DeviceKind::Diode);
        let bad = good
            .clone()
            .with_series_resistance(f64::NAN)
            .with_params(DeviceParams::Diode(DiodeParams::new(-1.0, 0.0)));
        let mut engine = SimulationEngine::for_config(&good);

        assert!(engine.tick(&good, 0.0).is_some());
        assert!(!engine.config_repaired);
        assert!(engine.tick(&bad, 1000.0).is_some());
        assert!(engine.config_repaired);
        assert!(engine.tick(&bad, 2000.0).is_some());
        assert!(engine.config_repaired);
        assert!(engine.tick(&good, 3000.0).is_some());
        assert!(!engine.config_repaired);
        assert!(engine.history().iter().all(|s| s.measured_current.is_finite()));
    }

    #[test]
    fn test_kind_change_rebuilds_model_and_clears_history() {
        let diode = SimulationConfig::for_kind(DeviceKind::Diode);
        let mut engine = SimulationEngine::for_config(&diode);
        engine.tick(&diode, 0.0);
        engine.tick(&diode, 100.0);

        let battery = SimulationConfig::for_kind(DeviceKind::BatteryPack);
        let sample = engine.tick(&battery, 200.0).cloned().unwrap();
        assert_eq!(sample.device_kind, DeviceKind::BatteryPack);
        assert_eq!(sample.index, 3);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history().capacity(), 1440);
        assert_eq!(engine.model().kind(), DeviceKind::BatteryPack);
    }

    #[test]
    fn test_time_scale_stretches_integration() {
        let config = SimulationConfig::for_kind(DeviceKind::ApplianceSet).with_time_scale(60.0);
        let mut engine = SimulationEngine::for_config(&config);
        engine.tick(&config, 0.0);
        engine.tick(&config, 100.0);
        assert_abs_diff_eq!(engine.elapsed_s(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_clears_history_but_not_indices() {
        let config = SimulationConfig::for_kind(DeviceKind::BatteryPack);
        let mut engine = SimulationEngine::for_config(&config);
        for i in 0..5 {
            engine.tick(&config, i as f64 * 100.0);
        }
        engine.reset(&config);
        assert!(engine.history().is_empty());
        assert_eq!(engine.elapsed_s(), 0.0);

        // The next frame is accepted straight away
        let sample = engine.tick(&config, 450.0).cloned().unwrap();
        assert_eq!(sample.index, 6);
        match sample.aux {
            Auxiliary::Battery { soc, .. } => assert!(soc < 80.0 && soc > 79.9),
            other => panic!("unexpected aux {other:?}"),
        }
    }

    #[test]
    fn test_paused_engine_is_frozen() {
        let config = SimulationConfig::for_kind(DeviceKind::Diode);
        let mut engine = SimulationEngine::for_config(&config);
        engine.tick(&config, 0.0);

        engine.set_running(false, 50.0);
        assert!(!engine.is_running());
        assert!(engine.tick(&config, 500.0).is_none());
        assert_eq!(engine.history().len(), 1);

        engine.set_running(true, 1000.0);
        assert!(engine.tick(&config, 1040.0).is_none());
        assert!(engine.tick(&config, 1080.0).is_some());
    }

    #[test]
    fn test_dispose_cancels_frame_handle() {
        let cancelled = Rc::new(Cell::new(false));
        let config = SimulationConfig::default();
        let mut engine = SimulationEngine::for_config(&config);
        engine.attach_frame_handle(Box::new(Handle(cancelled.clone())));
        engine.tick(&config, 0.0);

        engine.dispose();
        assert!(cancelled.get());
    }
}
