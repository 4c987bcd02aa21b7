//! Sweep/drive generator.
//!
//! Produces the excitation applied on each accepted tick:
//! - Fixed mode: the configured constant every tick
//! - Sweep mode: a triangular (ping-pong) walk over the sweep points,
//!   moving one point every `throttle` ticks and reversing at either end
//!
//! It also picks which family curve (BJT base current, MOSFET gate voltage)
//! is on display, so the solver stays a pure function of its inputs.
//!
//! The sweep position is simulation state. It survives config edits and
//! restarts only when the sweep range (or the drive mode) changes.

use tracing::debug;

use crate::config::{DriveMode, SimulationConfig, SweepRange};

/// Ticks per sweep point.
pub const SWEEP_THROTTLE: u32 = 2;

/// Ticks each family curve stays on display in fixed mode.
pub const FIXED_CURVE_DWELL_TICKS: u64 = 25;

/// Direction the sweep is currently moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Excitation for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drive {
    /// Applied excitation (source voltage, or load power for batteries)
    pub value: f64,
    /// Active family curve
    pub curve: usize,
}

/// Stateful excitation generator.
#[derive(Debug, Clone)]
pub struct DriveGenerator {
    /// Current sweep point
    index: usize,
    direction: Direction,
    /// Ticks since the last restart
    ticks: u64,
    /// Ticks per sweep point
    throttle: u32,
    /// Sweep the position belongs to; `None` in fixed mode
    active_range: Option<SweepRange>,
}

impl Default for DriveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveGenerator {
    /// Create a generator with the standard throttle.
    pub fn new() -> Self {
        Self::with_throttle(SWEEP_THROTTLE)
    }

    /// Create a generator that moves one sweep point every `throttle` ticks.
    pub fn with_throttle(throttle: u32) -> Self {
        Self {
            index: 0,
            direction: Direction::Up,
            ticks: 0,
            throttle: throttle.max(1),
            active_range: None,
        }
    }

    /// Current sweep point.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current sweep direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Restart from the bottom of the sweep.
    pub fn reset(&mut self) {
        self.index = 0;
        self.direction = Direction::Up;
        self.ticks = 0;
    }

    /// Produce the excitation for the next tick.
    pub fn next(&mut self, config: &SimulationConfig) -> Drive {
        let range = match config.mode {
            DriveMode::Fixed => None,
            DriveMode::Sweep => Some(config.sweep_range),
        };
        if range != self.active_range {
            debug!(?range, "sweep range changed, restarting sweep");
            self.reset();
            self.active_range = range;
        }

        let curves = config.curve_count().max(1) as u64;

        match range {
            None => {
                let curve = (self.ticks / FIXED_CURVE_DWELL_TICKS) % curves;
                self.ticks += 1;
                Drive {
                    value: config.fixed_excitation(),
                    curve: curve as usize,
                }
            }
            Some(range) => {
                // One family curve per full up-and-down pass
                let cycle = (range.steps.saturating_sub(1) as u64)
                    .saturating_mul(2)
                    .saturating_mul(self.throttle as u64)
                    .max(1);
                let curve = (self.ticks / cycle) % curves;
                let value = range.value_at(self.index);

                self.ticks += 1;
                if self.ticks % self.throttle as u64 == 0 {
                    self.advance(range.steps);
                }

                Drive {
                    value,
                    curve: curve as usize,
                }
            }
        }
    }

    /// Move one sweep point, bouncing off either end.
    fn advance(&mut self, steps: usize) {
        if steps < 2 {
            self.index = 0;
            return;
        }
        let last = steps - 1;
        match self.direction {
            Direction::Up => {
                self.index = (self.index + 1).min(last);
                if self.index == last {
                    self.direction = Direction::Down;
                }
            }
            Direction::Down => {
                self.index = self.index.saturating_sub(1);
                if self.index == 0 {
                    self.direction = Direction::Up;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceKind;

    fn sweep_config(from: f64, to: f64, steps: usize) -> SimulationConfig {
        SimulationConfig::for_kind(DeviceKind::Diode).with_sweep(from, to, steps)
    }

    #[test]
    fn test_fixed_mode_repeats_excitation() {
        let config = SimulationConfig::for_kind(DeviceKind::Diode).with_source_voltage(3.3);
        let mut gen = DriveGenerator::new();
        for _ in 0..10 {
            let drive = gen.next(&config);
            assert_eq!(drive.value, 3.3);
            assert_eq!(drive.curve, 0);
        }
    }

    #[test]
    fn test_sweep_reverses_at_bounds() {
        let config = sweep_config(0.0, 5.0, 10);
        let mut gen = DriveGenerator::new();

        // Two ticks per point: 10 points up, then 9 back down to the start
        let values: Vec<f64> = (0..38).map(|_| gen.next(&config).value).collect();

        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[18], 5.0);
        assert_eq!(values[19], 5.0);
        assert_eq!(values[36], 0.0);
        assert_eq!(values[37], 0.0);
        assert!(values.iter().all(|v| (0.0..=5.0).contains(v)));

        let peak = values.iter().position(|v| *v == 5.0).unwrap();
        assert!(values[..=peak].windows(2).all(|w| w[1] >= w[0]));
        assert!(values[peak..].windows(2).all(|w| w[1] <= w[0]));

        // And back up again, not a sawtooth jump
        assert!(gen.next(&config).value > 0.0);
        assert_eq!(gen.direction(), Direction::Up);
    }

    #[test]
    fn test_descending_range() {
        let config = sweep_config(5.0, 1.0, 5);
        let mut gen = DriveGenerator::with_throttle(1);
        let values: Vec<f64> = (0..9).map(|_| gen.next(&config).value).collect();
        assert_eq!(values, vec![5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_range_change_restarts_sweep() {
        let mut gen = DriveGenerator::new();
        let config = sweep_config(0.0, 5.0, 10);
        for _ in 0..7 {
            gen.next(&config);
        }
        assert!(gen.index() > 0);

        // Editing an unrelated field keeps the position
        let edited = config.clone().with_series_resistance(2200.0);
        gen.next(&edited);
        assert!(gen.index() > 0);

        let moved = sweep_config(0.0, 3.0, 10);
        assert_eq!(gen.next(&moved).value, 0.0);
        assert_eq!(gen.direction(), Direction::Up);
    }

    #[test]
    fn test_family_curve_advances_per_sweep_cycle() {
        let config = SimulationConfig::for_kind(DeviceKind::Bjt).with_sweep(0.0, 5.0, 10);
        let mut gen = DriveGenerator::new();
        let curves: Vec<usize> = (0..36 * 5).map(|_| gen.next(&config).curve).collect();

        assert!(curves[..36].iter().all(|c| *c == 0));
        assert!(curves[36..72].iter().all(|c| *c == 1));
        assert_eq!(curves[36 * 3], 3);
        assert_eq!(curves[36 * 4], 0);
    }

    #[test]
    fn test_unsanitized_huge_sweep_does_not_overflow() {
        let config = SimulationConfig::for_kind(DeviceKind::Bjt).with_sweep(0.0, 5.0, usize::MAX / 2 + 10);
        let mut gen = DriveGenerator::new();

        let first = gen.next(&config);
        assert_eq!(first.value, 0.0);
        assert_eq!(first.curve, 0);
        for _ in 0..10 {
            let drive = gen.next(&config);
            assert!(drive.value.is_finite() && drive.value >= 0.0);
            assert_eq!(drive.curve, 0);
        }
    }

    #[test]
    fn test_family_curve_dwells_in_fixed_mode() {
        let config = SimulationConfig::for_kind(DeviceKind::Mosfet).with_fixed();
        let mut gen = DriveGenerator::new();
        let curves: Vec<usize> = (0..60).map(|_| gen.next(&config).curve).collect();
        assert_eq!(curves[24], 0);
        assert_eq!(curves[25], 1);
        assert_eq!(curves[50], 2);
    }
}
