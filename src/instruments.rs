//! Instrument-calibration signal model.
//!
//! Covers the multimeter, oscilloscope and function-generator panels. A
//! generated signal (or a manual override entered by the user) is passed
//! through a linear calibration:
//!
//! ```text
//! corrected = raw · gain + offset
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::DeviceKind;

/// Signal waveform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Waveform {
    /// Constant level
    #[default]
    Dc,
    Sine,
    Square,
    Triangle,
    /// Rising ramp
    Sawtooth,
}

impl Waveform {
    /// Unit-amplitude value at `phase` (in cycles), within [-1, 1].
    pub fn sample(&self, phase: f64) -> f64 {
        let phase = phase.rem_euclid(1.0);
        match self {
            Waveform::Dc => 1.0,
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                // -1 → 1 over the first half, back to -1 over the second
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Linear calibration applied to every raw reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Calibration {
    pub gain: f64,
    pub offset: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
        }
    }
}

impl Calibration {
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.gain + self.offset
    }
}

/// Parameters for the calibration panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentParams {
    pub waveform: Waveform,
    /// Signal frequency (Hz)
    pub frequency_hz: f64,
    /// DC level added to the generated signal (V)
    pub dc_offset: f64,
    pub calibration: Calibration,
    /// When present, replaces the generated signal entirely
    pub manual_override: Option<f64>,
}

impl Default for InstrumentParams {
    fn default() -> Self {
        Self::for_kind(DeviceKind::Multimeter)
    }
}

impl InstrumentParams {
    /// Panel defaults: DC for the multimeter, 1 Hz sine on the scope and a
    /// 0.5 Hz square wave from the generator.
    pub fn for_kind(kind: DeviceKind) -> Self {
        let (waveform, frequency_hz) = match kind {
            DeviceKind::Oscilloscope => (Waveform::Sine, 1.0),
            DeviceKind::FunctionGenerator => (Waveform::Square, 0.5),
            _ => (Waveform::Dc, 0.0),
        };
        Self {
            waveform,
            frequency_hz,
            dc_offset: 0.0,
            calibration: Calibration::default(),
            manual_override: None,
        }
    }

    /// Generated signal at `elapsed_s` for the given amplitude.
    pub fn generate(&self, amplitude: f64, elapsed_s: f64) -> f64 {
        amplitude * self.waveform.sample(self.frequency_hz * elapsed_s) + self.dc_offset
    }

    /// Take one reading.
    pub fn read(&self, amplitude: f64, elapsed_s: f64) -> InstrumentReading {
        let (raw, overridden) = match self.manual_override {
            Some(value) => (value, true),
            None => (self.generate(amplitude, elapsed_s), false),
        };
        InstrumentReading {
            raw,
            corrected: self.calibration.apply(raw),
            overridden,
        }
    }
}

/// One calibrated reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentReading {
    pub raw: f64,
    pub corrected: f64,
    pub overridden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_waveforms_at_quarter_points() {
        assert_abs_diff_eq!(Waveform::Sine.sample(0.25), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(Waveform::Sine.sample(0.75), -1.0, epsilon = 1e-12);
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.6), -1.0);
        assert_abs_diff_eq!(Waveform::Triangle.sample(0.0), -1.0);
        assert_abs_diff_eq!(Waveform::Triangle.sample(0.5), 1.0);
        assert_abs_diff_eq!(Waveform::Sawtooth.sample(0.75), 0.5);
        assert_eq!(Waveform::Dc.sample(0.9), 1.0);
    }

    #[test]
    fn test_calibration_applies_gain_then_offset() {
        let params = InstrumentParams {
            calibration: Calibration {
                gain: 1.02,
                offset: -0.05,
            },
            ..InstrumentParams::for_kind(DeviceKind::Multimeter)
        };
        let reading = params.read(5.0, 0.0);
        assert!(!reading.overridden);
        assert_abs_diff_eq!(reading.raw, 5.0);
        assert_abs_diff_eq!(reading.corrected, 5.05, epsilon = 1e-12);
    }

    #[test]
    fn test_manual_override_bypasses_signal() {
        let params = InstrumentParams {
            manual_override: Some(3.3),
            calibration: Calibration {
                gain: 2.0,
                offset: 0.1,
            },
            ..InstrumentParams::for_kind(DeviceKind::Oscilloscope)
        };
        let reading = params.read(100.0, 0.37);
        assert!(reading.overridden);
        assert_eq!(reading.raw, 3.3);
        assert_abs_diff_eq!(reading.corrected, 6.7, epsilon = 1e-12);
    }
}
