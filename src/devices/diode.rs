//! Diode model.
//!
//! Uses the Shockley diode equation:
//!   I = Is * (exp(V / (n * Vt)) - 1)
//!
//! The exponent argument is clamped to [-40, 40] before evaluation so that
//! steep forward bias never overflows. The clamp is a numerical policy, not
//! a physical effect, and reference traces depend on it being exactly 40.

use serde::{Deserialize, Serialize};

use super::DeviceModel;
use crate::THERMAL_VOLTAGE;

/// Bound applied to `V / (n * Vt)` before exponentiation.
pub const EXP_ARG_LIMIT: f64 = 40.0;

/// Parameters for a diode model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiodeParams {
    /// Saturation current (Is), typically 1e-14 to 1e-12 A
    pub saturation_current: f64,
    /// Ideality factor (n), typically 1.0 to 2.0
    pub ideality: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self {
            saturation_current: 1e-12,
            ideality: 1.0,
        }
    }
}

impl DiodeParams {
    /// Create parameters with the given saturation current and ideality.
    pub fn new(saturation_current: f64, ideality: f64) -> Self {
        Self {
            saturation_current,
            ideality,
        }
    }

    /// Create parameters for a germanium diode (lower forward voltage).
    pub fn germanium() -> Self {
        Self::new(1e-9, 1.5)
    }

    /// Create parameters for a red LED.
    pub fn led() -> Self {
        Self::new(1e-18, 2.0)
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.ideality * THERMAL_VOLTAGE
    }

    /// The clamped exponent argument for a junction voltage.
    fn exp_arg(&self, v: f64) -> f64 {
        (v / self.n_vt()).clamp(-EXP_ARG_LIMIT, EXP_ARG_LIMIT)
    }
}

impl DeviceModel for DiodeParams {
    fn current(&self, v: f64) -> f64 {
        self.saturation_current * (self.exp_arg(v).exp() - 1.0)
    }

    /// dI/dV = Is/(n*Vt) * exp(V/(n*Vt)), evaluated at the clamped argument.
    fn slope(&self, v: f64) -> f64 {
        self.saturation_current / self.n_vt() * self.exp_arg(v).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_diode_forward_bias() {
        let d = DiodeParams::default();

        // At 0V, current should be exactly 0
        assert_eq!(d.current(0.0), 0.0);

        // At forward bias, current should increase exponentially
        let i_small = d.current(0.3);
        let i_large = d.current(0.6);
        assert!(i_large > i_small * 100.0);
    }

    #[test]
    fn test_diode_reverse_bias() {
        let d = DiodeParams::default();

        // In reverse bias, current should approach -Is
        let i_rev = d.current(-1.0);
        assert!(i_rev < 0.0);
        assert!(i_rev > -2.0 * d.saturation_current);
    }

    #[test]
    fn test_exponent_clamp_bounds_current() {
        let d = DiodeParams::default();
        let ceiling = d.saturation_current * (EXP_ARG_LIMIT.exp() - 1.0);

        assert_relative_eq!(d.current(5.0), ceiling);
        assert_relative_eq!(d.current(500.0), ceiling);
        assert!(d.current(1e6).is_finite());
        assert!(d.slope(1e6).is_finite());
    }

    #[test]
    fn test_slope_matches_finite_difference() {
        let d = DiodeParams::new(1e-12, 1.5);
        let v = 0.55;
        let h = 1e-7;
        let numeric = (d.current(v + h) - d.current(v - h)) / (2.0 * h);
        assert_relative_eq!(d.slope(v), numeric, max_relative = 1e-5);
    }
}
