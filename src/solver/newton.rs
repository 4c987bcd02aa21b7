//! Damped Newton-Raphson iteration for the single-loop operating point.

use tracing::debug;

use super::{
    DIODE_TOLERANCE, JUNCTION_MAX_STEP, MAX_ITERATIONS, MIN_SERIES_RESISTANCE, MOSFET_MAX_STEP,
    TRANSISTOR_TOLERANCE,
};
use crate::devices::DeviceModel;

/// The linear part of the loop: a source behind a series resistor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopCircuit {
    pub source_voltage: f64,
    pub series_resistance: f64,
}

impl LoopCircuit {
    /// Create a loop, flooring the resistance away from zero.
    pub fn new(source_voltage: f64, series_resistance: f64) -> Self {
        Self {
            source_voltage,
            series_resistance: series_resistance.max(MIN_SERIES_RESISTANCE),
        }
    }

    /// Current the resistor delivers when the device terminal sits at `v`.
    pub fn current(&self, v: f64) -> f64 {
        (self.source_voltage - v) / self.series_resistance
    }

    /// Conductance of the series resistor.
    pub fn conductance(&self) -> f64 {
        1.0 / self.series_resistance
    }
}

/// A solved (or best-effort) operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    /// Device terminal voltage
    pub voltage: f64,
    /// Device current at `voltage`
    pub current: f64,
    /// Iterations spent
    pub iterations: usize,
    /// Whether the step fell under tolerance before the cap
    pub converged: bool,
}

impl OperatingPoint {
    /// Whether both voltage and current are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.voltage.is_finite() && self.current.is_finite()
    }
}

/// How each iteration turns the residual into a voltage step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// `ΔV = −f / (g_device + 1/R)`, using the device's closed-form slope
    Newton,
    /// `ΔV = R·(I_loop − I_device)`, a fixed-point update on the loop
    /// voltage that ignores the device slope
    Relaxation,
}

/// Damped Newton-Raphson solver for a device in a [`LoopCircuit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence tolerance on |ΔV|
    pub tolerance: f64,
    /// Largest |ΔV| accepted per iteration
    pub max_step: f64,
    /// Step rule
    pub iteration: Iteration,
}

impl NewtonRaphson {
    /// Create a solver with explicit settings.
    pub fn with_config(max_iterations: usize, tolerance: f64, max_step: f64, iteration: Iteration) -> Self {
        Self {
            max_iterations,
            tolerance,
            max_step,
            iteration,
        }
    }

    /// Settings for the diode: Newton steps of at most ±0.1 V, 1e-9 V tolerance.
    pub fn diode() -> Self {
        Self::with_config(MAX_ITERATIONS, DIODE_TOLERANCE, JUNCTION_MAX_STEP, Iteration::Newton)
    }

    /// Settings for BJT curves: relaxation steps of at most ±0.1 V, 1e-6 V tolerance.
    pub fn bjt() -> Self {
        Self::with_config(
            MAX_ITERATIONS,
            TRANSISTOR_TOLERANCE,
            JUNCTION_MAX_STEP,
            Iteration::Relaxation,
        )
    }

    /// Settings for MOSFET curves: relaxation steps of at most ±0.2 V, 1e-6 V tolerance.
    ///
    /// In steep triode regions (`g·R > 1`) relaxation does not contract and
    /// the iterate settles into a ±`max_step` cycle around the operating
    /// point until the cap is reached.
    pub fn mosfet() -> Self {
        Self::with_config(
            MAX_ITERATIONS,
            TRANSISTOR_TOLERANCE,
            MOSFET_MAX_STEP,
            Iteration::Relaxation,
        )
    }

    /// Find the terminal voltage where `device` and `circuit` agree.
    ///
    /// `seed` is the starting voltage: 0 for a cold start, or the previous
    /// tick's result for a smooth sweep. A non-finite seed is treated as 0.
    /// The solve is deterministic in its inputs.
    pub fn solve<D: DeviceModel>(&self, circuit: &LoopCircuit, device: &D, seed: f64) -> OperatingPoint {
        let mut v = if seed.is_finite() { seed } else { 0.0 };

        for iter in 0..self.max_iterations {
            // f(V) = I_device(V) − I_loop(V)
            let residual = device.current(v) - circuit.current(v);
            let jacobian = match self.iteration {
                Iteration::Newton => device.slope(v) + circuit.conductance(),
                Iteration::Relaxation => circuit.conductance(),
            };

            let dv = (-residual / jacobian).clamp(-self.max_step, self.max_step);
            v += dv;

            if dv.abs() < self.tolerance {
                return OperatingPoint {
                    voltage: v,
                    current: device.current(v),
                    iterations: iter + 1,
                    converged: true,
                };
            }
        }

        debug!(
            iterations = self.max_iterations,
            voltage = v,
            "operating point did not converge, keeping last iterate"
        );

        OperatingPoint {
            voltage: v,
            current: device.current(v),
            iterations: self.max_iterations,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{BjtParams, DiodeParams, MosfetCurve, MosfetRegion};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_silicon_diode_operating_point() {
        let circuit = LoopCircuit::new(5.0, 1000.0);
        let op = NewtonRaphson::diode().solve(&circuit, &DiodeParams::new(1e-12, 1.0), 0.0);

        assert!(op.converged);
        assert!(op.voltage > 0.52 && op.voltage < 0.6, "V = {}", op.voltage);
        assert!(op.current > 4.4e-3 && op.current < 4.5e-3, "I = {}", op.current);
        assert_abs_diff_eq!(op.current, circuit.current(op.voltage), epsilon = 1e-9);
    }

    #[test]
    fn test_diode_current_rises_with_source() {
        let diode = DiodeParams::default();
        let solver = NewtonRaphson::diode();

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=40 {
            let vs = step as f64 * 0.25;
            let op = solver.solve(&LoopCircuit::new(vs, 1000.0), &diode, 0.0);
            assert!(op.current >= previous - 1e-12, "current fell at Vs = {vs}");
            previous = op.current;
        }
    }

    #[test]
    fn test_solve_is_deterministic() {
        let circuit = LoopCircuit::new(3.3, 470.0);
        let diode = DiodeParams::new(2.5e-9, 1.75);
        let solver = NewtonRaphson::diode();

        let a = solver.solve(&circuit, &diode, 0.2);
        let b = solver.solve(&circuit, &diode, 0.2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_heavy_diode_shorts_the_loop() {
        // Huge saturation current: the junction barely develops a voltage
        let circuit = LoopCircuit::new(5.0, 1000.0);
        let op = NewtonRaphson::diode().solve(&circuit, &DiodeParams::new(1.0, 1.0), 0.0);

        assert_abs_diff_eq!(op.voltage, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(op.current, 5e-3, epsilon = 1e-6);
    }

    #[test]
    fn test_vanishing_diode_opens_the_loop() {
        let circuit = LoopCircuit::new(1.0, 1000.0);
        let op = NewtonRaphson::diode().solve(&circuit, &DiodeParams::new(1e-30, 1.0), 0.0);

        assert!(op.converged);
        assert_abs_diff_eq!(op.voltage, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(op.current, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_iteration_cap_keeps_last_iterate() {
        // The 0.1 V step clamp cannot climb from 0 V to ~5 V in 24 iterations
        let circuit = LoopCircuit::new(5.0, 0.0);
        assert_eq!(circuit.series_resistance, 1e-9);

        let op = NewtonRaphson::diode().solve(&circuit, &DiodeParams::new(1e-30, 1.0), 0.0);
        assert!(!op.converged);
        assert_eq!(op.iterations, MAX_ITERATIONS);
        assert_abs_diff_eq!(op.voltage, 2.4, epsilon = 1e-9);
        assert!(op.is_finite());
    }

    fn steep_triode() -> MosfetCurve {
        MosfetCurve {
            vgs: 4.5,
            threshold: 2.5,
            k: 2e-3,
        }
    }

    #[test]
    fn test_newton_finds_mosfet_triode_point() {
        let circuit = LoopCircuit::new(5.0, 1000.0);
        let device = steep_triode();
        let solver = NewtonRaphson {
            iteration: Iteration::Newton,
            ..NewtonRaphson::mosfet()
        };
        let op = solver.solve(&circuit, &device, 0.0);

        // V² − 5V + 5 = 0 in triode
        let expected = (5.0 - 5.0f64.sqrt()) / 2.0;
        assert!(op.converged);
        assert_abs_diff_eq!(op.voltage, expected, epsilon = 1e-5);
        assert!(op.current <= device.saturation_current());
    }

    #[test]
    fn test_relaxation_cycles_in_steep_triode() {
        // g·R ≈ 1.24 at the operating point, so relaxation overshoots
        let circuit = LoopCircuit::new(5.0, 1000.0);
        let device = steep_triode();
        let op = NewtonRaphson::mosfet().solve(&circuit, &device, 0.0);

        assert!(!op.converged);
        assert_eq!(op.iterations, MAX_ITERATIONS);
        assert!(op.voltage > 1.2 && op.voltage < 1.5, "Vds = {}", op.voltage);
        assert_eq!(device.region(op.voltage), MosfetRegion::Triode);
        assert!(op.current > 0.0 && op.current <= device.saturation_current());

        // The cycle is stable, so restarting from the last iterate stays on it
        let again = NewtonRaphson::mosfet().solve(&circuit, &device, op.voltage);
        assert!(!again.converged);
        assert!(again.voltage > 1.2 && again.voltage < 1.5);
    }

    #[test]
    fn test_relaxation_converges_on_flat_saturation() {
        let circuit = LoopCircuit::new(5.0, 1000.0);
        let device = MosfetCurve {
            vgs: 3.0,
            ..steep_triode()
        };
        let op = NewtonRaphson::mosfet().solve(&circuit, &device, 4.6);

        assert!(op.converged);
        assert_abs_diff_eq!(op.voltage, 4.75, epsilon = 1e-6);
        assert_eq!(device.region(op.voltage), MosfetRegion::Saturation);
    }

    #[test]
    fn test_bjt_settles_on_load_line() {
        let circuit = LoopCircuit::new(2.0, 500.0);
        let curve = BjtParams::default().curve(1); // 20 µA → 2 mA active
        let op = NewtonRaphson::bjt().solve(&circuit, &curve, 0.0);

        assert!(op.converged);
        assert!(op.voltage > 0.9 && op.voltage < 1.1, "Vce = {}", op.voltage);
        assert_abs_diff_eq!(op.current, circuit.current(op.voltage), epsilon = 1e-8);
    }

    #[test]
    fn test_bjt_cold_start_from_high_rail_is_best_effort() {
        // 0.1 V steps cover at most 2.4 V from a cold start
        let circuit = LoopCircuit::new(10.0, 1000.0);
        let curve = BjtParams::default().curve(1);
        let cold = NewtonRaphson::bjt().solve(&circuit, &curve, 0.0);
        assert!(!cold.converged);

        let warm = NewtonRaphson::bjt().solve(&circuit, &curve, cold.voltage + 2.4 * 2.0);
        assert!(warm.converged);
        assert_abs_diff_eq!(warm.voltage, 8.0, epsilon = 1e-3);
    }
}
