//! Appliance power-draw model.
//!
//! Appliances are constant-power loads fed from a source through the
//! configured series (wiring) resistance. For a total demand `P` the loop
//! current solves
//!
//! ```text
//! R·I² − Vs·I + P = 0
//! ```
//!
//! taking the low-current root. When the supply cannot deliver `P`
//! (negative discriminant) the current is pinned at the maximum power
//! transfer point `Vs / (2R)` and the delivered power falls short.

use serde::{Deserialize, Serialize};

/// On/off cycling of a thermostatic or timed appliance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DutyCycle {
    /// Full cycle length (s)
    pub period_s: f64,
    /// Fraction of the period spent drawing rated power, in [0, 1]
    pub on_fraction: f64,
}

impl DutyCycle {
    /// Whether the cycle is in its "on" part at time `t_s`.
    pub fn is_on(&self, t_s: f64) -> bool {
        if self.period_s <= 0.0 {
            return true;
        }
        let phase = (t_s / self.period_s).fract();
        phase < self.on_fraction
    }
}

/// A single appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appliance {
    pub name: String,
    /// Rated power while running (W)
    pub power_w: f64,
    /// Power while idle in its duty cycle (W)
    #[serde(default)]
    pub standby_w: f64,
    #[serde(default)]
    pub duty: Option<DutyCycle>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Appliance {
    /// A continuously running appliance.
    pub fn new(name: impl Into<String>, power_w: f64) -> Self {
        Self {
            name: name.into(),
            power_w,
            standby_w: 0.0,
            duty: None,
            enabled: true,
        }
    }

    /// Give the appliance a duty cycle and standby draw.
    pub fn cycling(mut self, period_s: f64, on_fraction: f64, standby_w: f64) -> Self {
        self.duty = Some(DutyCycle {
            period_s,
            on_fraction,
        });
        self.standby_w = standby_w;
        self
    }

    /// Whether the appliance draws rated power at time `t_s`.
    pub fn is_running(&self, t_s: f64) -> bool {
        self.enabled && self.duty.map_or(true, |d| d.is_on(t_s))
    }

    /// Demanded power at time `t_s`.
    pub fn draw(&self, t_s: f64) -> f64 {
        if !self.enabled {
            0.0
        } else if self.is_running(t_s) {
            self.power_w
        } else {
            self.standby_w
        }
    }
}

/// Parameters for an appliance set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplianceParams {
    pub appliances: Vec<Appliance>,
}

impl Default for ApplianceParams {
    fn default() -> Self {
        AppliancePreset::Kitchen.params()
    }
}

impl ApplianceParams {
    /// Total demanded power at time `t_s`.
    pub fn demand(&self, t_s: f64) -> f64 {
        self.appliances.iter().map(|a| a.draw(t_s)).sum()
    }

    /// Number of appliances drawing rated power at time `t_s`.
    pub fn running_count(&self, t_s: f64) -> usize {
        self.appliances.iter().filter(|a| a.is_running(t_s)).count()
    }
}

/// Named appliance sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppliancePreset {
    Kitchen,
    HomeOffice,
    Workshop,
}

impl AppliancePreset {
    pub fn params(&self) -> ApplianceParams {
        let appliances = match self {
            AppliancePreset::Kitchen => vec![
                Appliance::new("fridge", 150.0).cycling(1200.0, 0.4, 5.0),
                Appliance::new("kettle", 2000.0).cycling(600.0, 0.25, 0.0),
                Appliance::new("lighting", 60.0),
            ],
            AppliancePreset::HomeOffice => vec![
                Appliance::new("desktop", 250.0),
                Appliance::new("monitor", 40.0),
                Appliance::new("printer", 400.0).cycling(300.0, 0.1, 8.0),
                Appliance::new("router", 12.0),
            ],
            AppliancePreset::Workshop => vec![
                Appliance::new("compressor", 1500.0).cycling(900.0, 0.3, 0.0),
                Appliance::new("bench grinder", 370.0),
                Appliance::new("lighting", 120.0),
            ],
        };
        ApplianceParams { appliances }
    }
}

/// Loop current for a constant-power demand behind a series resistance.
pub fn supply_current(source_voltage: f64, series_resistance: f64, power_w: f64) -> f64 {
    if source_voltage <= 0.0 || power_w <= 0.0 {
        return 0.0;
    }
    let disc = source_voltage * source_voltage - 4.0 * series_resistance * power_w;
    if disc < 0.0 {
        source_voltage / (2.0 * series_resistance)
    } else {
        // Stable form of (Vs − √disc) / 2R
        2.0 * power_w / (source_voltage + disc.sqrt())
    }
}

/// Electrical state of the appliance bus for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplianceLoad {
    pub current: f64,
    pub bus_voltage: f64,
    /// Power actually delivered to the appliances (W)
    pub power_w: f64,
    pub running: usize,
}

/// Solve the appliance bus at time `t_s`.
pub fn solve_load(
    params: &ApplianceParams,
    source_voltage: f64,
    series_resistance: f64,
    t_s: f64,
) -> ApplianceLoad {
    let demand = params.demand(t_s);
    let current = supply_current(source_voltage, series_resistance, demand);
    let bus_voltage = source_voltage - current * series_resistance;
    ApplianceLoad {
        current,
        bus_voltage,
        power_w: current * bus_voltage,
        running: params.running_count(t_s),
    }
}
