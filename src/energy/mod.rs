//! Energy-system models: battery/UPS storage and appliance loads.

pub mod appliance;
pub mod battery;

pub use appliance::{Appliance, ApplianceLoad, ApplianceParams, AppliancePreset, DutyCycle};
pub use battery::{integrate, BatteryParams, BatteryPreset, Chemistry, StorageState, StorageStep};
