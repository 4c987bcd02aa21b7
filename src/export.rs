//! CSV and JSON export of history snapshots.
//!
//! Column names and order are fixed; downstream tooling reads them by
//! position:
//!
//! ```text
//! index,drive_value,measured_current,device_kind,aux
//! 1,5,0.004439...,diode,"{""junctionVoltage"":0.5605,...}"
//! ```
//!
//! The aux column is the sample's variant payload as a JSON object, quoted
//! with inner quotes doubled.

use std::fs;
use std::path::Path;

use crate::error::{Result, VoltlabError};
use crate::sample::SimulationSample;

/// Header row of every CSV export.
pub const CSV_HEADER: &str = "index,drive_value,measured_current,device_kind,aux";

/// Render samples as CSV, header first.
pub fn to_csv<'a>(samples: impl IntoIterator<Item = &'a SimulationSample>) -> String {
    let mut out = String::new();

    out.push_str(CSV_HEADER);
    out.push('\n');

    for sample in samples {
        out.push_str(&csv_row(sample));
        out.push('\n');
    }

    out
}

/// One CSV data row, without the line terminator.
pub fn csv_row(sample: &SimulationSample) -> String {
    let aux = sample.aux.to_json().replace('"', "\"\"");
    format!(
        "{},{},{},{},\"{}\"",
        sample.index, sample.drive_value, sample.measured_current, sample.device_kind, aux
    )
}

/// Write samples as CSV to `path`.
pub fn write_csv<'a>(samples: impl IntoIterator<Item = &'a SimulationSample>, path: &Path) -> Result<()> {
    fs::write(path, to_csv(samples)).map_err(|e| VoltlabError::ExportWrite {
        path: path.display().to_string(),
        source: e,
    })
}

/// Render samples as a JSON array.
pub fn to_json(samples: &[SimulationSample]) -> Result<String> {
    serde_json::to_string(samples).map_err(|e| VoltlabError::export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceKind;
    use crate::devices::MosfetRegion;
    use crate::sample::Auxiliary;

    fn battery_sample(index: u64) -> SimulationSample {
        SimulationSample {
            index,
            device_kind: DeviceKind::BatteryPack,
            drive_value: 500.0,
            measured_current: 11.25,
            aux: Auxiliary::Battery {
                soc: 79.5,
                bus_voltage: 48.4,
                power_w: 543.5,
                runtime_hours: None,
            },
            timestamp_ms: 100.0,
        }
    }

    #[test]
    fn test_csv_layout() {
        let samples = vec![battery_sample(1), battery_sample(2)];
        let csv = to_csv(&samples);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            r#"1,500,11.25,batteryPack,"{""soc"":79.5,""busVoltage"":48.4,""powerW"":543.5,""runtimeHours"":null}""#
        );
        assert!(lines[2].starts_with("2,500,"));
    }

    #[test]
    fn test_empty_history_is_header_only() {
        assert_eq!(to_csv(&[] as &[SimulationSample]), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_aux_column_keeps_enum_names() {
        let sample = SimulationSample {
            index: 7,
            device_kind: DeviceKind::Mosfet,
            drive_value: 2.5,
            measured_current: 1e-3,
            aux: Auxiliary::Mosfet {
                vds: 1.5,
                vgs: 4.0,
                region: MosfetRegion::Saturation,
                curve: 2,
                converged: true,
            },
            timestamp_ms: 0.0,
        };
        let row = csv_row(&sample);
        assert!(row.starts_with("7,2.5,0.001,mosfet,\"{"));
        assert!(row.contains(r#"""region"":""saturation"""#));
    }

    #[test]
    fn test_json_snapshot_uses_camel_case() {
        let json = to_json(&[battery_sample(3)]).unwrap();
        assert!(json.starts_with(r#"[{"index":3,"deviceKind":"batteryPack","driveValue":500.0"#));
        assert!(json.contains(r#""timestampMs":100.0"#));
    }

    #[test]
    fn test_write_csv_to_missing_directory_fails() {
        let path = Path::new("/nonexistent-voltlab-dir/out.csv");
        let err = write_csv(&[battery_sample(1)], path).unwrap_err();
        assert!(matches!(err, VoltlabError::ExportWrite { .. }));
    }
}
