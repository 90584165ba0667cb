//! Helpers shared by the platform-specific probes.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

/// sysfs directory exposing SMBIOS/DMI strings on Linux.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) const DMI_DIR: &str = "/sys/class/dmi/id";

/// Read a single-value sysfs/procfs attribute.
///
/// Empty attributes are reported as errors so they show up as "N/A".
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn read_attr(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = raw.trim();
    if value.is_empty() {
        anyhow::bail!("{} is empty", path.display());
    }
    Ok(value.to_string())
}

/// Run a command to completion and return its stdout.
pub(crate) fn command_stdout(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("{program} not found"))?;

    if !output.status.success() {
        anyhow::bail!("{program} exited with {}", output.status);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Query a WMI class through `wmic <class...> get <properties> /format:csv`.
#[cfg(target_os = "windows")]
pub(crate) fn wmic_rows(class: &[&str], properties: &str) -> Result<Vec<HashMap<String, String>>> {
    let mut args: Vec<&str> = class.to_vec();
    args.extend(["get", properties, "/format:csv"]);
    let stdout = command_stdout("wmic", &args)?;
    parse_wmic_csv(&stdout)
}

/// First row of a WMI query, failing when the class has no instances.
#[cfg(target_os = "windows")]
pub(crate) fn wmic_first(class: &[&str], properties: &str) -> Result<HashMap<String, String>> {
    wmic_rows(class, properties)?
        .into_iter()
        .next()
        .with_context(|| format!("wmic {} returned no rows", class.join(" ")))
}

/// Parse `wmic ... /format:csv` output into one map per instance.
///
/// wmic pads its output with blank lines and carriage returns, and always adds a
/// leading `Node` column which is dropped here.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn parse_wmic_csv(output: &str) -> Result<Vec<HashMap<String, String>>> {
    let cleaned: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let cleaned = cleaned.join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let headers = reader
        .headers()
        .context("wmic output has no header row")?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse wmic CSV row")?;
        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.eq_ignore_ascii_case("node"))
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Look up a non-empty WMI property.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn wmi_value(row: &HashMap<String, String>, key: &str) -> Result<String> {
    row.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .with_context(|| format!("WMI property {key} is empty"))
}

#[cfg_attr(target_os = "linux", allow(dead_code))]
pub(crate) fn unsupported<T>() -> Result<T> {
    anyhow::bail!("not supported on {}", std::env::consts::OS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_wmic_csv() {
        let sample = "\r\r\nNode,Manufacturer,SerialNumber,SMBIOSBIOSVersion\r\r\nDESKTOP-1,American Megatrends Inc.,To be filled by O.E.M.,F12\r\r\n";
        let rows = parse_wmic_csv(sample).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("Manufacturer").map(String::as_str), Some("American Megatrends Inc."));
        assert_eq!(row.get("SMBIOSBIOSVersion").map(String::as_str), Some("F12"));
        assert!(!row.contains_key("Node"));
    }

    #[test]
    fn empty_wmi_values_are_errors() {
        let mut row = HashMap::new();
        row.insert("Product".to_string(), String::new());
        assert!(wmi_value(&row, "Product").is_err());
        assert!(wmi_value(&row, "Version").is_err());
    }

    #[test]
    fn read_attr_rejects_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let filled = dir.path().join("filled");
        fs::write(&empty, "\n").unwrap();
        fs::write(&filled, "  Gigabyte \n").unwrap();

        assert!(read_attr(&empty).is_err());
        assert_eq!(read_attr(&filled).unwrap(), "Gigabyte");
        assert!(read_attr(dir.path().join("missing")).is_err());
    }
}
