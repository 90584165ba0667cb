//! BIOS and motherboard detection module
//!
//! Reads SMBIOS strings from:
//! - Linux: /sys/class/dmi/id (serial numbers are root-only and usually N/A)
//! - Windows: WMI (`Win32_BIOS`, `Win32_BaseBoard`)

use anyhow::Result;

use super::field::Readings;

/// OEM filler strings that mean the vendor never set the value.
const OEM_PLACEHOLDERS: [&str; 5] = [
    "to be filled by o.e.m.",
    "default string",
    "not specified",
    "not applicable",
    "system serial number",
];

pub(crate) fn probe_bios() -> Readings {
    let source = SmbiosSource::bios();
    Readings::new()
        .read("vendor", || source.get(Key::BiosVendor))
        .read("version", || source.get(Key::BiosVersion))
        .read("release_date", || source.get(Key::BiosDate))
        .read("serial_number", || source.get(Key::SystemSerial))
}

pub(crate) fn probe_motherboard() -> Readings {
    let source = SmbiosSource::board();
    Readings::new()
        .read("manufacturer", || source.get(Key::BoardVendor))
        .read("product", || source.get(Key::BoardName))
        .read("version", || source.get(Key::BoardVersion))
        .read("serial_number", || source.get(Key::BoardSerial))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    BiosVendor,
    BiosVersion,
    BiosDate,
    SystemSerial,
    BoardVendor,
    BoardName,
    BoardVersion,
    BoardSerial,
}

impl Key {
    /// File name under /sys/class/dmi/id.
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn dmi_attr(self) -> &'static str {
        match self {
            Key::BiosVendor => "bios_vendor",
            Key::BiosVersion => "bios_version",
            Key::BiosDate => "bios_date",
            Key::SystemSerial => "product_serial",
            Key::BoardVendor => "board_vendor",
            Key::BoardName => "board_name",
            Key::BoardVersion => "board_version",
            Key::BoardSerial => "board_serial",
        }
    }

    /// Property name on the matching WMI class.
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    fn wmi_property(self) -> &'static str {
        match self {
            Key::BiosVendor | Key::BoardVendor => "Manufacturer",
            Key::BiosVersion => "SMBIOSBIOSVersion",
            Key::BiosDate => "ReleaseDate",
            Key::SystemSerial | Key::BoardSerial => "SerialNumber",
            Key::BoardName => "Product",
            Key::BoardVersion => "Version",
        }
    }
}

/// SMBIOS strings for one table, queried once per probe.
struct SmbiosSource {
    #[cfg(target_os = "windows")]
    row: Result<std::collections::HashMap<String, String>>,
}

impl SmbiosSource {
    #[cfg(target_os = "windows")]
    fn bios() -> Self {
        Self {
            row: super::platform::wmic_first(
                &["bios"],
                "Manufacturer,SMBIOSBIOSVersion,ReleaseDate,SerialNumber",
            ),
        }
    }

    #[cfg(target_os = "windows")]
    fn board() -> Self {
        Self {
            row: super::platform::wmic_first(
                &["baseboard"],
                "Manufacturer,Product,Version,SerialNumber",
            ),
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn bios() -> Self {
        Self {}
    }

    #[cfg(not(target_os = "windows"))]
    fn board() -> Self {
        Self {}
    }

    fn get(&self, key: Key) -> Result<String> {
        let raw = self.raw(key)?;
        clean(key, &raw)
    }

    #[cfg(target_os = "linux")]
    fn raw(&self, key: Key) -> Result<String> {
        let path = std::path::Path::new(super::platform::DMI_DIR).join(key.dmi_attr());
        super::platform::read_attr(path)
    }

    #[cfg(target_os = "windows")]
    fn raw(&self, key: Key) -> Result<String> {
        let row = self
            .row
            .as_ref()
            .map_err(|e| anyhow::anyhow!("WMI query failed: {e:#}"))?;
        super::platform::wmi_value(row, key.wmi_property())
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    fn raw(&self, _key: Key) -> Result<String> {
        super::platform::unsupported()
    }
}

/// Reject OEM filler and normalize WMI's CIM datetime release dates.
fn clean(key: Key, raw: &str) -> Result<String> {
    let value = raw.trim();
    if OEM_PLACEHOLDERS
        .iter()
        .any(|p| value.eq_ignore_ascii_case(p))
    {
        anyhow::bail!("{key:?} is an OEM placeholder ({value})");
    }
    if key == Key::BiosDate {
        if let Some(date) = parse_cim_date(value) {
            return Ok(date);
        }
    }
    Ok(value.to_string())
}

/// `20230512000000.000000+000` -> `05/12/2023`, matching the DMI format.
fn parse_cim_date(raw: &str) -> Option<String> {
    let digits = raw.get(..8)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (year, rest) = digits.split_at(4);
    let (month, day) = rest.split_at(2);
    Some(format!("{month}/{day}/{year}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oem_filler_is_rejected() {
        assert!(clean(Key::BoardSerial, "To be filled by O.E.M.").is_err());
        assert!(clean(Key::BoardName, "Default string").is_err());
        assert_eq!(clean(Key::BoardName, " B650 AORUS ELITE AX ").unwrap(), "B650 AORUS ELITE AX");
    }

    #[test]
    fn cim_release_dates_are_normalized() {
        assert_eq!(
            clean(Key::BiosDate, "20230512000000.000000+000").unwrap(),
            "05/12/2023"
        );
        // Already in DMI format.
        assert_eq!(clean(Key::BiosDate, "05/12/2023").unwrap(), "05/12/2023");
    }

    #[test]
    fn probes_report_every_declared_field() {
        use crate::hardware::Category;

        let mut bios = probe_bios();
        for field in Category::Bios.fields() {
            assert!(bios.take(field).is_some(), "missing {field}");
        }
        let mut board = probe_motherboard();
        for field in Category::Motherboard.fields() {
            assert!(board.take(field).is_some(), "missing {field}");
        }
    }
}
