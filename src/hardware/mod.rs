//! Hardware detection module
//!
//! Queries CPU, GPU, RAM, disks, network, firmware, sound, battery, display and
//! machine identity using sysinfo and platform-specific sources (sysfs/procfs on
//! Linux, WMI via `wmic` on Windows, `nvidia-smi` where installed).
//!
//! Every category has a fixed, pre-declared set of field names. A probe that
//! cannot read a field leaves it as `"N/A"`; it never fails the whole report.

mod battery;
mod cpu;
mod display;
mod field;
mod firmware;
mod gpu;
mod identity;
mod network;
mod platform;
mod provider;
mod ram;
mod sound;
mod storage;
mod system;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use field::{CategoryFields, FieldValue, NOT_AVAILABLE};
pub use provider::{FieldProvider, HardwareSource, SysinfoSource};

#[cfg(test)]
pub(crate) use field::ProbeError;
#[cfg(test)]
pub(crate) use provider::tests::FakeSource;

/// A named group of related hardware/OS fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    System,
    Cpu,
    Gpu,
    Ram,
    Disks,
    Network,
    Bios,
    Motherboard,
    Sound,
    Battery,
    Display,
    Identity,
    Benchmark,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::System,
        Category::Cpu,
        Category::Gpu,
        Category::Ram,
        Category::Disks,
        Category::Network,
        Category::Bios,
        Category::Motherboard,
        Category::Sound,
        Category::Battery,
        Category::Display,
        Category::Identity,
        Category::Benchmark,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::System => "System",
            Category::Cpu => "CPU",
            Category::Gpu => "GPU",
            Category::Ram => "RAM",
            Category::Disks => "Disks",
            Category::Network => "Network",
            Category::Bios => "BIOS",
            Category::Motherboard => "Motherboard",
            Category::Sound => "Sound",
            Category::Battery => "Battery",
            Category::Display => "Display",
            Category::Identity => "Identity",
            Category::Benchmark => "Benchmark",
        }
    }

    /// Declared field names, in display order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Category::System => &[
                "os_name",
                "os_version",
                "kernel_version",
                "host_name",
                "architecture",
                "boot_time",
                "uptime",
                "process_count",
            ],
            Category::Cpu => &["name", "cores", "threads", "frequency_mhz", "usage_percent"],
            Category::Gpu => &["count", "name", "vendor", "vram_mb", "driver_version"],
            Category::Ram => &[
                "total_gb",
                "available_gb",
                "used_gb",
                "usage_percent",
                "swap_total_gb",
                "swap_used_gb",
                "swap_percent",
            ],
            Category::Disks => &[
                "count",
                "devices",
                "total_gb",
                "used_gb",
                "free_gb",
                "usage_percent",
            ],
            Category::Network => &[
                "interface_count",
                "interfaces",
                "primary_ip",
                "ipv4_addresses",
                "mac_addresses",
                "received_mb",
                "transmitted_mb",
            ],
            Category::Bios => &["vendor", "version", "release_date", "serial_number"],
            Category::Motherboard => &["manufacturer", "product", "version", "serial_number"],
            Category::Sound => &["device_count", "devices"],
            Category::Battery => &["present", "percent", "state", "plugged_in", "seconds_left"],
            Category::Display => &["monitor_count", "monitors", "primary_resolution"],
            Category::Identity => &["machine_uuid", "product_uuid"],
            Category::Benchmark => &[
                "cpu_elapsed_seconds",
                "cpu_ops_per_second",
                "memory_elapsed_seconds",
                "memory_bytes_per_second",
                "disk_elapsed_seconds",
                "disk_bytes_per_second",
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownCategory(needle.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
