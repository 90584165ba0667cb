//! CPU detection module
//!
//! Detects CPU information using:
//! - Cross-platform: sysinfo crate
//! - Linux: cpufreq sysfs when sysinfo reports no clock
//! - Windows: registry `~MHz` when sysinfo reports no clock

use anyhow::{Context, Result};
use sysinfo::{Cpu, System, MINIMUM_CPU_UPDATE_INTERVAL};

use super::field::{round2, Readings};

pub(crate) fn probe() -> Readings {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    // Usage is a delta between two refreshes.
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let cpus = sys.cpus();

    Readings::new()
        .read("name", || {
            let first = cpus.first().context("No CPU detected")?;
            let brand = first.brand().trim();
            if brand.is_empty() {
                anyhow::bail!("CPU brand string is empty");
            }
            Ok(brand.to_string())
        })
        .read_opt("cores", || sys.physical_core_count())
        .read("threads", || {
            if cpus.is_empty() {
                anyhow::bail!("No CPU detected");
            }
            Ok(cpus.len())
        })
        .read("frequency_mhz", || frequency_mhz(cpus))
        .read("usage_percent", || {
            if cpus.is_empty() {
                anyhow::bail!("No CPU detected");
            }
            Ok(round2(f64::from(sys.global_cpu_usage())))
        })
}

/// Current clock of the first core, falling back to platform sources.
fn frequency_mhz(cpus: &[Cpu]) -> Result<u64> {
    if let Some(freq) = cpus.first().map(Cpu::frequency).filter(|f| *f > 0) {
        return Ok(freq);
    }
    platform_frequency_mhz()
}

/// Read the clock from cpufreq (Linux only)
#[cfg(target_os = "linux")]
fn platform_frequency_mhz() -> Result<u64> {
    const CANDIDATES: [&str; 2] = [
        "/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq",
        "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq",
    ];

    for path in CANDIDATES {
        if let Ok(raw) = super::platform::read_attr(path) {
            if let Ok(freq_khz) = raw.parse::<u64>() {
                return Ok(freq_khz / 1000); // kHz to MHz
            }
        }
    }

    anyhow::bail!("cpufreq does not report a clock")
}

/// Read the clock from the registry (Windows only)
#[cfg(target_os = "windows")]
fn platform_frequency_mhz() -> Result<u64> {
    let stdout = super::platform::command_stdout(
        "reg",
        &[
            "query",
            "HKEY_LOCAL_MACHINE\\HARDWARE\\DESCRIPTION\\System\\CentralProcessor\\0",
            "/v",
            "~MHz",
        ],
    )?;
    parse_reg_mhz(&stdout).context("~MHz not found in registry output")
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn platform_frequency_mhz() -> Result<u64> {
    super::platform::unsupported()
}

/// Parse `    ~MHz    REG_DWORD    0x1e61`
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_reg_mhz(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .filter(|line| line.contains("~MHz"))
        .filter_map(|line| line.split_whitespace().last())
        .find_map(|hex| u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
}
