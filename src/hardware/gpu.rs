//! GPU detection module
//!
//! Detects GPU information using:
//! - NVIDIA: nvidia-smi if available (cross-platform)
//! - Linux: lspci for the marketing name, /sys/class/drm for driver and VRAM
//! - Windows: WMI (`Win32_VideoController`)

use anyhow::{Context, Result};
use std::fmt;
#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "linux")]
use std::path::Path;

use super::field::Readings;
use super::platform::command_stdout;

/// GPU vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Unknown,
}

impl GpuVendor {
    /// Guess the vendor from a free-form device name.
    fn from_name(name: &str) -> Self {
        if name.contains("NVIDIA") || name.contains("GeForce") || name.contains("Quadro") {
            GpuVendor::Nvidia
        } else if name.contains("AMD") || name.contains("ATI") || name.contains("Radeon") {
            GpuVendor::Amd
        } else if name.contains("Intel") {
            GpuVendor::Intel
        } else {
            GpuVendor::Unknown
        }
    }

    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn from_pci_id(vendor_id: &str) -> Self {
        match vendor_id {
            "0x10de" => GpuVendor::Nvidia,
            "0x1002" => GpuVendor::Amd,
            "0x8086" => GpuVendor::Intel,
            _ => GpuVendor::Unknown,
        }
    }
}

impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuVendor::Nvidia => write!(f, "NVIDIA"),
            GpuVendor::Amd => write!(f, "AMD"),
            GpuVendor::Intel => write!(f, "Intel"),
            GpuVendor::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One graphics adapter as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GpuInfo {
    pub name: String,
    pub vendor: GpuVendor,
    pub vram_mb: Option<u64>,
    pub driver_version: Option<String>,
}

pub(crate) fn probe() -> Readings {
    readings(detect())
}

/// Every adapter is listed in `name`; the remaining fields describe the
/// primary one, which detection puts first.
fn readings(detected: Result<Vec<GpuInfo>>) -> Readings {
    let gpus = || {
        detected
            .as_ref()
            .map_err(|e| anyhow::anyhow!("GPU detection failed: {e:#}"))
    };
    let primary = || {
        gpus()?
            .first()
            .ok_or_else(|| anyhow::anyhow!("no GPU detected"))
    };

    Readings::new()
        .read("count", || Ok(gpus()?.len()))
        .read("name", || {
            let gpus = gpus()?;
            if gpus.is_empty() {
                anyhow::bail!("no GPU detected");
            }
            Ok(gpus
                .iter()
                .map(|gpu| gpu.name.as_str())
                .collect::<Vec<_>>()
                .join(", "))
        })
        .read("vendor", || {
            let gpu = primary()?;
            if gpu.vendor == GpuVendor::Unknown {
                anyhow::bail!("unrecognized GPU vendor");
            }
            Ok(gpu.vendor.to_string())
        })
        .read("vram_mb", || primary()?.vram_mb.context("VRAM size not reported"))
        .read("driver_version", || {
            primary()?
                .driver_version
                .clone()
                .context("driver version not reported")
        })
}

/// Detect all GPUs, trying sources in order of reliability.
pub(crate) fn detect() -> Result<Vec<GpuInfo>> {
    if let Ok(gpus) = detect_nvidia_smi() {
        return Ok(gpus);
    }

    #[cfg(target_os = "linux")]
    {
        let sysfs = detect_sysfs().unwrap_or_default();
        if let Ok(mut gpus) = detect_lspci() {
            // lspci has no VRAM or driver info; borrow it from the matching sysfs card.
            for gpu in &mut gpus {
                if let Some(card) = sysfs.iter().find(|card| card.vendor == gpu.vendor) {
                    gpu.vram_mb = gpu.vram_mb.or(card.vram_mb);
                    gpu.driver_version = gpu.driver_version.take().or(card.driver_version.clone());
                }
            }
            return Ok(gpus);
        }
        if !sysfs.is_empty() {
            return Ok(sysfs);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(gpus) = detect_wmi() {
            return Ok(gpus);
        }
    }

    anyhow::bail!("No GPU detected")
}

/// Detect NVIDIA GPUs using nvidia-smi (cross-platform)
fn detect_nvidia_smi() -> Result<Vec<GpuInfo>> {
    let stdout = command_stdout(
        "nvidia-smi",
        &[
            "--query-gpu=name,memory.total,driver_version",
            "--format=csv,noheader,nounits",
        ],
    )?;
    parse_nvidia_smi(&stdout)
}

/// One line per card: "name, memory.total, driver_version".
fn parse_nvidia_smi(stdout: &str) -> Result<Vec<GpuInfo>> {
    let mut gpus = Vec::new();

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parts: Vec<&str> = line.split(", ").collect();
        if parts.len() < 3 {
            anyhow::bail!("Invalid nvidia-smi output");
        }

        let raw_name = parts[0].trim();
        let name = if raw_name.starts_with("NVIDIA") {
            raw_name.to_string()
        } else {
            format!("NVIDIA {raw_name}")
        };

        gpus.push(GpuInfo {
            name,
            vendor: GpuVendor::Nvidia,
            vram_mb: parts[1].trim().parse().ok(),
            driver_version: Some(parts[2].trim().to_string()).filter(|d| !d.is_empty()),
        });
    }

    if gpus.is_empty() {
        anyhow::bail!("No GPU found");
    }
    Ok(gpus)
}

/// Detect GPUs using lspci (Linux only)
#[cfg(target_os = "linux")]
fn detect_lspci() -> Result<Vec<GpuInfo>> {
    let stdout = command_stdout("lspci", &[])?;
    let gpus = parse_lspci(&stdout);
    if gpus.is_empty() {
        anyhow::bail!("No GPU found in lspci output");
    }
    Ok(gpus)
}

/// All display controllers in lspci output, discrete cards first.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_lspci(stdout: &str) -> Vec<GpuInfo> {
    let mut gpus: Vec<GpuInfo> = stdout
        .lines()
        .filter(|line| line.contains("VGA") || line.contains("3D controller"))
        .map(|line| {
            let (vendor, name) = parse_lspci_line(line);
            GpuInfo {
                name,
                vendor,
                vram_mb: None,
                driver_version: None,
            }
        })
        .collect();
    // Stable, so bus order is kept within each group.
    gpus.sort_by_key(|gpu| gpu.vendor == GpuVendor::Intel);
    gpus
}

/// Parse a single lspci line
///
/// Format: "01:00.0 VGA compatible controller: NVIDIA Corporation GA104 [GeForce RTX 3070] (rev a1)"
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_lspci_line(line: &str) -> (GpuVendor, String) {
    let vendor = GpuVendor::from_name(line);

    let name = match line.find(": ") {
        Some(idx) => {
            let after_colon = &line[idx + 2..];
            match after_colon.rfind(" (rev") {
                Some(rev_idx) => after_colon[..rev_idx].to_string(),
                None => after_colon.to_string(),
            }
        }
        None => line.to_string(),
    };

    (vendor, name)
}

/// Detect GPUs using sysfs (Linux only)
#[cfg(target_os = "linux")]
fn detect_sysfs() -> Result<Vec<GpuInfo>> {
    let drm_path = Path::new("/sys/class/drm");

    let mut cards: Vec<_> = fs::read_dir(drm_path)
        .context("/sys/class/drm not found")?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with("card") && !name.contains('-')
        })
        .collect();
    cards.sort_by_key(|entry| entry.file_name());

    let mut gpus = Vec::new();
    for card in cards {
        let device_path = card.path().join("device");
        let Ok(vendor_id) = fs::read_to_string(device_path.join("vendor")) else {
            continue;
        };
        let vendor = GpuVendor::from_pci_id(vendor_id.trim());

        let name = fs::read_to_string(device_path.join("uevent"))
            .ok()
            .and_then(|uevent| {
                uevent
                    .lines()
                    .find_map(|l| l.strip_prefix("PCI_ID=").map(str::to_string))
            })
            .map(|pci_id| format!("{vendor} GPU [{pci_id}]"))
            .unwrap_or_else(|| format!("{vendor} GPU"));

        // amdgpu exposes VRAM in bytes; other drivers do not.
        let vram_mb = super::platform::read_attr(device_path.join("mem_info_vram_total"))
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(|bytes| bytes / 1024 / 1024);

        let driver_version = fs::read_link(device_path.join("driver"))
            .ok()
            .and_then(|link| link.file_name().map(|n| n.to_string_lossy().into_owned()))
            .map(|driver| {
                match super::platform::read_attr(format!("/sys/module/{driver}/version")) {
                    Ok(version) => format!("{driver} {version}"),
                    Err(_) => driver,
                }
            });

        gpus.push(GpuInfo {
            name,
            vendor,
            vram_mb,
            driver_version,
        });
    }

    gpus.sort_by_key(|gpu| gpu.vendor == GpuVendor::Intel);
    Ok(gpus)
}

/// Detect GPUs using WMI on Windows
#[cfg(target_os = "windows")]
fn detect_wmi() -> Result<Vec<GpuInfo>> {
    use super::platform::{wmi_value, wmic_rows};

    let rows = wmic_rows(
        &["path", "win32_VideoController"],
        "Name,AdapterRAM,DriverVersion",
    )?;

    let gpus: Vec<GpuInfo> = rows
        .iter()
        .filter_map(|row| {
            let name = wmi_value(row, "Name").ok()?;
            Some(GpuInfo {
                vendor: GpuVendor::from_name(&name),
                // AdapterRAM is reported in bytes.
                vram_mb: wmi_value(row, "AdapterRAM")
                    .ok()
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .map(|bytes| bytes / 1024 / 1024),
                driver_version: wmi_value(row, "DriverVersion").ok(),
                name,
            })
        })
        .collect();

    if gpus.is_empty() {
        anyhow::bail!("win32_VideoController returned no adapters");
    }
    Ok(gpus)
}
