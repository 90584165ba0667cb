//! Display (monitor) detection module
//!
//! - Linux: connected DRM connectors under /sys/class/drm and their preferred mode
//! - Windows: WMI (`Win32_DesktopMonitor`)

use anyhow::{Context, Result};

use super::field::Readings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Monitor {
    pub name: String,
    /// `1920x1080`, when the OS reports it.
    pub resolution: Option<String>,
}

impl Monitor {
    fn describe(&self) -> String {
        match &self.resolution {
            Some(resolution) => format!("{} ({resolution})", self.name),
            None => self.name.clone(),
        }
    }
}

pub(crate) fn probe() -> Readings {
    let listed = list_monitors();
    let monitors = || {
        listed.as_ref().map_err(|e| anyhow::anyhow!("{e:#}"))
    };

    Readings::new()
        .read("monitor_count", || Ok(monitors()?.len()))
        .read("monitors", || {
            let monitors = monitors()?;
            if monitors.is_empty() {
                anyhow::bail!("no connected monitors");
            }
            Ok(monitors
                .iter()
                .map(Monitor::describe)
                .collect::<Vec<_>>()
                .join(", "))
        })
        .read("primary_resolution", || {
            monitors()?
                .iter()
                .find_map(|m| m.resolution.clone())
                .context("no monitor reports a resolution")
        })
}

#[cfg(target_os = "linux")]
fn list_monitors() -> Result<Vec<Monitor>> {
    use std::fs;

    let mut connectors: Vec<_> = fs::read_dir("/sys/class/drm")
        .context("/sys/class/drm not found")?
        .filter_map(|entry| entry.ok())
        .collect();
    connectors.sort_by_key(|entry| entry.file_name());

    let mut monitors = Vec::new();
    for entry in connectors {
        let file_name = entry.file_name();
        let Some(connector) = connector_name(&file_name.to_string_lossy()) else {
            continue;
        };
        let status = super::platform::read_attr(entry.path().join("status")).unwrap_or_default();
        if status != "connected" {
            continue;
        }
        // The first listed mode is the preferred one.
        let resolution = fs::read_to_string(entry.path().join("modes"))
            .ok()
            .and_then(|modes| modes.lines().next().map(|m| m.trim().to_string()))
            .filter(|mode| !mode.is_empty());

        monitors.push(Monitor {
            name: connector,
            resolution,
        });
    }

    tracing::debug!(monitors = monitors.len(), "Enumerated DRM connectors");
    Ok(monitors)
}

#[cfg(target_os = "windows")]
fn list_monitors() -> Result<Vec<Monitor>> {
    use super::platform::{wmi_value, wmic_rows};

    let rows = wmic_rows(&["desktopmonitor"], "Name,ScreenWidth,ScreenHeight")?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let name = wmi_value(row, "Name").ok()?;
            let resolution = match (wmi_value(row, "ScreenWidth"), wmi_value(row, "ScreenHeight")) {
                (Ok(w), Ok(h)) => Some(format!("{w}x{h}")),
                _ => None,
            };
            Some(Monitor { name, resolution })
        })
        .collect())
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn list_monitors() -> Result<Vec<Monitor>> {
    super::platform::unsupported()
}

/// `card0-HDMI-A-1` -> `HDMI-A-1`; plain `card0` and render nodes are not connectors.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn connector_name(entry: &str) -> Option<String> {
    let rest = entry.strip_prefix("card")?;
    let (index, connector) = rest.split_once('-')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) || connector.is_empty() {
        return None;
    }
    Some(connector.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_names_are_extracted() {
        assert_eq!(connector_name("card0-HDMI-A-1").as_deref(), Some("HDMI-A-1"));
        assert_eq!(connector_name("card1-eDP-1").as_deref(), Some("eDP-1"));
        assert_eq!(connector_name("card0"), None);
        assert_eq!(connector_name("renderD128"), None);
        assert_eq!(connector_name("version"), None);
    }

    #[test]
    fn monitor_description_includes_resolution() {
        let monitor = Monitor {
            name: "DP-1".to_string(),
            resolution: Some("2560x1440".to_string()),
        };
        assert_eq!(monitor.describe(), "DP-1 (2560x1440)");
    }
}
