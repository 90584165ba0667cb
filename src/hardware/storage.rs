//! Disk detection module
//!
//! Mounted volumes from sysinfo, aggregated into totals. A device mounted at
//! several points (bind mounts, btrfs subvolumes) is counted once.

use std::collections::HashSet;

use sysinfo::{DiskKind, Disks};

use super::field::{bytes_to_gb, percent, Readings};

/// One physical volume as seen by the OS.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Volume {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
    pub kind: &'static str,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl Volume {
    /// `sda1 (/, ext4, SSD)`
    fn describe(&self) -> String {
        format!(
            "{} ({}, {}, {})",
            self.device, self.mount_point, self.file_system, self.kind
        )
    }
}

pub(crate) fn probe() -> Readings {
    let volumes = list_volumes();
    summarize(&volumes)
}

fn list_volumes() -> Vec<Volume> {
    let disks = Disks::new_with_refreshed_list();
    let volumes: Vec<Volume> = disks
        .list()
        .iter()
        .map(|disk| Volume {
            device: disk.name().to_string_lossy().into_owned(),
            mount_point: disk.mount_point().display().to_string(),
            file_system: disk.file_system().to_string_lossy().into_owned(),
            kind: match disk.kind() {
                DiskKind::HDD => "HDD",
                DiskKind::SSD => "SSD",
                DiskKind::Unknown(_) => "Unknown",
            },
            total_bytes: disk.total_space(),
            available_bytes: disk.available_space(),
        })
        .collect();

    tracing::debug!(volumes = volumes.len(), "Enumerated disks");
    dedup_by_device(volumes)
}

/// Keep the first mount of every device.
fn dedup_by_device(volumes: Vec<Volume>) -> Vec<Volume> {
    let mut seen = HashSet::new();
    volumes
        .into_iter()
        .filter(|v| v.total_bytes > 0)
        .filter(|v| seen.insert(v.device.clone()))
        .collect()
}

fn summarize(volumes: &[Volume]) -> Readings {
    let total: u64 = volumes.iter().map(|v| v.total_bytes).sum();
    let free: u64 = volumes.iter().map(|v| v.available_bytes).sum();
    let used = total.saturating_sub(free);

    let require_disks = || {
        if volumes.is_empty() {
            anyhow::bail!("no mounted disks reported");
        }
        Ok(())
    };

    Readings::new()
        .read("count", || Ok(volumes.len()))
        .read("devices", || {
            require_disks()?;
            Ok(volumes
                .iter()
                .map(Volume::describe)
                .collect::<Vec<_>>()
                .join(", "))
        })
        .read("total_gb", || {
            require_disks()?;
            Ok(bytes_to_gb(total))
        })
        .read("used_gb", || {
            require_disks()?;
            Ok(bytes_to_gb(used))
        })
        .read("free_gb", || {
            require_disks()?;
            Ok(bytes_to_gb(free))
        })
        .read("usage_percent", || {
            require_disks()?;
            Ok(percent(used, total))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{FieldValue, ProbeError};

    const GIB: u64 = 1024 * 1024 * 1024;

    fn volume(device: &str, mount: &str, total_gib: u64, free_gib: u64) -> Volume {
        Volume {
            device: device.to_string(),
            mount_point: mount.to_string(),
            file_system: "ext4".to_string(),
            kind: "SSD",
            total_bytes: total_gib * GIB,
            available_bytes: free_gib * GIB,
        }
    }

    #[test]
    fn bind_mounts_are_counted_once() {
        let volumes = dedup_by_device(vec![
            volume("/dev/nvme0n1p2", "/", 100, 40),
            volume("/dev/nvme0n1p2", "/home", 100, 40),
            volume("/dev/sda1", "/data", 300, 150),
            volume("overlay", "/run/empty", 0, 0),
        ]);

        let mut readings = summarize(&volumes);
        assert_eq!(readings.take("count"), Some(Ok(FieldValue::Integer(2))));
        assert_eq!(readings.take("total_gb"), Some(Ok(FieldValue::Float(400.0))));
        assert_eq!(readings.take("used_gb"), Some(Ok(FieldValue::Float(210.0))));
        assert_eq!(readings.take("free_gb"), Some(Ok(FieldValue::Float(190.0))));
        assert_eq!(readings.take("usage_percent"), Some(Ok(FieldValue::Float(52.5))));
        assert_eq!(
            readings.take("devices"),
            Some(Ok(FieldValue::Text(
                "/dev/nvme0n1p2 (/, ext4, SSD), /dev/sda1 (/data, ext4, SSD)".to_string()
            )))
        );
    }

    #[test]
    fn no_disks_reports_zero_count_and_unavailable_sizes() {
        let mut readings = summarize(&[]);
        assert_eq!(readings.take("count"), Some(Ok(FieldValue::Integer(0))));
        assert!(matches!(
            readings.take("total_gb"),
            Some(Err(ProbeError::Failed(_)))
        ));
    }
}
