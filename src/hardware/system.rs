//! Operating system, host and uptime information

use anyhow::Context;
use chrono::{DateTime, Local};
use sysinfo::{ProcessesToUpdate, System};

use super::field::Readings;

pub(crate) fn probe() -> Readings {
    Readings::new()
        .read_opt("os_name", System::name)
        .read_opt("os_version", System::os_version)
        .read_opt("kernel_version", System::kernel_version)
        .read_opt("host_name", System::host_name)
        .read("architecture", || Ok(std::env::consts::ARCH))
        .read("boot_time", || format_boot_time(System::boot_time()))
        .read("uptime", || Ok(format_uptime(System::uptime())))
        .read("process_count", || {
            let mut sys = System::new();
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let count = sys.processes().len();
            if count == 0 {
                anyhow::bail!("process table is empty");
            }
            Ok(count)
        })
}

/// Boot time as local wall-clock time.
fn format_boot_time(epoch_secs: u64) -> anyhow::Result<String> {
    if epoch_secs == 0 {
        anyhow::bail!("boot time not reported");
    }
    let secs = i64::try_from(epoch_secs).context("boot time out of range")?;
    let boot = DateTime::from_timestamp(secs, 0).context("boot time out of range")?;
    Ok(boot
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string())
}

/// Uptime as `Xd Xh Xm Xs`.
fn format_uptime(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{days}d {hours}h {minutes}m {seconds}s")
}
