//! RAM detection module
//!
//! Physical memory and swap usage from sysinfo. Sizes are reported in GiB,
//! rounded to two decimals.

use sysinfo::System;

use super::field::{bytes_to_gb, percent, Readings};

pub(crate) fn probe() -> Readings {
    let mut sys = System::new();
    sys.refresh_memory();

    let total = sys.total_memory();
    let available = sys.available_memory();
    // Some platforms report used memory including caches; derive it from
    // available memory so used + available == total.
    let used = total.saturating_sub(available);

    let swap_total = sys.total_swap();
    let swap_used = sys.used_swap();

    Readings::new()
        .read("total_gb", || {
            if total == 0 {
                anyhow::bail!("memory size not reported");
            }
            Ok(bytes_to_gb(total))
        })
        .read("available_gb", || {
            require_total(total)?;
            Ok(bytes_to_gb(available))
        })
        .read("used_gb", || {
            require_total(total)?;
            Ok(bytes_to_gb(used))
        })
        .read("usage_percent", || {
            require_total(total)?;
            Ok(percent(used, total))
        })
        // No swap configured is a legitimate zero, not a failed read.
        .read("swap_total_gb", || Ok(bytes_to_gb(swap_total)))
        .read("swap_used_gb", || Ok(bytes_to_gb(swap_used)))
        .read("swap_percent", || Ok(percent(swap_used, swap_total)))
}

fn require_total(total: u64) -> anyhow::Result<()> {
    if total == 0 {
        anyhow::bail!("memory size not reported");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::FieldValue;

    #[test]
    fn used_and_available_add_up_to_total() {
        let mut readings = probe();
        let value = |r: Option<super::super::field::Reading>| match r {
            Some(Ok(FieldValue::Float(v))) => v,
            other => panic!("unexpected reading {other:?}"),
        };

        let total = value(readings.take("total_gb"));
        let used = value(readings.take("used_gb"));
        let available = value(readings.take("available_gb"));

        assert!(total > 0.0);
        // Each side is rounded independently.
        assert!((used + available - total).abs() <= 0.02);
    }
}
