//! Battery detection module (starship-battery, cross-platform)
//!
//! Desktops without a battery report `present = false`; the remaining fields
//! are then unavailable.

use anyhow::{Context, Result};
use starship_battery::{Manager, State};

use super::field::{round2, Readings};

/// First battery's status, reduced to what the report shows.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatteryStatus {
    pub percent: f64,
    pub state: State,
    pub seconds_left: Option<u64>,
}

impl BatteryStatus {
    fn plugged_in(&self) -> bool {
        !matches!(self.state, State::Discharging | State::Empty)
    }
}

pub(crate) fn probe() -> Readings {
    match first_battery() {
        Ok(status) => from_status(status),
        Err(e) => Readings::new().read("present", || -> Result<bool> { Err(e) }),
    }
}

fn first_battery() -> Result<Option<BatteryStatus>> {
    let manager = Manager::new().context("Failed to open battery manager")?;
    let mut batteries = manager.batteries().context("Failed to enumerate batteries")?;

    let Some(battery) = batteries.next() else {
        tracing::debug!("No battery detected");
        return Ok(None);
    };
    let battery = battery.context("Failed to read battery")?;

    // state_of_charge is a 0.0-1.0 ratio.
    let charge = f64::from(battery.state_of_charge().value) * 100.0;
    Ok(Some(BatteryStatus {
        percent: round2(charge.clamp(0.0, 100.0)),
        state: battery.state(),
        seconds_left: battery
            .time_to_empty()
            .map(|t| t.value)
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs as u64),
    }))
}

fn from_status(status: Option<BatteryStatus>) -> Readings {
    let readings = Readings::new().read("present", || Ok(status.is_some()));
    let Some(status) = status else {
        return readings;
    };

    readings
        .read("percent", || Ok(status.percent))
        .read("state", || Ok(state_label(status.state)))
        .read("plugged_in", || Ok(status.plugged_in()))
        .read_opt("seconds_left", || status.seconds_left)
}

fn state_label(state: State) -> &'static str {
    match state {
        State::Charging => "Charging",
        State::Discharging => "Discharging",
        State::Full => "Full",
        State::Empty => "Empty",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{FieldValue, ProbeError};

    #[test]
    fn no_battery_is_reported_as_absent() {
        let mut readings = from_status(None);
        assert_eq!(readings.take("present"), Some(Ok(FieldValue::Bool(false))));
        assert_eq!(readings.take("percent"), None);
    }

    #[test]
    fn discharging_battery_is_not_plugged_in() {
        let mut readings = from_status(Some(BatteryStatus {
            percent: 57.5,
            state: State::Discharging,
            seconds_left: Some(5400),
        }));

        assert_eq!(readings.take("present"), Some(Ok(FieldValue::Bool(true))));
        assert_eq!(readings.take("percent"), Some(Ok(FieldValue::Float(57.5))));
        assert_eq!(
            readings.take("state"),
            Some(Ok(FieldValue::Text("Discharging".to_string())))
        );
        assert_eq!(readings.take("plugged_in"), Some(Ok(FieldValue::Bool(false))));
        assert_eq!(readings.take("seconds_left"), Some(Ok(FieldValue::Integer(5400))));
    }

    #[test]
    fn charging_battery_has_no_time_left() {
        let mut readings = from_status(Some(BatteryStatus {
            percent: 80.0,
            state: State::Charging,
            seconds_left: None,
        }));

        assert_eq!(readings.take("plugged_in"), Some(Ok(FieldValue::Bool(true))));
        assert_eq!(readings.take("seconds_left"), Some(Err(ProbeError::Missing)));
    }
}
