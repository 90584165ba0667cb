//! Sound device detection module
//!
//! - Linux: ALSA card list in /proc/asound/cards
//! - Windows: WMI (`Win32_SoundDevice`)

use anyhow::Result;

use super::field::Readings;

pub(crate) fn probe() -> Readings {
    let listed = list_devices();
    let devices = || {
        listed
            .as_ref()
            .map_err(|e| anyhow::anyhow!("{e:#}"))
    };

    Readings::new()
        .read("device_count", || Ok(devices()?.len()))
        .read("devices", || {
            let devices = devices()?;
            if devices.is_empty() {
                anyhow::bail!("no sound devices");
            }
            Ok(devices.join(", "))
        })
}

#[cfg(target_os = "linux")]
fn list_devices() -> Result<Vec<String>> {
    use anyhow::Context;

    let cards = std::fs::read_to_string("/proc/asound/cards")
        .context("Failed to read /proc/asound/cards")?;
    Ok(parse_asound_cards(&cards))
}

#[cfg(target_os = "windows")]
fn list_devices() -> Result<Vec<String>> {
    let rows = super::platform::wmic_rows(&["sounddev"], "Name")?;
    Ok(rows
        .iter()
        .filter_map(|row| super::platform::wmi_value(row, "Name").ok())
        .collect())
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn list_devices() -> Result<Vec<String>> {
    super::platform::unsupported()
}

/// Parse ALSA's card list.
///
/// Each card spans two lines; the first one looks like
/// ` 0 [PCH            ]: HDA-Intel - HDA Intel PCH`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_asound_cards(cards: &str) -> Vec<String> {
    cards
        .lines()
        .filter(|line| {
            line.trim_start()
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .filter_map(|line| {
            let (_, description) = line.split_once("]: ")?;
            let name = description
                .split_once(" - ")
                .map_or(description, |(_, long_name)| long_name);
            Some(name.trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alsa_card_list() {
        let sample = concat!(
            " 0 [PCH            ]: HDA-Intel - HDA Intel PCH\n",
            "                      HDA Intel PCH at 0xf7f10000 irq 32\n",
            " 1 [NVidia         ]: HDA-Intel - HDA NVidia\n",
            "                      HDA NVidia at 0xf7080000 irq 17\n",
        );
        assert_eq!(
            parse_asound_cards(sample),
            vec!["HDA Intel PCH".to_string(), "HDA NVidia".to_string()]
        );
    }

    #[test]
    fn no_cards_file_content() {
        assert!(parse_asound_cards("--- no soundcards ---\n").is_empty());
    }
}
