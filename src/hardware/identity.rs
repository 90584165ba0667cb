//! Machine identity
//!
//! `machine_uuid` is the OS installation id (`/etc/machine-id`, `MachineGuid`,
//! `IOPlatformUUID`) read through machine-uid. Ids that are not already UUIDs
//! are hashed into a stable v5 UUID. `product_uuid` is the SMBIOS system UUID.

use anyhow::{Context, Result};
use uuid::Uuid;

use super::field::Readings;

/// Namespace prefix for hashed machine ids.
const NAMESPACE_BYTES: &[u8] = b"node-hardware-id";

pub(crate) fn probe() -> Readings {
    Readings::new()
        .read("machine_uuid", machine_uuid)
        .read("product_uuid", product_uuid)
}

fn machine_uuid() -> Result<String> {
    let machine_id = machine_uid::get()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to read machine id")?;
    Ok(normalize_machine_id(machine_id.trim()).to_string())
}

fn normalize_machine_id(machine_id: &str) -> Uuid {
    match Uuid::parse_str(machine_id) {
        Ok(uuid) => uuid,
        Err(parse_err) => {
            tracing::debug!(
                machine_id = %machine_id,
                error = %parse_err,
                "Machine id is not a UUID, hashing it"
            );
            let combined = [NAMESPACE_BYTES, b":", machine_id.as_bytes()].concat();
            Uuid::new_v5(&Uuid::NAMESPACE_DNS, &combined)
        }
    }
}

#[cfg(target_os = "linux")]
fn product_uuid() -> Result<String> {
    let path = std::path::Path::new(super::platform::DMI_DIR).join("product_uuid");
    let raw = super::platform::read_attr(path).context("product_uuid is readable by root only")?;
    parse_product_uuid(&raw)
}

#[cfg(target_os = "windows")]
fn product_uuid() -> Result<String> {
    let row = super::platform::wmic_first(&["csproduct"], "UUID")?;
    parse_product_uuid(&super::platform::wmi_value(&row, "UUID")?)
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn product_uuid() -> Result<String> {
    super::platform::unsupported()
}

/// Firmware reports all-zero or all-F UUIDs when the OEM never set one.
fn parse_product_uuid(raw: &str) -> Result<String> {
    let uuid = Uuid::parse_str(raw.trim())
        .with_context(|| format!("Invalid product UUID `{}`", raw.trim()))?;
    if uuid.is_nil() || uuid.as_bytes().iter().all(|b| *b == 0xff) {
        anyhow::bail!("product UUID is unset ({uuid})");
    }
    Ok(uuid.hyphenated().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_id_normalization_is_stable() {
        // systemd machine ids are 32 hex digits without hyphens.
        let id = "4c4c4544004a4d1080325ac04f4d3233";
        assert_eq!(
            normalize_machine_id(id).to_string(),
            "4c4c4544-004a-4d10-8032-5ac04f4d3233"
        );

        let hashed = normalize_machine_id("not-a-uuid");
        assert_eq!(hashed, normalize_machine_id("not-a-uuid"));
        assert_eq!(hashed.get_version_num(), 5);
    }

    #[test]
    fn unset_product_uuids_are_rejected() {
        assert!(parse_product_uuid("00000000-0000-0000-0000-000000000000").is_err());
        assert!(parse_product_uuid("FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF").is_err());
        assert!(parse_product_uuid("garbage").is_err());
        assert_eq!(
            parse_product_uuid("4c4c4544-004a-4d10-8032-b5c04f4d3233\n").unwrap(),
            "4C4C4544-004A-4D10-8032-B5C04F4D3233"
        );
    }
}
