//! Network adapter detection module
//!
//! Interfaces, addresses and cumulative traffic come from sysinfo; the primary
//! address (the one on the default route) comes from `local-ip-address`.

use std::net::IpAddr;

use anyhow::Context;
use sysinfo::Networks;

use super::field::{bytes_to_mb, Readings};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Interface {
    pub name: String,
    pub mac: Option<String>,
    pub addresses: Vec<IpAddr>,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

pub(crate) fn probe() -> Readings {
    let interfaces = list_interfaces();
    let primary_ip = local_ip_address::local_ip();

    Readings::new()
        .read("interface_count", || Ok(interfaces.len()))
        .read("interfaces", || {
            require_interfaces(&interfaces)?;
            Ok(join(interfaces.iter().map(|i| i.name.clone())))
        })
        .read("primary_ip", || {
            let ip = primary_ip
                .as_ref()
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("no default route")?;
            Ok(ip.to_string())
        })
        .read("ipv4_addresses", || {
            let v4 = ipv4_addresses(&interfaces);
            if v4.is_empty() {
                anyhow::bail!("no IPv4 address assigned");
            }
            Ok(join(v4.into_iter()))
        })
        .read("mac_addresses", || {
            let macs: Vec<String> = interfaces.iter().filter_map(|i| i.mac.clone()).collect();
            if macs.is_empty() {
                anyhow::bail!("no hardware address reported");
            }
            Ok(join(macs.into_iter()))
        })
        .read("received_mb", || {
            require_interfaces(&interfaces)?;
            Ok(bytes_to_mb(interfaces.iter().map(|i| i.received_bytes).sum()))
        })
        .read("transmitted_mb", || {
            require_interfaces(&interfaces)?;
            Ok(bytes_to_mb(
                interfaces.iter().map(|i| i.transmitted_bytes).sum(),
            ))
        })
}

fn list_interfaces() -> Vec<Interface> {
    let networks = Networks::new_with_refreshed_list();

    let mut interfaces: Vec<Interface> = networks
        .list()
        .iter()
        .map(|(name, data)| {
            let mac = data.mac_address();
            Interface {
                name: name.clone(),
                // Loopback and tunnels report an all-zero address.
                mac: (!mac.is_unspecified()).then(|| mac.to_string()),
                addresses: data.ip_networks().iter().map(|net| net.addr).collect(),
                received_bytes: data.total_received(),
                transmitted_bytes: data.total_transmitted(),
            }
        })
        .collect();

    // HashMap order is arbitrary; keep the report stable between refreshes.
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(interfaces = interfaces.len(), "Enumerated network interfaces");
    interfaces
}

fn ipv4_addresses(interfaces: &[Interface]) -> Vec<String> {
    interfaces
        .iter()
        .flat_map(|i| i.addresses.iter())
        .filter(|addr| addr.is_ipv4() && !addr.is_loopback())
        .map(IpAddr::to_string)
        .collect()
}

fn require_interfaces(interfaces: &[Interface]) -> anyhow::Result<()> {
    if interfaces.is_empty() {
        anyhow::bail!("no network interfaces reported");
    }
    Ok(())
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_list_skips_loopback_and_v6() {
        let interfaces = vec![
            Interface {
                name: "eth0".to_string(),
                mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
                addresses: vec![
                    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
                    IpAddr::V6(Ipv6Addr::LOCALHOST),
                ],
                received_bytes: 0,
                transmitted_bytes: 0,
            },
            Interface {
                name: "lo".to_string(),
                mac: None,
                addresses: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
                received_bytes: 0,
                transmitted_bytes: 0,
            },
        ];

        assert_eq!(ipv4_addresses(&interfaces), vec!["192.168.1.20".to_string()]);
    }

    #[test]
    fn probe_always_reports_interface_count() {
        let mut readings = probe();
        assert!(matches!(readings.take("interface_count"), Some(Ok(_))));
    }
}
