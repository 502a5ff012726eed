//! Unix adapter enumeration via `getifaddrs` and sysfs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use tracing::debug;

use super::{AdapterRecord, IdentityProvider, NetworkIdentity, local_hostname, summarize, user_profile_dir};
use crate::constants::identity::SYSFS_NET;

/// Physical means the interface has a backing bus device in sysfs
/// (`/sys/class/net/<if>/device`); bridges, veths, tun/tap and loopback
/// have none.
pub struct UnixIdentityProvider;

impl IdentityProvider for UnixIdentityProvider {
    fn fetch(&self) -> Result<NetworkIdentity> {
        let records = enumerate_adapters(Path::new(SYSFS_NET))?;
        let (ip_addresses, mac_addresses) = summarize(records);

        Ok(NetworkIdentity {
            hostname: local_hostname(),
            ip_addresses,
            mac_addresses,
            user_profile: user_profile_dir(),
        })
    }
}

fn enumerate_adapters(sysfs_net: &Path) -> Result<Vec<AdapterRecord>> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, AdapterRecord> = HashMap::new();

    for ifaddr in getifaddrs().context("Failed to enumerate interface addresses")? {
        let name = ifaddr.interface_name.clone();
        let record = by_name.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            AdapterRecord {
                physical: sysfs_net.join(&name).join("device").exists(),
                enabled: ifaddr.flags.contains(InterfaceFlags::IFF_UP),
                ..AdapterRecord::default()
            }
        });

        let Some(address) = ifaddr.address else {
            continue;
        };
        if let Some(v4) = address.as_sockaddr_in() {
            record.addresses.push(v4.ip().to_string());
        } else if let Some(v6) = address.as_sockaddr_in6() {
            record.addresses.push(v6.ip().to_string());
        } else if let Some(mac) = address.as_link_addr().and_then(|link| link.addr()) {
            if mac.iter().any(|b| *b != 0) {
                record.mac = Some(format_mac(&mac));
            }
        }
    }

    let records = order
        .into_iter()
        .filter_map(|name| {
            let mut record = by_name.remove(&name)?;
            if record.mac.is_none() {
                record.mac = read_sysfs_mac(sysfs_net, &name);
            }
            debug!(interface = %name, physical = record.physical, enabled = record.enabled, addresses = ?record.addresses, "Enumerated interface");
            Some(record)
        })
        .collect();

    Ok(records)
}

fn read_sysfs_mac(sysfs_net: &Path, interface: &str) -> Option<String> {
    let raw = fs::read_to_string(sysfs_net.join(interface).join("address")).ok()?;
    let mac = raw.trim().to_ascii_uppercase();
    (!mac.is_empty() && mac != "00:00:00:00:00:00").then_some(mac)
}

/// Upper-case, colon separated, as Windows reports adapter MACs
fn format_mac(bytes: &[u8; 6]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
