//! Windows adapter enumeration through WMI

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use wmi::{COMLibrary, WMIConnection};

use super::{AdapterRecord, IdentityProvider, NetworkIdentity, local_hostname, summarize, user_profile_dir};
use crate::constants::identity::PHYSICAL_PNP_PREFIXES;

#[derive(Deserialize, Debug)]
#[serde(rename = "Win32_NetworkAdapter")]
struct NetworkAdapter {
    #[serde(rename = "MACAddress")]
    mac_address: Option<String>,
    #[serde(rename = "PNPDeviceID")]
    pnp_device_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename = "Win32_NetworkAdapterConfiguration")]
struct NetworkAdapterConfiguration {
    #[serde(rename = "MACAddress")]
    mac_address: Option<String>,
    #[serde(rename = "IPEnabled")]
    ip_enabled: Option<bool>,
    #[serde(rename = "IPAddress")]
    ip_address: Option<Vec<String>>,
}

/// Physical adapters are those whose PNP device id starts with PCI or USB.
///
/// COM is initialized per call and released when the [`COMLibrary`] guard
/// drops, so this is safe to call from any worker thread.
pub struct WindowsIdentityProvider;

impl IdentityProvider for WindowsIdentityProvider {
    fn fetch(&self) -> Result<NetworkIdentity> {
        let com = COMLibrary::new().context("Failed to initialize COM")?;
        let wmi = WMIConnection::new(com).context("Failed to connect to WMI")?;

        let adapters: Vec<NetworkAdapter> = wmi
            .raw_query("SELECT MACAddress, PNPDeviceID FROM Win32_NetworkAdapter")
            .context("Failed to query Win32_NetworkAdapter")?;
        let configs: Vec<NetworkAdapterConfiguration> = wmi
            .raw_query("SELECT MACAddress, IPEnabled, IPAddress FROM Win32_NetworkAdapterConfiguration")
            .context("Failed to query Win32_NetworkAdapterConfiguration")?;

        debug!(adapters = adapters.len(), configs = configs.len(), "WMI adapter query complete");

        let (ip_addresses, mac_addresses) = summarize(join_tables(adapters, configs));

        Ok(NetworkIdentity {
            hostname: local_hostname(),
            ip_addresses,
            mac_addresses,
            user_profile: user_profile_dir(),
        })
    }
}

fn is_physical_pnp(pnp_device_id: &str) -> bool {
    PHYSICAL_PNP_PREFIXES.iter().any(|prefix| pnp_device_id.starts_with(prefix))
}

/// Adapter rows contribute MACs; configuration rows contribute IPs, and
/// count as physical only when their MAC belongs to a physical adapter.
fn join_tables(adapters: Vec<NetworkAdapter>, configs: Vec<NetworkAdapterConfiguration>) -> Vec<AdapterRecord> {
    let mut physical_macs = HashSet::new();
    let mut records = Vec::new();

    for adapter in adapters {
        if let (Some(mac), Some(pnp)) = (adapter.mac_address, adapter.pnp_device_id) {
            if is_physical_pnp(&pnp) {
                physical_macs.insert(mac.clone());
                records.push(AdapterRecord {
                    mac: Some(mac),
                    physical: true,
                    ..AdapterRecord::default()
                });
            }
        }
    }

    for config in configs {
        let Some(mac) = config.mac_address else {
            continue;
        };
        records.push(AdapterRecord {
            physical: physical_macs.contains(&mac),
            enabled: config.ip_enabled.unwrap_or(false),
            addresses: config.ip_address.unwrap_or_default(),
            mac: Some(mac),
        });
    }

    records
}
