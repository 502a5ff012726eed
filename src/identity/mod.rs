//! Host network identity
//!
//! The OS-facing side lives in one module per platform behind
//! [`IdentityProvider`]; the correct one is re-exported as
//! `NativeIdentityProvider`. Filtering rules shared by every platform
//! (link-local exclusion, de-duplication in enumeration order) live here.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::constants::identity::{LINK_LOCAL_PREFIX, UNKNOWN_HOSTNAME};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixIdentityProvider as NativeIdentityProvider;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsIdentityProvider as NativeIdentityProvider;

/// Immutable snapshot of the host's identity, taken once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub hostname: String,
    /// Enabled physical adapters only, enumeration order
    pub ip_addresses: Vec<String>,
    /// All physical adapters, enumeration order
    pub mac_addresses: Vec<String>,
    pub user_profile: PathBuf,
}

impl NetworkIdentity {
    /// Identity carrying only what is available without adapter enumeration
    pub fn minimal() -> Self {
        Self {
            hostname: local_hostname(),
            ip_addresses: Vec::new(),
            mac_addresses: Vec::new(),
            user_profile: user_profile_dir(),
        }
    }
}

/// Source of [`NetworkIdentity`] snapshots
pub trait IdentityProvider: Send + Sync {
    fn fetch(&self) -> Result<NetworkIdentity>;
}

/// Fetch identity, degrading to hostname and profile only when adapter
/// enumeration fails
pub fn fetch_or_minimal(provider: &dyn IdentityProvider) -> NetworkIdentity {
    match provider.fetch() {
        Ok(identity) => {
            info!(
                hostname = %identity.hostname,
                ips = identity.ip_addresses.len(),
                macs = identity.mac_addresses.len(),
                "Fetched network identity"
            );
            identity
        }
        Err(e) => {
            warn!(error = ?e, "Adapter enumeration failed, continuing with hostname only");
            NetworkIdentity::minimal()
        }
    }
}

/// One adapter (or adapter configuration row) as reported by the OS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterRecord {
    pub mac: Option<String>,
    /// Backed by real hardware (PCI/USB) rather than a software adapter
    pub physical: bool,
    /// IP stack enabled / interface up
    pub enabled: bool,
    pub addresses: Vec<String>,
}

/// Reduce adapter records to the (IPs, MACs) pair of a [`NetworkIdentity`]
///
/// MACs come from every physical adapter; IPs only from physical adapters
/// that are enabled, minus link-local. Both keep enumeration order.
pub fn summarize(records: impl IntoIterator<Item = AdapterRecord>) -> (Vec<String>, Vec<String>) {
    let mut ips = Vec::new();
    let mut macs = Vec::new();

    for record in records.into_iter().filter(|r| r.physical) {
        if let Some(mac) = record.mac.filter(|m| !m.trim().is_empty()) {
            push_unique(&mut macs, mac.trim().to_string());
        }
        if !record.enabled {
            continue;
        }
        for ip in record.addresses {
            if !is_link_local(&ip) {
                push_unique(&mut ips, ip.trim().to_string());
            }
        }
    }

    (ips, macs)
}

/// IPv6 link-local addresses (`fe80::/10` as written by the OS) are excluded
pub fn is_link_local(ip: &str) -> bool {
    ip.trim()
        .get(..LINK_LOCAL_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(LINK_LOCAL_PREFIX))
}

/// Append `value` unless it is already present, keeping first-seen order
pub(crate) fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Effective computer name
pub fn local_hostname() -> String {
    #[cfg(windows)]
    let name = std::env::var("COMPUTERNAME").ok();

    #[cfg(unix)]
    let name = nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok());

    #[cfg(not(any(unix, windows)))]
    let name: Option<String> = None;

    name.filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string())
}

/// Current user's profile directory
pub fn user_profile_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

/// Provider returning a fixed snapshot
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider(pub NetworkIdentity);

#[cfg(test)]
impl IdentityProvider for StaticIdentityProvider {
    fn fetch(&self) -> Result<NetworkIdentity> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    impl IdentityProvider for FailingProvider {
        fn fetch(&self) -> Result<NetworkIdentity> {
            anyhow::bail!("WMI unavailable")
        }
    }

    #[test]
    fn test_link_local_detection() {
        assert!(is_link_local("fe80::1"));
        assert!(is_link_local("FE80::abcd:1"));
        assert!(!is_link_local("192.168.1.5"));
        assert!(!is_link_local("2001:db8::1"));
        assert!(!is_link_local("fe8"));
    }

    #[test]
    fn test_push_unique_keeps_first_occurrence_order() {
        let mut list = Vec::new();
        for value in ["b", "a", "b", "c", "a"] {
            push_unique(&mut list, value.to_string());
        }
        assert_eq!(list, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_summarize_filters_virtual_disabled_and_link_local() {
        let records = vec![
            AdapterRecord {
                mac: Some("AA:BB:CC:DD:EE:FF".to_string()),
                physical: true,
                enabled: true,
                addresses: vec!["192.168.1.5".to_string(), "fe80::1".to_string()],
            },
            AdapterRecord {
                mac: Some("00:15:5D:00:00:01".to_string()),
                physical: false,
                enabled: true,
                addresses: vec!["172.17.0.1".to_string()],
            },
            AdapterRecord {
                mac: Some("11:22:33:44:55:66".to_string()),
                physical: true,
                enabled: false,
                addresses: vec!["10.0.0.9".to_string()],
            },
        ];

        let (ips, macs) = summarize(records);

        assert_eq!(ips, vec!["192.168.1.5"]);
        assert_eq!(macs, vec!["AA:BB:CC:DD:EE:FF", "11:22:33:44:55:66"]);
    }

    #[test]
    fn test_summarize_keeps_enumeration_order_without_sorting() {
        let records = vec![
            AdapterRecord {
                mac: Some("FF:00:00:00:00:01".to_string()),
                physical: true,
                enabled: true,
                addresses: vec!["10.0.0.20".to_string()],
            },
            AdapterRecord {
                mac: Some("00:00:00:00:00:02".to_string()),
                physical: true,
                enabled: true,
                addresses: vec!["10.0.0.3".to_string(), "10.0.0.20".to_string()],
            },
        ];

        let (ips, macs) = summarize(records);

        assert_eq!(ips, vec!["10.0.0.20", "10.0.0.3"]);
        assert_eq!(macs, vec!["FF:00:00:00:00:01", "00:00:00:00:00:02"]);
    }

    #[test]
    fn test_fetch_or_minimal_falls_back_on_error() {
        let identity = fetch_or_minimal(&FailingProvider);
        assert!(identity.ip_addresses.is_empty());
        assert!(identity.mac_addresses.is_empty());
        assert!(!identity.hostname.is_empty());
    }

    #[test]
    fn test_static_provider_returns_snapshot() {
        let snapshot = NetworkIdentity {
            hostname: "PC1".to_string(),
            ip_addresses: vec!["10.0.0.2".to_string()],
            mac_addresses: vec!["AA:BB:CC:DD:EE:FF".to_string()],
            user_profile: PathBuf::from("/home/pc1"),
        };
        let identity = fetch_or_minimal(&StaticIdentityProvider(snapshot.clone()));
        assert_eq!(identity, snapshot);
    }
}
