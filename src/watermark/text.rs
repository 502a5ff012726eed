//! Watermark text assembly

use crate::constants::labels;
use crate::identity::{NetworkIdentity, is_link_local};

/// Which identity fields go into the watermark, plus a free-text remark.
///
/// Captured once when an operation starts and passed by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkOptions {
    pub include_hostname: bool,
    pub include_ip: bool,
    pub include_mac: bool,
    /// May span several lines; empty means no remark block
    pub remark: String,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            include_hostname: true,
            include_ip: true,
            include_mac: true,
            remark: String::new(),
        }
    }
}

impl WatermarkOptions {
    /// Everything off, empty remark
    pub fn cleared() -> Self {
        Self {
            include_hostname: false,
            include_ip: false,
            include_mac: false,
            remark: String::new(),
        }
    }

    /// True when no field is selected and the remark is blank
    pub fn is_empty(&self) -> bool {
        !self.include_hostname && !self.include_ip && !self.include_mac && self.remark.trim().is_empty()
    }
}

/// `label + first` followed by indented continuation lines
fn push_block<S: AsRef<str>>(lines: &mut Vec<String>, label: &str, items: &[S]) {
    let Some((first, rest)) = items.split_first() else {
        return;
    };
    lines.push(format!("{label}{}", first.as_ref()));
    lines.extend(rest.iter().map(|item| format!("{}{}", labels::CONTINUATION, item.as_ref())));
}

/// Ordered watermark lines: hostname, IP block, MAC block, remark block
pub fn assemble_lines(identity: &NetworkIdentity, options: &WatermarkOptions) -> Vec<String> {
    let mut lines = Vec::new();

    if options.include_hostname {
        lines.push(format!("{}{}", labels::HOSTNAME, identity.hostname));
    }
    if options.include_ip {
        let ips: Vec<&str> = identity
            .ip_addresses
            .iter()
            .map(String::as_str)
            .filter(|ip| !is_link_local(ip))
            .collect();
        push_block(&mut lines, labels::IP, &ips);
    }
    if options.include_mac {
        push_block(&mut lines, labels::MAC, &identity.mac_addresses);
    }
    if !options.remark.trim().is_empty() {
        let remark: Vec<&str> = options
            .remark
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        push_block(&mut lines, labels::REMARK, &remark);
    }

    lines
}

/// Full watermark text, or `None` when it would be blank
pub fn assemble_text(identity: &NetworkIdentity, options: &WatermarkOptions) -> Option<String> {
    let text = assemble_lines(identity, options).join("\n");
    (!text.trim().is_empty()).then_some(text)
}
