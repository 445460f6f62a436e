//! Best-effort hardware-identity lookup via the kernel's ARP table.
//!
//! Maps a client IP to a MAC address by scanning `/proc/net/arp`. Only
//! works for hosts on the local segment; anything routed, expired or simply
//! absent resolves to `None`, which is fine — identity is an audit nicety,
//! never a gate.

use std::net::IpAddr;

use crate::app::ports::IdentityPort;

const ARP_TABLE: &str = "/proc/net/arp";

pub struct ArpIdentity;

impl ArpIdentity {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityPort for ArpIdentity {
    fn hardware_id(&self, addr: IpAddr) -> Option<String> {
        let table = std::fs::read_to_string(ARP_TABLE).ok()?;
        lookup(&table, addr)
    }
}

/// Scan one ARP-table dump for `addr`. Incomplete entries (the kernel keeps
/// rows with an all-zero MAC while resolution is pending) are skipped.
fn lookup(table: &str, addr: IpAddr) -> Option<String> {
    let needle = addr.to_string();
    for line in table.lines().skip(1) {
        let mut fields = line.split_whitespace();
        if fields.next() != Some(needle.as_str()) {
            continue;
        }
        // Remaining columns: HW type, Flags, HW address, ...
        let Some(mac) = fields.nth(2) else { continue };
        if mac == "00:00:00:00:00:00" {
            return None;
        }
        return Some(mac.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         a4:2b:b0:c9:4a:30     *        eth0
192.168.1.168    0x1         0x2         00:1b:44:11:3a:b7     *        eth0
192.168.1.99     0x1         0x0         00:00:00:00:00:00     *        eth0
";

    #[test]
    fn finds_mac_for_known_address() {
        let addr: IpAddr = "192.168.1.168".parse().unwrap();
        assert_eq!(lookup(SAMPLE, addr), Some("00:1b:44:11:3a:b7".into()));
    }

    #[test]
    fn unknown_address_is_none() {
        let addr: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(lookup(SAMPLE, addr), None);
    }

    #[test]
    fn incomplete_entry_is_none() {
        let addr: IpAddr = "192.168.1.99".parse().unwrap();
        assert_eq!(lookup(SAMPLE, addr), None);
    }

    #[test]
    fn empty_table_is_none() {
        let addr: IpAddr = "192.168.1.1".parse().unwrap();
        assert_eq!(lookup("", addr), None);
    }
}
