//! Interface discovery and live MAC reads.
//!
//! The primary source is sysfs (`/sys/class/net`); `ip -o link show` is the
//! fallback for systems without it. The backend is probed once at startup.
//! When both sources are usable they can be cross-checked for a single
//! interface; a disagreement is surfaced, never auto-resolved.

use std::path::Path;
use std::process::Command;

use crate::error::{MacShiftError, Result};
use crate::link::command_on_path;
use crate::mac::MacAddress;

const SYSFS_NET: &str = "/sys/class/net";

/// A discovered interface and its live MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac: MacAddress,
}

/// Read access to the live interface set, mockable for orchestrator tests.
pub trait Inventory {
    /// All non-loopback interfaces with their current MACs, in stable
    /// (name-sorted) order.
    fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>>;

    /// Current MAC of a named interface from the probed backend.
    fn current_mac(&self, name: &str) -> Result<MacAddress>;

    /// Current MAC, cross-checked against the secondary source when both
    /// are usable. Disagreement is `InventoryInconsistent`.
    fn current_mac_checked(&self, name: &str) -> Result<MacAddress>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Sysfs,
    IpCommand,
}

pub struct InterfaceInventory {
    backend: Backend,
}

impl InterfaceInventory {
    /// Probe available discovery sources once. Prefers sysfs; falls back to
    /// the `ip` command when sysfs is absent.
    ///
    /// # Errors
    ///
    /// Returns `LinkToolMissing` if neither source is usable.
    pub fn probe() -> Result<Self> {
        if Path::new(SYSFS_NET).is_dir() {
            log::debug!("interface inventory backed by {SYSFS_NET}");
            return Ok(Self {
                backend: Backend::Sysfs,
            });
        }
        if command_on_path("ip") {
            log::debug!("sysfs unavailable, interface inventory backed by 'ip'");
            return Ok(Self {
                backend: Backend::IpCommand,
            });
        }
        Err(MacShiftError::LinkToolMissing)
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains('/') || name.contains('\0') {
            return Err(MacShiftError::InterfaceNotFound {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn sysfs_list() -> Result<Vec<InterfaceInfo>> {
        let entries = std::fs::read_dir(SYSFS_NET)
            .map_err(|e| MacShiftError::io_error(format!("reading {SYSFS_NET}"), e))?;

        let mut interfaces = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MacShiftError::io_error("reading sysfs entry", e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == "lo" {
                continue;
            }
            match Self::sysfs_mac(&name) {
                Ok(mac) => interfaces.push(InterfaceInfo { name, mac }),
                // Interfaces without a readable address (e.g. some virtual
                // devices) are not candidates for MAC changes.
                Err(e) => log::debug!("skipping {name}: {e}"),
            }
        }
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }

    fn sysfs_mac(name: &str) -> Result<MacAddress> {
        Self::validate_name(name)?;
        let path = format!("{SYSFS_NET}/{name}/address");
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MacShiftError::InterfaceNotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(MacShiftError::io_error(format!("reading {path}"), e)),
        };
        text.trim().parse().map_err(|_| MacShiftError::Io {
            operation: format!("parsing {path}"),
            source: std::io::Error::other(format!("unexpected contents '{}'", text.trim())),
        })
    }

    fn ip_list() -> Result<Vec<InterfaceInfo>> {
        let output = Command::new("ip")
            .args(["-o", "link", "show"])
            .output()
            .map_err(|e| MacShiftError::io_error("running 'ip -o link show'", e))?;
        if !output.status.success() {
            return Err(MacShiftError::Io {
                operation: "running 'ip -o link show'".to_string(),
                source: std::io::Error::other(format!("exit status {}", output.status)),
            });
        }
        let mut interfaces = parse_ip_link_output(&String::from_utf8_lossy(&output.stdout));
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }

    fn ip_mac(name: &str) -> Result<MacAddress> {
        Self::validate_name(name)?;
        let output = Command::new("ip")
            .args(["-o", "link", "show", "dev", name])
            .output()
            .map_err(|e| MacShiftError::io_error("running 'ip -o link show dev'", e))?;
        if !output.status.success() {
            return Err(MacShiftError::InterfaceNotFound {
                name: name.to_string(),
            });
        }
        parse_ip_link_output(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .find(|i| i.name == name)
            .map(|i| i.mac)
            .ok_or_else(|| MacShiftError::InterfaceNotFound {
                name: name.to_string(),
            })
    }
}

impl Inventory for InterfaceInventory {
    fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        match self.backend {
            Backend::Sysfs => Self::sysfs_list(),
            Backend::IpCommand => Self::ip_list(),
        }
    }

    fn current_mac(&self, name: &str) -> Result<MacAddress> {
        match self.backend {
            Backend::Sysfs => Self::sysfs_mac(name),
            Backend::IpCommand => Self::ip_mac(name),
        }
    }

    fn current_mac_checked(&self, name: &str) -> Result<MacAddress> {
        let primary = self.current_mac(name)?;

        let secondary = match self.backend {
            Backend::Sysfs if command_on_path("ip") => Self::ip_mac(name),
            Backend::IpCommand if Path::new(SYSFS_NET).is_dir() => Self::sysfs_mac(name),
            _ => return Ok(primary),
        };

        reconcile_sources(name, self.backend, primary, secondary)
    }
}

/// Compare a primary read against the secondary source's answer for the
/// same interface. Agreement passes the value through; a disagreement is
/// surfaced with both values attributed to their source; a secondary that
/// cannot answer is unavailable, not a disagreement.
fn reconcile_sources(
    interface: &str,
    backend: Backend,
    primary: MacAddress,
    secondary: Result<MacAddress>,
) -> Result<MacAddress> {
    match secondary {
        Ok(other) if other == primary => Ok(primary),
        Ok(other) => {
            let (sysfs, ip) = match backend {
                Backend::Sysfs => (primary, other),
                Backend::IpCommand => (other, primary),
            };
            Err(MacShiftError::InventoryInconsistent {
                interface: interface.to_string(),
                sysfs: sysfs.to_string(),
                ip: ip.to_string(),
            })
        }
        Err(e) => {
            log::debug!("secondary inventory source unavailable for {interface}: {e}");
            Ok(primary)
        }
    }
}

/// Parse `ip -o link show` output into interface/MAC pairs.
///
/// Lines look like:
/// `2: eth0: <BROADCAST,...> mtu 1500 ... link/ether 00:17:5d:39:2b:3b brd ff:...`
/// Loopback (`link/loopback`) is excluded, and `@`-suffixed names
/// (`eth0@if2`) are trimmed to the device name.
fn parse_ip_link_output(output: &str) -> Vec<InterfaceInfo> {
    let mut interfaces = Vec::new();
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let Some(_index) = fields.next() else { continue };
        let Some(raw_name) = fields.next() else { continue };
        let name = raw_name
            .trim_end_matches(':')
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        if name.is_empty() || name == "lo" {
            continue;
        }

        let tokens: Vec<&str> = fields.collect();
        let mac = tokens
            .windows(2)
            .find(|pair| pair[0] == "link/ether")
            .and_then(|pair| pair[1].parse::<MacAddress>().ok());
        if let Some(mac) = mac {
            interfaces.push(InterfaceInfo { name, mac });
        }
    }
    interfaces
}
