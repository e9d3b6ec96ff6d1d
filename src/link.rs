//! Applying a MAC address through the system link tools.
//!
//! The change is a fixed sequence: bring the interface down, set the
//! address, bring it up. A failure while down or setting still attempts a
//! best-effort bring-up so the interface is never silently left down, then
//! the stage-tagged error propagates.
//!
//! Two command backends exist, `ip` (iproute2) and legacy `ifconfig`,
//! chosen once at startup by probing PATH.

use std::path::Path;
use std::process::Command;

use crate::error::{LinkStage, MacShiftError, Result};
use crate::mac::MacAddress;

/// Seam consumed by the orchestrator; mocked in tests.
pub trait LinkController {
    /// Drive down -> set -> up for the given interface and address.
    fn set_mac(&self, interface: &str, mac: &MacAddress) -> Result<()>;
}

/// Primitive per-stage link operations, split from the sequence so the
/// recovery behavior is testable without the system tools.
trait LinkCommands {
    fn link_down(&self, interface: &str) -> Result<()>;
    fn link_set_address(&self, interface: &str, mac: &MacAddress) -> Result<()>;
    fn link_up(&self, interface: &str) -> Result<()>;
}

/// Down -> set -> up. On a down/set failure the bring-up is still
/// attempted, then the stage-tagged error propagates.
fn run_change_sequence(
    commands: &dyn LinkCommands,
    interface: &str,
    mac: &MacAddress,
) -> Result<()> {
    if let Err(e) = commands.link_down(interface) {
        let _ = commands.link_up(interface);
        return Err(e);
    }
    if let Err(e) = commands.link_set_address(interface, mac) {
        let _ = commands.link_up(interface);
        return Err(e);
    }
    commands.link_up(interface)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkBackend {
    IpRoute2,
    Ifconfig,
}

pub struct SystemLinkController {
    backend: LinkBackend,
}

impl SystemLinkController {
    /// Pick a command backend from PATH, preferring iproute2.
    ///
    /// # Errors
    ///
    /// Returns `LinkToolMissing` if neither `ip` nor `ifconfig` is present.
    pub fn probe() -> Result<Self> {
        if command_on_path("ip") {
            log::debug!("link control backed by 'ip'");
            return Ok(Self {
                backend: LinkBackend::IpRoute2,
            });
        }
        if command_on_path("ifconfig") {
            log::debug!("'ip' not found, link control backed by 'ifconfig'");
            return Ok(Self {
                backend: LinkBackend::Ifconfig,
            });
        }
        Err(MacShiftError::LinkToolMissing)
    }

    fn run(&self, stage: LinkStage, interface: &str, args: &[&str]) -> Result<()> {
        let program = match self.backend {
            LinkBackend::IpRoute2 => "ip",
            LinkBackend::Ifconfig => "ifconfig",
        };
        log::debug!("running {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output().map_err(|e| {
            MacShiftError::LinkOperationFailed {
                stage,
                interface: interface.to_string(),
                reason: format!("failed to run '{program}': {e}"),
            }
        })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("'{program}' exited with status {}", output.status),
            msg => msg.to_string(),
        };
        Err(MacShiftError::LinkOperationFailed {
            stage,
            interface: interface.to_string(),
            reason,
        })
    }
}

impl LinkCommands for SystemLinkController {
    fn link_down(&self, interface: &str) -> Result<()> {
        match self.backend {
            LinkBackend::IpRoute2 => self.run(
                LinkStage::Down,
                interface,
                &["link", "set", "dev", interface, "down"],
            ),
            LinkBackend::Ifconfig => self.run(LinkStage::Down, interface, &[interface, "down"]),
        }
    }

    fn link_set_address(&self, interface: &str, mac: &MacAddress) -> Result<()> {
        let text = mac.to_string();
        match self.backend {
            LinkBackend::IpRoute2 => self.run(
                LinkStage::Set,
                interface,
                &["link", "set", "dev", interface, "address", &text],
            ),
            LinkBackend::Ifconfig => self.run(
                LinkStage::Set,
                interface,
                &[interface, "hw", "ether", &text],
            ),
        }
    }

    fn link_up(&self, interface: &str) -> Result<()> {
        match self.backend {
            LinkBackend::IpRoute2 => self.run(
                LinkStage::Up,
                interface,
                &["link", "set", "dev", interface, "up"],
            ),
            LinkBackend::Ifconfig => self.run(LinkStage::Up, interface, &[interface, "up"]),
        }
    }
}

impl LinkController for SystemLinkController {
    fn set_mac(&self, interface: &str, mac: &MacAddress) -> Result<()> {
        run_change_sequence(self, interface, mac)?;
        log::info!("set {} on {}", mac, interface);
        Ok(())
    }
}

/// True if an executable with this name is reachable through PATH.
pub(crate) fn command_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct ScriptedCommands {
        fail_at: Option<LinkStage>,
        log: RefCell<Vec<&'static str>>,
    }

    impl ScriptedCommands {
        fn new(fail_at: Option<LinkStage>) -> Self {
            Self {
                fail_at,
                log: RefCell::new(Vec::new()),
            }
        }

        fn record(&self, name: &'static str, stage: LinkStage) -> Result<()> {
            self.log.borrow_mut().push(name);
            if self.fail_at == Some(stage) {
                return Err(MacShiftError::LinkOperationFailed {
                    stage,
                    interface: "eth0".to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.log.borrow().clone()
        }
    }

    impl LinkCommands for ScriptedCommands {
        fn link_down(&self, _interface: &str) -> Result<()> {
            self.record("down", LinkStage::Down)
        }

        fn link_set_address(&self, _interface: &str, _mac: &MacAddress) -> Result<()> {
            self.record("set", LinkStage::Set)
        }

        fn link_up(&self, _interface: &str) -> Result<()> {
            self.record("up", LinkStage::Up)
        }
    }

    fn mac() -> MacAddress {
        "aa:bb:cc:dd:ee:ff".parse().unwrap()
    }

    fn failed_stage(err: MacShiftError) -> LinkStage {
        match err {
            MacShiftError::LinkOperationFailed { stage, .. } => stage,
            other => panic!("expected LinkOperationFailed, got {other}"),
        }
    }

    #[test]
    fn successful_sequence_runs_in_order() {
        let commands = ScriptedCommands::new(None);
        run_change_sequence(&commands, "eth0", &mac()).unwrap();
        assert_eq!(commands.calls(), ["down", "set", "up"]);
    }

    #[test]
    fn failed_down_still_attempts_bring_up() {
        let commands = ScriptedCommands::new(Some(LinkStage::Down));
        let err = run_change_sequence(&commands, "eth0", &mac()).unwrap_err();
        assert_eq!(failed_stage(err), LinkStage::Down);
        assert_eq!(commands.calls(), ["down", "up"]);
    }

    #[test]
    fn failed_set_still_brings_the_interface_up() {
        let commands = ScriptedCommands::new(Some(LinkStage::Set));
        let err = run_change_sequence(&commands, "eth0", &mac()).unwrap_err();
        assert_eq!(failed_stage(err), LinkStage::Set);
        assert_eq!(commands.calls(), ["down", "set", "up"]);
    }

    #[test]
    fn failed_up_is_tagged_and_not_retried() {
        let commands = ScriptedCommands::new(Some(LinkStage::Up));
        let err = run_change_sequence(&commands, "eth0", &mac()).unwrap_err();
        assert_eq!(failed_stage(err), LinkStage::Up);
        assert_eq!(commands.calls(), ["down", "set", "up"]);
    }

    #[test]
    fn stage_display_names_the_operation() {
        assert_eq!(LinkStage::Down.to_string(), "bring down");
        assert_eq!(LinkStage::Set.to_string(), "set address on");
        assert_eq!(LinkStage::Up.to_string(), "bring up");
    }

    #[test]
    fn command_on_path_finds_sh() {
        // /bin/sh exists on any Linux box this tool targets
        assert!(command_on_path("sh"));
        assert!(!command_on_path("definitely-not-a-real-command-xyz"));
    }
}
