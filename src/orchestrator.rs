//! The MAC change state machine.
//!
//! One invocation runs exactly one intent to completion: resolve the
//! interface and target address (failing fast before anything is mutated),
//! obtain confirmation, capture the original address in the backup store,
//! apply the change through the link controller, then read the live address
//! back and require it to match. A declined confirmation is a successful
//! outcome, not an error.

use crate::backup::BackupStore;
use crate::error::{MacShiftError, Result};
use crate::inventory::{InterfaceInfo, Inventory};
use crate::link::LinkController;
use crate::mac::MacAddress;

/// The one operation requested for this invocation.
#[derive(Debug, Clone)]
pub enum ChangeIntent {
    Show,
    List,
    SetExplicit(MacAddress),
    SetRandom,
    Restore,
}

/// Explicit per-invocation context, injected at construction so tests can
/// simulate privileged and unprivileged processes side by side.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Whether the process holds root-equivalent privilege.
    pub privileged: bool,
    /// Skip interactive confirmation (the `--yes` flag).
    pub assume_yes: bool,
}

/// Confirmation seam. The terminal implementation lives in the binary;
/// tests script the answers.
pub trait Prompt {
    /// Ask for an explicit go-ahead naming the interface and exact target.
    fn confirm(&mut self, interface: &str, target: &MacAddress) -> Result<bool>;
}

/// Terminal state of a completed invocation.
#[derive(Debug)]
pub enum Outcome {
    Listed(Vec<InterfaceInfo>),
    Shown {
        interface: String,
        mac: MacAddress,
    },
    Applied {
        interface: String,
        mac: MacAddress,
        backup_written: bool,
    },
    Declined,
}

pub struct MacChangeOrchestrator<'a> {
    inventory: &'a dyn Inventory,
    link: &'a dyn LinkController,
    store: &'a BackupStore,
    prompt: &'a mut dyn Prompt,
    config: OrchestratorConfig,
}

impl<'a> MacChangeOrchestrator<'a> {
    pub fn new(
        inventory: &'a dyn Inventory,
        link: &'a dyn LinkController,
        store: &'a BackupStore,
        prompt: &'a mut dyn Prompt,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inventory,
            link,
            store,
            prompt,
            config,
        }
    }

    /// Run one intent to its terminal state.
    ///
    /// `interface` is required for everything except `List`.
    ///
    /// # Errors
    ///
    /// Any taxonomy error is terminal for the invocation; nothing is
    /// retried.
    pub fn run(&mut self, intent: ChangeIntent, interface: Option<&str>) -> Result<Outcome> {
        match intent {
            ChangeIntent::List => Ok(Outcome::Listed(self.inventory.list_interfaces()?)),
            ChangeIntent::Show => {
                let interface = require_interface(interface)?;
                let mac = self.inventory.current_mac(interface)?;
                Ok(Outcome::Shown {
                    interface: interface.to_string(),
                    mac,
                })
            }
            ChangeIntent::SetExplicit(mac) => {
                self.change(require_interface(interface)?, Target::Explicit(mac))
            }
            ChangeIntent::SetRandom => {
                self.change(require_interface(interface)?, Target::Random)
            }
            ChangeIntent::Restore => {
                self.change(require_interface(interface)?, Target::Backup)
            }
        }
    }

    fn change(&mut self, interface: &str, target: Target) -> Result<Outcome> {
        // Refuse before touching any interface, backup file, or link.
        if !self.config.privileged {
            return Err(MacShiftError::InsufficientPrivilege {
                operation: "Changing a MAC address".to_string(),
            });
        }

        // Resolve: current address (cross-checked against the secondary
        // source) and the exact target, before any mutation is attempted.
        let current = self.inventory.current_mac_checked(interface)?;
        let target = match target {
            Target::Explicit(mac) => mac,
            Target::Random => MacAddress::random()?,
            Target::Backup => self.store.read_backup(interface)?,
        };
        log::debug!("resolved {interface}: current {current}, target {target}");

        // Confirm: declining terminates cleanly with no side effects.
        if !self.config.assume_yes && !self.prompt.confirm(interface, &target)? {
            log::info!("change to {interface} declined");
            return Ok(Outcome::Declined);
        }

        // Apply: the original is captured before the very first mutation;
        // for every later change (restore included) the write is a no-op,
        // so the true original is never lost.
        let backup_written = self.store.write_backup_if_absent(interface, &current)?;
        self.link.set_mac(interface, &target)?;

        // Verify: an external manager may have reasserted its own address
        // in the window after the link call succeeded.
        let observed = self.inventory.current_mac(interface)?;
        if observed != target {
            return Err(MacShiftError::VerificationMismatch {
                interface: interface.to_string(),
                expected: target.to_string(),
                actual: observed.to_string(),
            });
        }

        log::info!("{interface} changed from {current} to {target}");
        Ok(Outcome::Applied {
            interface: interface.to_string(),
            mac: target,
            backup_written,
        })
    }
}

enum Target {
    Explicit(MacAddress),
    Random,
    Backup,
}

fn require_interface(interface: Option<&str>) -> Result<&str> {
    interface.ok_or_else(|| MacShiftError::InterfaceNotFound {
        name: "(no interface selected)".to_string(),
    })
}
