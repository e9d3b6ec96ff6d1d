//! # macshift
//!
//! Privileged Linux CLI for inspecting and changing network interface MAC
//! addresses, with write-once backup of the hardware-original address and
//! reversible restore.
//!
//! The pieces: [`mac::MacAddress`] (validation, classification, random
//! generation), [`backup::BackupStore`] (per-interface original-MAC
//! records), [`inventory::InterfaceInventory`] (live interface discovery),
//! [`link::SystemLinkController`] (down/set/up via `ip` or `ifconfig`),
//! and [`orchestrator::MacChangeOrchestrator`] tying them together.

// This crate drives Linux sysfs and iproute2; there is nothing useful it
// can do elsewhere.
#[cfg(not(target_os = "linux"))]
compile_error!("macshift is intended to be built for Linux targets only.");

pub mod backup;
pub mod cli;
pub mod error;
pub mod inventory;
pub mod link;
pub mod mac;
pub mod orchestrator;

pub use backup::BackupStore;
pub use cli::Cli;
pub use error::{LinkStage, MacShiftError, Result};
pub use inventory::{InterfaceInfo, InterfaceInventory, Inventory};
pub use link::{LinkController, SystemLinkController};
pub use mac::MacAddress;
pub use orchestrator::{
    ChangeIntent, MacChangeOrchestrator, Outcome, OrchestratorConfig, Prompt,
};

/// Check whether the process holds root-equivalent privilege.
///
/// MAC changes need root (or `CAP_NET_ADMIN`); listing and showing do not.
#[must_use]
pub fn check_privileges() -> bool {
    unsafe { libc::geteuid() == 0 }
}
