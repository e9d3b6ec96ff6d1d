use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Stage of the down -> set -> up link sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    Down,
    Set,
    Up,
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStage::Down => write!(f, "bring down"),
            LinkStage::Set => write!(f, "set address on"),
            LinkStage::Up => write!(f, "bring up"),
        }
    }
}

/// Unified error type for all macshift operations.
///
/// Every failure names the interface and the condition that failed, so the
/// binary can surface a specific message without string inspection.
#[derive(Error, Debug)]
pub enum MacShiftError {
    #[error("'{input}' is not a valid MAC address. Expected aa:bb:cc:dd:ee:ff.")]
    InvalidFormat { input: String },

    #[error("Interface '{name}' not found. Verify it exists with 'ip link show'.")]
    InterfaceNotFound { name: String },

    #[error("No backup found for interface '{interface}' under {dir}. Nothing to restore.")]
    NoBackupFound { interface: String, dir: PathBuf },

    #[error("Backup for interface '{interface}' at {path} is corrupt: {reason}")]
    CorruptBackup {
        interface: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Backup storage unavailable at {dir}: {reason}")]
    StorageUnavailable { dir: PathBuf, reason: String },

    #[error(
        "Interface sources disagree for '{interface}': sysfs reports {sysfs}, 'ip' reports {ip}"
    )]
    InventoryInconsistent {
        interface: String,
        sysfs: String,
        ip: String,
    },

    #[error("Failed to {stage} interface '{interface}': {reason}")]
    LinkOperationFailed {
        stage: LinkStage,
        interface: String,
        reason: String,
    },

    #[error(
        "MAC change on '{interface}' did not stick: expected {expected}, interface reports \
         {actual}. Another service may be managing this interface."
    )]
    VerificationMismatch {
        interface: String,
        expected: String,
        actual: String,
    },

    #[error("{operation} requires root privileges. Re-run with sudo.")]
    InsufficientPrivilege { operation: String },

    #[error("No usable link tool found. Install iproute2 ('ip') or net-tools ('ifconfig').")]
    LinkToolMissing,

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MacShiftError>;

impl MacShiftError {
    /// Wrap an IO error with context, promoting permission failures.
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::InsufficientPrivilege {
                operation: operation.into(),
            };
        }
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}
