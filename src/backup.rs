//! Persistent backup of original MAC addresses.
//!
//! One record per interface at `<dir>/<iface>.orig`, containing exactly the
//! canonical MAC text. A record is written once, before the first change,
//! and never overwritten: the file is the only copy of the hardware-original
//! address, and its existence is the signal that this tool has ever touched
//! the interface.

use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::error::{MacShiftError, Result};
use crate::mac::MacAddress;

/// Directory used in production. Root-only, like the records it holds.
const DEFAULT_DIR: &str = "/var/lib/macshift";

pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write, not here, so read-only operations never need it.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn default_dir() -> PathBuf {
        PathBuf::from(DEFAULT_DIR)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, interface: &str) -> PathBuf {
        self.dir.join(format!("{interface}.orig"))
    }

    #[must_use]
    pub fn has_backup(&self, interface: &str) -> bool {
        self.record_path(interface).exists()
    }

    /// Read the backed-up original MAC for an interface.
    ///
    /// # Errors
    ///
    /// * `NoBackupFound` - no record exists for the interface
    /// * `CorruptBackup` - the record exists but does not parse as a MAC
    pub fn read_backup(&self, interface: &str) -> Result<MacAddress> {
        let path = self.record_path(interface);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MacShiftError::NoBackupFound {
                    interface: interface.to_string(),
                    dir: self.dir.clone(),
                });
            }
            Err(e) => return Err(MacShiftError::io_error(format!("reading {}", path.display()), e)),
        };

        contents
            .trim()
            .parse()
            .map_err(|_| MacShiftError::CorruptBackup {
                interface: interface.to_string(),
                path,
                reason: format!("'{}' is not a canonical MAC address", contents.trim()),
            })
    }

    /// Record the original MAC for an interface unless one already exists.
    ///
    /// Atomic check-then-write via `O_CREAT|O_EXCL`. Returns `true` if a new
    /// record was written, `false` if one was already present; an existing
    /// record is never touched.
    ///
    /// # Errors
    ///
    /// * `StorageUnavailable` - backing directory cannot be created or written
    pub fn write_backup_if_absent(&self, interface: &str, mac: &MacAddress) -> Result<bool> {
        self.ensure_dir()?;

        let path = self.record_path(interface);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                log::debug!("backup for {} already exists at {}", interface, path.display());
                return Ok(false);
            }
            Err(e) => {
                return Err(MacShiftError::StorageUnavailable {
                    dir: self.dir.clone(),
                    reason: format!("cannot create {}: {}", path.display(), e),
                });
            }
        };

        writeln!(file, "{mac}").map_err(|e| MacShiftError::StorageUnavailable {
            dir: self.dir.clone(),
            reason: format!("cannot write {}: {}", path.display(), e),
        })?;

        log::info!("saved original MAC {} for {} to {}", mac, interface, path.display());
        Ok(true)
    }

    fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            return Ok(());
        }
        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.dir)
            .map_err(|e| MacShiftError::StorageUnavailable {
                dir: self.dir.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[test]
    fn missing_backup_is_no_backup_found() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());
        assert!(!store.has_backup("eth0"));
        let err = store.read_backup("eth0").unwrap_err();
        assert!(matches!(err, MacShiftError::NoBackupFound { .. }));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());

        let written = store
            .write_backup_if_absent("eth0", &mac("00:17:5d:39:2b:3b"))
            .unwrap();
        assert!(written);
        assert!(store.has_backup("eth0"));
        assert_eq!(store.read_backup("eth0").unwrap(), mac("00:17:5d:39:2b:3b"));
    }

    #[test]
    fn second_write_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());

        assert!(store
            .write_backup_if_absent("eth0", &mac("00:17:5d:39:2b:3b"))
            .unwrap());
        let written = store
            .write_backup_if_absent("eth0", &mac("aa:bb:cc:dd:ee:ff"))
            .unwrap();
        assert!(!written);

        // First record survives untouched
        assert_eq!(store.read_backup("eth0").unwrap(), mac("00:17:5d:39:2b:3b"));
    }

    #[test]
    fn corrupt_record_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());
        std::fs::write(dir.path().join("eth0.orig"), "garbage\n").unwrap();

        let err = store.read_backup("eth0").unwrap_err();
        assert!(matches!(err, MacShiftError::CorruptBackup { .. }));
    }

    #[test]
    fn record_file_contains_canonical_text() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());
        store
            .write_backup_if_absent("wlan0", &mac("AA:BB:CC:DD:EE:FF"))
            .unwrap();

        let contents = std::fs::read_to_string(dir.path().join("wlan0.orig")).unwrap();
        assert_eq!(contents, "aa:bb:cc:dd:ee:ff\n");
    }

    #[test]
    fn directory_created_with_restrictive_mode() {
        use std::os::unix::fs::PermissionsExt;

        let parent = TempDir::new().unwrap();
        let dir = parent.path().join("store");
        let store = BackupStore::new(&dir);
        store
            .write_backup_if_absent("eth0", &mac("00:17:5d:39:2b:3b"))
            .unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        let file_mode = std::fs::metadata(dir.join("eth0.orig"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }
}
