//! MAC address parsing, classification, and random generation.
//!
//! Only the canonical colon-separated form (`aa:bb:cc:dd:ee:ff`) is
//! accepted; input case is irrelevant, output is always lowercase. Random
//! addresses always come out unicast and locally administered.

use std::fmt;
use std::str::FromStr;

use crate::error::{MacShiftError, Result};

/// A validated 48-bit link-layer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress {
    bytes: [u8; 6],
}

impl MacAddress {
    #[must_use]
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Unicast addresses have bit 0 of the first octet clear.
    #[must_use]
    pub fn is_unicast(&self) -> bool {
        self.bytes[0] & 0x01 == 0
    }

    /// Locally administered addresses have bit 1 of the first octet set.
    #[must_use]
    pub fn is_locally_administered(&self) -> bool {
        self.bytes[0] & 0x02 != 0
    }

    /// Generate a random MAC address.
    ///
    /// Sets the locally administered bit and clears the multicast bit, so
    /// the result never collides with vendor-assigned space and is always a
    /// valid interface identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the system random source fails.
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; 6];
        getrandom::getrandom(&mut bytes).map_err(|e| MacShiftError::Io {
            operation: "reading system random source".to_string(),
            source: std::io::Error::other(e.to_string()),
        })?;

        // Set locally administered bit, clear multicast bit
        bytes[0] = (bytes[0] | 0x02) & 0xFE;

        Ok(Self { bytes })
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4],
            self.bytes[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacShiftError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || MacShiftError::InvalidFormat {
            input: trimmed.to_string(),
        };

        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            // from_str_radix tolerates a leading '+'; only plain hex pairs
            // are canonical.
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        Ok(Self { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical() {
        let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn parse_uppercase() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn parse_trims_whitespace() {
        let mac: MacAddress = " 00:17:5d:39:2b:3b\n".parse().unwrap();
        assert_eq!(mac.to_string(), "00:17:5d:39:2b:3b");
    }

    #[test]
    fn display_is_lowercase_canonical() {
        let mac = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn parse_format_round_trip() {
        for s in ["aa:bb:cc:dd:ee:ff", "00:00:00:00:00:00", "FF:ff:Ff:fF:00:01"] {
            let mac: MacAddress = s.parse().unwrap();
            let again: MacAddress = mac.to_string().parse().unwrap();
            assert_eq!(mac, again);
        }
    }

    #[test]
    fn rejects_non_canonical_forms() {
        let bad = [
            "00:11:22:33:44",          // too short
            "00:11:22:33:44:55:66",    // too long
            "gg:11:22:33:44:55",       // non-hex
            "001122334455",            // no delimiter
            "00-11-22-33-44-55",       // wrong delimiter
            "0:11:22:33:44:55",        // short octet
            "000:11:22:33:44:55",      // long octet
            "+a:bb:cc:dd:ee:ff",       // sign is not hex
            "",
            "not a mac",
        ];
        for s in bad {
            let err = s.parse::<MacAddress>().unwrap_err();
            assert!(
                matches!(err, MacShiftError::InvalidFormat { .. }),
                "expected InvalidFormat for {s:?}"
            );
        }
    }

    #[test]
    fn classification_bits() {
        let universal_unicast = MacAddress::new([0x00, 0x17, 0x5D, 0x39, 0x2B, 0x3B]);
        assert!(universal_unicast.is_unicast());
        assert!(!universal_unicast.is_locally_administered());

        let local = MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert!(local.is_unicast());
        assert!(local.is_locally_administered());

        let multicast = MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]);
        assert!(!multicast.is_unicast());
    }

    #[test]
    fn random_is_always_local_unicast() {
        for _ in 0..10_000 {
            let mac = MacAddress::random().unwrap();
            assert!(mac.is_unicast(), "generated multicast address {mac}");
            assert!(
                mac.is_locally_administered(),
                "generated universally administered address {mac}"
            );
        }
    }
}
