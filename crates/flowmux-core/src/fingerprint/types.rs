use std::fmt;
use std::str::FromStr;

use crate::fingerprint::wire::{parse_u16_list, parse_u8_list};
use crate::fingerprint::FingerprintError;

/// supported_groups (formerly elliptic_curves), RFC 8422 / RFC 7919.
pub const EXT_SUPPORTED_GROUPS: u16 = 0x000a;
/// ec_point_formats, RFC 8422.
pub const EXT_EC_POINT_FORMATS: u16 = 0x000b;

/// Protocol version advertised in the ClientHello body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsVersion {
    pub major: u8,
    pub minor: u8,
}

impl TlsVersion {
    /// `(major << 8) | minor`, e.g. 771 for TLS 1.2.
    pub fn as_u16(self) -> u16 {
        (u16::from(self.major) << 8) | u16::from(self.minor)
    }
}

impl From<u16> for TlsVersion {
    fn from(v: u16) -> Self {
        Self {
            major: (v >> 8) as u8,
            minor: v as u8,
        }
    }
}

/// A single ClientHello extension with its still-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub kind: u16,
    pub payload: Vec<u8>,
}

/// Parsed ClientHello fields needed for JA3 fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// client_version from the handshake body (not the record layer)
    pub version: TlsVersion,
    /// Cipher suite values in wire order
    pub cipher_suites: Vec<u16>,
    /// Extensions in wire order
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    /// Look up an extension body by type. A repeated type resolves to its
    /// last occurrence.
    pub fn extension(&self, kind: u16) -> Option<&[u8]> {
        self.extensions
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .map(|e| e.payload.as_slice())
    }

    /// Extension type codes in wire order.
    pub fn extension_types(&self) -> impl Iterator<Item = u16> + '_ {
        self.extensions.iter().map(|e| e.kind)
    }

    /// Named groups from extension 10. Absence is an error.
    pub fn supported_groups(&self) -> Result<Vec<u16>, FingerprintError> {
        let body = self
            .extension(EXT_SUPPORTED_GROUPS)
            .ok_or(FingerprintError::MissingExtension(EXT_SUPPORTED_GROUPS))?;
        parse_u16_list(body, "supported_groups")
    }

    /// Point formats from extension 11. Absence is an error.
    pub fn ec_point_formats(&self) -> Result<Vec<u8>, FingerprintError> {
        let body = self
            .extension(EXT_EC_POINT_FORMATS)
            .ok_or(FingerprintError::MissingExtension(EXT_EC_POINT_FORMATS))?;
        parse_u8_list(body, "ec_point_formats")
    }
}

/// Lowercase 32-character hex MD5 digest of a JA3 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ja3Hash(String);

impl Ja3Hash {
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ja3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid JA3 hash '{0}': expected 32 hex characters")]
pub struct InvalidJa3Hash(String);

impl FromStr for Ja3Hash {
    type Err = InvalidJa3Hash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 32 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidJa3Hash(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

/// Result of a JA3 fingerprint computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ja3Result {
    /// MD5 of `raw_string`; the comparison key
    pub hash: Ja3Hash,
    /// The raw string before hashing
    pub raw_string: String,
}
