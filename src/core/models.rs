use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;

/// Length of a sector key on the tag, in bytes.
pub const KEY_LENGTH: usize = 6;

/// Number of candidate keys derived per tag.
pub const KEY_COUNT: usize = 16;

/// Name shown when block content cannot be decoded.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Unique hardware identifier reported by the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagUid(Vec<u8>);

impl TagUid {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a UID written as hex, with or without `:`/space separators.
    pub fn from_hex(input: &str) -> Result<Self> {
        let cleaned: String = input
            .chars()
            .filter(|c| !matches!(c, ':' | ' ' | '-'))
            .collect();
        Ok(Self(hex::decode(cleaned)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

/// One of the two independent credentials guarding a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    A,
    B,
}

impl KeyRole {
    /// Trial order within a single key.
    pub const ALL: [KeyRole; 2] = [KeyRole::A, KeyRole::B];
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::A => f.write_str("A"),
            KeyRole::B => f.write_str("B"),
        }
    }
}

/// A 6-byte sector key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SectorKey([u8; KEY_LENGTH]);

impl SectorKey {
    pub const fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_LENGTH] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Debug for SectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SectorKey([REDACTED])")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDerivationParams {
    pub key_length: usize,
    pub key_count: usize,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            key_length: KEY_LENGTH,
            key_count: KEY_COUNT,
        }
    }
}

impl KeyDerivationParams {
    pub fn with_key_count(key_count: usize) -> Self {
        Self {
            key_count,
            ..Self::default()
        }
    }

    /// Total HKDF output needed, `None` on overflow.
    pub fn output_length(&self) -> Option<usize> {
        self.key_length.checked_mul(self.key_count)
    }
}

/// Candidate keys for one tag, in trial order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeySet {
    keys: Vec<SectorKey>,
}

impl DerivedKeySet {
    pub fn new(keys: Vec<SectorKey>) -> Self {
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SectorKey> {
        self.keys.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SectorKey> {
        self.keys.iter()
    }

    pub fn as_slice(&self) -> &[SectorKey] {
        &self.keys
    }
}

impl<'a> IntoIterator for &'a DerivedKeySet {
    type Item = &'a SectorKey;
    type IntoIter = std::slice::Iter<'a, SectorKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Color packed as `0xAARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Argb(pub u32);

impl Argb {
    pub const OPAQUE_BLACK: Argb = Argb(0xFF00_0000);

    /// Pack the on-tag byte order `[red, green, blue, alpha]`.
    pub const fn from_rgba_bytes(bytes: [u8; 4]) -> Self {
        let [r, g, b, a] = bytes;
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolRecord {
    pub name: String,
    pub color: Argb,
}

impl SpoolRecord {
    pub fn new(name: impl Into<String>, color: Argb) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }

    /// Record shown when the blocks could not be decoded.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_NAME, Argb::OPAQUE_BLACK)
    }
}

/// Result of one scan, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Decoded(SpoolRecord),
    AuthenticationFailed,
    ReadError(String),
}

impl ScanOutcome {
    /// The record a display should show for this outcome.
    pub fn display_record(&self) -> SpoolRecord {
        match self {
            ScanOutcome::Decoded(record) => record.clone(),
            ScanOutcome::AuthenticationFailed => {
                SpoolRecord::new("Authentication Failed", Argb::OPAQUE_BLACK)
            }
            ScanOutcome::ReadError(_) => SpoolRecord::new("Error reading tag", Argb::OPAQUE_BLACK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_display_is_upper_hex() {
        let uid = TagUid::new(vec![0x04, 0xa1, 0xb2, 0xc3]);
        assert_eq!(uid.to_string(), "04A1B2C3");
    }

    #[test]
    fn test_uid_from_hex_accepts_separators() {
        let uid = TagUid::from_hex("04:a1:B2:c3").unwrap();
        assert_eq!(uid.as_bytes(), &[0x04, 0xa1, 0xb2, 0xc3]);
        assert!(TagUid::from_hex("04a").is_err());
        assert!(TagUid::from_hex("zz").is_err());
    }

    #[test]
    fn test_argb_packing() {
        let color = Argb::from_rgba_bytes([0xFF, 0x00, 0x00, 0x00]);
        assert_eq!(color, Argb(0x00FF_0000));

        let color = Argb::from_rgba_bytes([0x12, 0x34, 0x56, 0x78]);
        assert_eq!(color.0, 0x7812_3456);
        assert_eq!(color.red(), 0x12);
        assert_eq!(color.green(), 0x34);
        assert_eq!(color.blue(), 0x56);
        assert_eq!(color.alpha(), 0x78);
        assert_eq!(color.to_string(), "#78123456");
    }

    #[test]
    fn test_sector_key_debug_is_redacted() {
        let key = SectorKey::new([0xAA; KEY_LENGTH]);
        assert!(!format!("{key:?}").contains("AA"));
        assert!(!format!("{key:?}").contains("170"));
        assert_eq!(key.to_hex(), "AAAAAAAAAAAA");
    }

    #[test]
    fn test_sector_key_from_slice_checks_length() {
        assert!(SectorKey::from_slice(&[0u8; 5]).is_none());
        assert!(SectorKey::from_slice(&[0u8; 6]).is_some());
    }

    #[test]
    fn test_default_params_request_96_bytes() {
        let params = KeyDerivationParams::default();
        assert_eq!(params.output_length(), Some(96));
        assert_eq!(KeyDerivationParams::with_key_count(6).output_length(), Some(36));
        let huge = KeyDerivationParams {
            key_length: usize::MAX,
            key_count: 2,
        };
        assert_eq!(huge.output_length(), None);
    }

    #[test]
    fn test_display_record_fallbacks() {
        let record = ScanOutcome::AuthenticationFailed.display_record();
        assert_eq!(record.name, "Authentication Failed");
        assert_eq!(record.color, Argb::OPAQUE_BLACK);

        let record = ScanOutcome::ReadError("tag lost".to_string()).display_record();
        assert_eq!(record.name, "Error reading tag");

        let pla = SpoolRecord::new("PLA", Argb(0xFFFF_0000));
        assert_eq!(ScanOutcome::Decoded(pla.clone()).display_record(), pla);
    }
}
