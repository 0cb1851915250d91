use std::fs;
use std::path::Path;

use crate::core::models::{KeyRole, SectorKey, TagUid};
use crate::core::record_codec::Block;
use crate::error::{Result, SpoolError};
use crate::storage::format::{
    self, BLOCK_SIZE, KEY_A_RANGE, KEY_B_RANGE, MINI_SIZE, SIZE_1K, SIZE_2K, SIZE_4K,
};

/// Raw block image of a tag, as written by common reader tools (`.mfd`/`.bin`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDump {
    data: Vec<u8>,
    sector_count: u8,
}

impl TagDump {
    /// Read a dump from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let sector_count = match data.len() {
            MINI_SIZE => 5,
            SIZE_1K => 16,
            SIZE_2K => 32,
            SIZE_4K => 40,
            other => {
                return Err(SpoolError::InvalidDump {
                    reason: format!(
                        "{other} bytes is not a Mini/1K/2K/4K image \
                         ({MINI_SIZE}, {SIZE_1K}, {SIZE_2K} or {SIZE_4K} bytes)"
                    ),
                })
            }
        };
        Ok(Self { data, sector_count })
    }

    pub fn sector_count(&self) -> u8 {
        self.sector_count
    }

    pub fn block_count(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }

    pub fn contains_sector(&self, sector: u8) -> bool {
        sector < self.sector_count
    }

    pub fn block(&self, block: u8) -> Option<&Block> {
        let start = block as usize * BLOCK_SIZE;
        self.data.get(start..start + BLOCK_SIZE)?.try_into().ok()
    }

    /// UID from the manufacturer block. A 4-byte UID is followed by its BCC;
    /// anything else is read as a 7-byte UID.
    pub fn uid(&self) -> TagUid {
        let block0 = &self.data[..BLOCK_SIZE];
        let bcc = block0[..4].iter().fold(0u8, |acc, b| acc ^ b);
        if block0[4] == bcc {
            TagUid::new(&block0[..4])
        } else {
            TagUid::new(&block0[..7])
        }
    }

    /// Key stored in the trailer of `sector` for `role`.
    pub fn sector_key(&self, sector: u8, role: KeyRole) -> Option<SectorKey> {
        if !self.contains_sector(sector) {
            return None;
        }
        let trailer = self.block(format::trailer_block(sector)?)?;
        let range = match role {
            KeyRole::A => KEY_A_RANGE,
            KeyRole::B => KEY_B_RANGE,
        };
        SectorKey::from_slice(&trailer[range])
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a 1K image with a 4-byte UID, the given sector-1 keys and the
    /// two spool blocks.
    pub(crate) fn spool_dump(
        uid: [u8; 4],
        key_a: &SectorKey,
        key_b: &SectorKey,
        name_block: &Block,
        color_block: &Block,
    ) -> TagDump {
        let mut data = vec![0u8; SIZE_1K];
        data[..4].copy_from_slice(&uid);
        data[4] = uid.iter().fold(0u8, |acc, b| acc ^ b);

        let first = format::sector_to_block(format::SPOOL_SECTOR).unwrap() as usize;
        let at = |block: usize| block * BLOCK_SIZE;
        data[at(first)..at(first + 1)].copy_from_slice(name_block);
        data[at(first + 1)..at(first + 2)].copy_from_slice(color_block);

        let trailer = at(format::trailer_block(format::SPOOL_SECTOR).unwrap() as usize);
        data[trailer + KEY_A_RANGE.start..trailer + KEY_A_RANGE.end]
            .copy_from_slice(key_a.as_bytes());
        data[trailer + 6..trailer + 10].copy_from_slice(&[0xFF, 0x07, 0x80, 0x69]);
        data[trailer + KEY_B_RANGE.start..trailer + KEY_B_RANGE.end]
            .copy_from_slice(key_b.as_bytes());

        TagDump::from_bytes(data).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::spool_dump;
    use super::*;
    use tempfile::TempDir;

    fn key(byte: u8) -> SectorKey {
        SectorKey::new([byte; 6])
    }

    #[test]
    fn test_rejects_odd_sizes() {
        let result = TagDump::from_bytes(vec![0u8; 1000]);
        assert!(matches!(result, Err(SpoolError::InvalidDump { .. })));
        let result = TagDump::from_bytes(Vec::new());
        assert!(matches!(result, Err(SpoolError::InvalidDump { .. })));
    }

    #[test]
    fn test_sector_counts() {
        assert_eq!(TagDump::from_bytes(vec![0; MINI_SIZE]).unwrap().sector_count(), 5);
        assert_eq!(TagDump::from_bytes(vec![0; SIZE_1K]).unwrap().sector_count(), 16);
        assert_eq!(TagDump::from_bytes(vec![0; SIZE_2K]).unwrap().sector_count(), 32);
        let dump = TagDump::from_bytes(vec![0; SIZE_4K]).unwrap();
        assert_eq!(dump.sector_count(), 40);
        assert_eq!(dump.block_count(), 256);
        assert!(dump.block(255).is_some());
    }

    #[test]
    fn test_four_byte_uid_with_bcc() {
        let dump = spool_dump([0x04, 0xa1, 0xb2, 0xc3], &key(1), &key(2), &[0; 16], &[0; 16]);
        assert_eq!(dump.uid().to_string(), "04A1B2C3");
    }

    #[test]
    fn test_seven_byte_uid() {
        let mut data = vec![0u8; SIZE_1K];
        data[..7].copy_from_slice(&[0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let dump = TagDump::from_bytes(data).unwrap();
        assert_eq!(dump.uid().to_string(), "04112233445566");
    }

    #[test]
    fn test_trailer_keys() {
        let dump = spool_dump([1, 2, 3, 4], &key(0xA0), &key(0xB0), &[0; 16], &[0; 16]);
        assert_eq!(dump.sector_key(1, KeyRole::A), Some(key(0xA0)));
        assert_eq!(dump.sector_key(1, KeyRole::B), Some(key(0xB0)));
        assert_eq!(dump.sector_key(16, KeyRole::A), None);
    }

    #[test]
    fn test_blocks_out_of_range() {
        let dump = TagDump::from_bytes(vec![0; MINI_SIZE]).unwrap();
        assert!(dump.block(19).is_some());
        assert!(dump.block(20).is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tag.mfd");

        let mut name = [0u8; 16];
        name[..3].copy_from_slice(b"PLA");
        let dump = spool_dump([9, 8, 7, 6], &key(1), &key(2), &name, &[0; 16]);
        fs::write(&path, &dump.data).unwrap();

        let loaded = TagDump::load(&path).unwrap();
        assert_eq!(loaded, dump);
        assert_eq!(&loaded.block(4).unwrap()[..3], b"PLA");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = TagDump::load(&dir.path().join("missing.mfd"));
        assert!(matches!(result, Err(SpoolError::Io(_))));
    }
}
