use std::ops::Range;

/// Size of one tag block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Accepted dump sizes: MIFARE Classic Mini, 1K, 2K and 4K images.
pub const MINI_SIZE: usize = 320;
pub const SIZE_1K: usize = 1024;
pub const SIZE_2K: usize = 2048;
pub const SIZE_4K: usize = 4096;

/// Sectors below this index have four blocks, the rest have sixteen.
pub const SMALL_SECTOR_COUNT: u8 = 32;
pub const SMALL_SECTOR_BLOCKS: u8 = 4;
pub const LARGE_SECTOR_BLOCKS: u8 = 16;

/// Highest sector count of any supported layout (4K).
pub const MAX_SECTORS: u8 = 40;

/// Key positions inside a sector trailer. Bytes 6..10 are access bits.
pub const KEY_A_RANGE: Range<usize> = 0..6;
pub const KEY_B_RANGE: Range<usize> = 10..16;

/// Sector holding the spool record; its first two blocks are name and color.
pub const SPOOL_SECTOR: u8 = 1;

/// First block of `sector`, or `None` past the largest layout.
pub fn sector_to_block(sector: u8) -> Option<u8> {
    if sector < SMALL_SECTOR_COUNT {
        Some(sector * SMALL_SECTOR_BLOCKS)
    } else if sector < MAX_SECTORS {
        let small = SMALL_SECTOR_COUNT as u16 * SMALL_SECTOR_BLOCKS as u16;
        let block = small + (sector - SMALL_SECTOR_COUNT) as u16 * LARGE_SECTOR_BLOCKS as u16;
        u8::try_from(block).ok()
    } else {
        None
    }
}

pub fn blocks_in_sector(sector: u8) -> u8 {
    if sector < SMALL_SECTOR_COUNT {
        SMALL_SECTOR_BLOCKS
    } else {
        LARGE_SECTOR_BLOCKS
    }
}

pub fn block_to_sector(block: u8) -> u8 {
    let small_blocks = SMALL_SECTOR_COUNT * SMALL_SECTOR_BLOCKS;
    if block < small_blocks {
        block / SMALL_SECTOR_BLOCKS
    } else {
        SMALL_SECTOR_COUNT + (block - small_blocks) / LARGE_SECTOR_BLOCKS
    }
}

/// Last block of `sector`, holding its keys and access bits.
pub fn trailer_block(sector: u8) -> Option<u8> {
    sector_to_block(sector).map(|first| first + (blocks_in_sector(sector) - 1))
}
