//! Decoding of the two spool blocks.
//!
//! The first block carries the filament name as NUL- or space-padded
//! US-ASCII. The first four bytes of the second block carry the color as
//! red, green, blue, alpha.

use tracing::debug;

use crate::core::models::{Argb, SpoolRecord};
use crate::error::DecodeError;
use crate::storage::format::BLOCK_SIZE;

pub type Block = [u8; BLOCK_SIZE];

/// Decode a name block and a color block into a record.
pub fn decode(name_block: &Block, color_block: &Block) -> Result<SpoolRecord, DecodeError> {
    let name = decode_name(name_block)?;
    let color = decode_color(color_block);
    Ok(SpoolRecord { name, color })
}

/// Like [`decode`], but for blocks of unchecked length.
pub fn decode_blocks(name_block: &[u8], color_block: &[u8]) -> Result<SpoolRecord, DecodeError> {
    decode(&to_block(name_block)?, &to_block(color_block)?)
}

/// Decode, falling back to the `"Unknown"` record on malformed content.
pub fn decode_or_unknown(name_block: &Block, color_block: &Block) -> SpoolRecord {
    decode(name_block, color_block).unwrap_or_else(|e| {
        debug!(error = %e, "spool blocks did not decode");
        SpoolRecord::unknown()
    })
}

fn decode_name(block: &Block) -> Result<String, DecodeError> {
    if let Some(offset) = block.iter().position(|b| !b.is_ascii()) {
        return Err(DecodeError::NonAscii {
            offset,
            byte: block[offset],
        });
    }

    let text: String = block.iter().map(|&b| char::from(b)).collect();
    Ok(text.trim_matches(is_padding).to_string())
}

/// NUL plus every ASCII character Unicode classes as whitespace, which
/// includes vertical tab and the 0x1C..=0x1F separators.
fn is_padding(c: char) -> bool {
    matches!(c, '\0' | '\t'..='\r' | '\x1c'..='\x1f' | ' ')
}

fn decode_color(block: &Block) -> Argb {
    Argb::from_rgba_bytes([block[0], block[1], block[2], block[3]])
}

fn to_block(bytes: &[u8]) -> Result<Block, DecodeError> {
    bytes.try_into().map_err(|_| DecodeError::BlockLength {
        expected: BLOCK_SIZE,
        actual: bytes.len(),
    })
}
