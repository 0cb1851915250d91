//! Tag sessions.
//!
//! A [`TagTransport`] is the only way the scanner talks to a tag: it opens an
//! exclusive session, authenticates sectors and reads blocks. The core never
//! performs I/O itself; it drives whatever transport the caller hands it.

pub mod dump;
#[cfg(feature = "pcsc")]
pub mod pcsc;

use std::fmt;

use crate::core::models::{KeyRole, SectorKey};
use crate::core::record_codec::Block;
use crate::error::TransportError;
use crate::storage::format;

pub use dump::DumpTransport;
#[cfg(feature = "pcsc")]
pub use self::pcsc::PcscTransport;

/// An exclusive session with one sector-based storage tag.
pub trait TagTransport: fmt::Debug {
    /// Open the session. Calling it on an open session is a no-op.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Release the session. Must be safe to call repeatedly and after any
    /// earlier failure.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Try `key` in `role` against `sector`. A rejected key is `Ok(false)`;
    /// `Err` is reserved for failures of the session itself.
    fn authenticate_sector(
        &mut self,
        sector: u8,
        key: &SectorKey,
        role: KeyRole,
    ) -> Result<bool, TransportError>;

    /// Read one block from the most recently authenticated sector.
    fn read_block(&mut self, block: u8) -> Result<Block, TransportError>;

    /// First block address of `sector`.
    fn sector_to_block(&self, sector: u8) -> Result<u8, TransportError> {
        format::sector_to_block(sector).ok_or(TransportError::SectorOutOfRange { sector })
    }
}

#[cfg(test)]
pub(crate) use mock::{Attempt, MockTransport};

#[cfg(test)]
mod mock {
    use super::*;

    /// Authentication attempt recorded by [`MockTransport`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Attempt {
        pub sector: u8,
        pub key: SectorKey,
        pub role: KeyRole,
    }

    /// Scripted transport for exercising the scan sequence.
    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        /// Key and role the tag accepts, if any.
        pub accepts: Option<(SectorKey, KeyRole)>,
        /// Blocks returned by `read_block`, by address.
        pub blocks: Vec<(u8, Block)>,
        pub fail_connect: bool,
        /// Fail `read_block` on this address.
        pub fail_read: Option<u8>,
        /// Fail on this zero-based authentication attempt.
        pub fail_attempt: Option<usize>,
        pub attempts: Vec<Attempt>,
        pub reads: Vec<u8>,
        pub connects: usize,
        pub closes: usize,
    }

    impl TagTransport for MockTransport {
        fn connect(&mut self) -> Result<(), TransportError> {
            self.connects += 1;
            if self.fail_connect {
                return Err(TransportError::Other("tag out of range".to_string()));
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.closes += 1;
            Ok(())
        }

        fn authenticate_sector(
            &mut self,
            sector: u8,
            key: &SectorKey,
            role: KeyRole,
        ) -> Result<bool, TransportError> {
            if self.fail_attempt == Some(self.attempts.len()) {
                return Err(TransportError::Other("tag lost".to_string()));
            }
            self.attempts.push(Attempt {
                sector,
                key: key.clone(),
                role,
            });
            Ok(self
                .accepts
                .as_ref()
                .is_some_and(|(k, r)| k == key && *r == role))
        }

        fn read_block(&mut self, block: u8) -> Result<Block, TransportError> {
            self.reads.push(block);
            if self.fail_read == Some(block) {
                return Err(TransportError::Other("read timeout".to_string()));
            }
            self.blocks
                .iter()
                .find(|(addr, _)| *addr == block)
                .map(|(_, data)| *data)
                .ok_or(TransportError::BlockOutOfRange { block })
        }
    }
}
