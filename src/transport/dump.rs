use std::path::Path;

use tracing::{debug, trace};

use crate::core::models::{KeyRole, SectorKey, TagUid};
use crate::core::record_codec::Block;
use crate::error::{Result, TransportError};
use crate::storage::dump_file::TagDump;
use crate::storage::format;
use crate::transport::TagTransport;

/// Serves a [`TagDump`] as if it were a tag in the field.
///
/// Authentication succeeds when the candidate matches the key stored in the
/// sector trailer for the requested role, and reads are limited to the
/// sector authenticated last.
#[derive(Debug)]
pub struct DumpTransport {
    dump: TagDump,
    connected: bool,
    authenticated: Option<u8>,
}

impl DumpTransport {
    pub fn new(dump: TagDump) -> Self {
        Self {
            dump,
            connected: false,
            authenticated: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(TagDump::load(path)?))
    }

    pub fn uid(&self) -> TagUid {
        self.dump.uid()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&self) -> std::result::Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

impl TagTransport for DumpTransport {
    fn connect(&mut self) -> std::result::Result<(), TransportError> {
        if !self.connected {
            debug!(uid = %self.dump.uid(), sectors = self.dump.sector_count(), "opened tag dump");
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), TransportError> {
        self.connected = false;
        self.authenticated = None;
        Ok(())
    }

    fn authenticate_sector(
        &mut self,
        sector: u8,
        key: &SectorKey,
        role: KeyRole,
    ) -> std::result::Result<bool, TransportError> {
        self.ensure_connected()?;
        if !self.dump.contains_sector(sector) {
            return Err(TransportError::SectorOutOfRange { sector });
        }

        // A failed attempt drops any earlier authentication, as on a real tag.
        self.authenticated = None;
        let stored = self.dump.sector_key(sector, role);
        let accepted = stored.as_ref() == Some(key);
        trace!(sector, %role, accepted, "dump authentication");
        if accepted {
            self.authenticated = Some(sector);
        }
        Ok(accepted)
    }

    fn read_block(&mut self, block: u8) -> std::result::Result<Block, TransportError> {
        self.ensure_connected()?;
        if self.authenticated != Some(format::block_to_sector(block)) {
            return Err(TransportError::NotAuthenticated { block });
        }
        self.dump
            .block(block)
            .copied()
            .ok_or(TransportError::BlockOutOfRange { block })
    }
}
