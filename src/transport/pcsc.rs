//! PC/SC contactless reader transport
//!
//! Storage tags are driven through the pseudo-APDUs of PC/SC part 3, which
//! common contactless readers translate into native tag commands.

use std::ffi::{CStr, CString};
use std::fmt;

use ::pcsc::{Card, Context, Disposition, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};
use tracing::{debug, trace};

use crate::core::models::{KeyRole, SectorKey, TagUid};
use crate::core::record_codec::Block;
use crate::error::TransportError;
use crate::storage::format::BLOCK_SIZE;
use crate::transport::TagTransport;

const CLA: u8 = 0xFF;
const INS_GET_DATA: u8 = 0xCA;
const INS_LOAD_KEY: u8 = 0x82;
const INS_GENERAL_AUTHENTICATE: u8 = 0x86;
const INS_READ_BINARY: u8 = 0xB0;

/// Volatile key slot the reader keeps the candidate key in.
const KEY_SLOT: u8 = 0x00;

const KEY_TYPE_A: u8 = 0x60;
const KEY_TYPE_B: u8 = 0x61;

/// Transport over a PC/SC reader
pub struct PcscTransport {
    context: Context,
    reader: CString,
    card: Option<Card>,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader", &self.reader)
            .field("has_card", &self.card.is_some())
            .finish()
    }
}

impl PcscTransport {
    /// Open the first reader whose name contains `reader`, or the first
    /// reader present when `None`.
    pub fn new(reader: Option<&str>) -> Result<Self, TransportError> {
        let context = Context::establish(Scope::User)?;
        let readers = context.list_readers_owned()?;

        let selected = match reader {
            Some(wanted) => readers
                .into_iter()
                .find(|name| name.to_string_lossy().contains(wanted))
                .ok_or_else(|| TransportError::Other(format!("reader not found: {wanted}")))?,
            None => readers
                .into_iter()
                .next()
                .ok_or_else(|| TransportError::Other("no readers available".to_string()))?,
        };
        debug!(reader = %selected.to_string_lossy(), "selected reader");

        Ok(Self {
            context,
            reader: selected,
            card: None,
        })
    }

    /// Names of all connected readers.
    pub fn list_readers() -> Result<Vec<String>, TransportError> {
        let context = Context::establish(Scope::User)?;
        Ok(context
            .list_readers_owned()?
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    pub fn reader_name(&self) -> String {
        self.reader.to_string_lossy().into_owned()
    }

    /// Ask the reader for the UID of the tag in its field.
    pub fn read_uid(&mut self) -> Result<TagUid, TransportError> {
        self.connect()?;
        let (data, sw1, sw2) = self.transmit(&[CLA, INS_GET_DATA, 0x00, 0x00, 0x00])?;
        check_status(sw1, sw2)?;
        Ok(TagUid::new(data))
    }

    fn reader_cstr(&self) -> &CStr {
        self.reader.as_c_str()
    }

    fn transmit(&mut self, command: &[u8]) -> Result<(Vec<u8>, u8, u8), TransportError> {
        let card = self.card.as_ref().ok_or(TransportError::NotConnected)?;

        let mut buffer = [0u8; MAX_BUFFER_SIZE];
        let response = card.transmit(command, &mut buffer)?;
        let (data, status) = match response.len() {
            n if n >= 2 => response.split_at(n - 2),
            _ => return Err(TransportError::Other("short response from reader".to_string())),
        };
        trace!(ins = command[1], sw = %hex::encode_upper(status), "reader exchange");
        Ok((data.to_vec(), status[0], status[1]))
    }

    /// A failed authentication halts the tag; wake it up again.
    fn reactivate(&mut self) -> Result<(), TransportError> {
        if let Some(card) = self.card.as_mut() {
            card.reconnect(ShareMode::Shared, Protocols::ANY, Disposition::ResetCard)?;
        }
        Ok(())
    }
}

fn check_status(sw1: u8, sw2: u8) -> Result<(), TransportError> {
    if (sw1, sw2) == (0x90, 0x00) {
        Ok(())
    } else {
        Err(TransportError::Status { sw1, sw2 })
    }
}

fn is_rejection(sw1: u8, sw2: u8) -> bool {
    sw1 == 0x63 || (sw1, sw2) == (0x69, 0x82) || (sw1, sw2) == (0x69, 0x88)
}

impl TagTransport for PcscTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.card.is_some() {
            return Ok(());
        }
        let card = self
            .context
            .connect(self.reader_cstr(), ShareMode::Shared, Protocols::ANY)?;
        self.card = Some(card);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(card) = self.card.take() {
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_, e)| TransportError::from(e))?;
        }
        Ok(())
    }

    fn authenticate_sector(
        &mut self,
        sector: u8,
        key: &SectorKey,
        role: KeyRole,
    ) -> Result<bool, TransportError> {
        let block = self.sector_to_block(sector)?;

        let mut load_key = vec![CLA, INS_LOAD_KEY, 0x00, KEY_SLOT, 0x06];
        load_key.extend_from_slice(key.as_bytes());
        let (_, sw1, sw2) = self.transmit(&load_key)?;
        load_key.fill(0);
        check_status(sw1, sw2)?;

        let key_type = match role {
            KeyRole::A => KEY_TYPE_A,
            KeyRole::B => KEY_TYPE_B,
        };
        let auth = [
            CLA,
            INS_GENERAL_AUTHENTICATE,
            0x00,
            0x00,
            0x05,
            0x01,
            0x00,
            block,
            key_type,
            KEY_SLOT,
        ];
        let (_, sw1, sw2) = self.transmit(&auth)?;
        if is_rejection(sw1, sw2) {
            self.reactivate()?;
            return Ok(false);
        }
        check_status(sw1, sw2)?;
        Ok(true)
    }

    fn read_block(&mut self, block: u8) -> Result<Block, TransportError> {
        let (data, sw1, sw2) =
            self.transmit(&[CLA, INS_READ_BINARY, 0x00, block, BLOCK_SIZE as u8])?;
        check_status(sw1, sw2)?;
        data.as_slice()
            .try_into()
            .map_err(|_| TransportError::Other(format!("block {block} returned {} bytes", data.len())))
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
