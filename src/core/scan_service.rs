use std::ops::{Deref, DerefMut};

use tracing::{debug, info, warn};

use crate::core::models::{
    DerivedKeySet, KeyDerivationParams, KeyRole, ScanOutcome, SectorKey, TagUid,
};
use crate::core::record_codec;
use crate::crypto::kdf;
use crate::error::{Result, TransportError};
use crate::storage::format::SPOOL_SECTOR;
use crate::transport::TagTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    /// Sector whose first two blocks hold the record.
    pub sector: u8,
    pub derivation: KeyDerivationParams,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            sector: SPOOL_SECTOR,
            derivation: KeyDerivationParams::default(),
        }
    }
}

/// Which candidate opened the sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthMatch {
    pub key_index: usize,
    pub role: KeyRole,
}

/// One completed scan, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub uid: TagUid,
    pub outcome: ScanOutcome,
}

/// Every key in order, role A before role B for each.
pub fn trial_order(keys: &[SectorKey]) -> impl Iterator<Item = (usize, &SectorKey, KeyRole)> {
    keys.iter()
        .enumerate()
        .flat_map(|(index, key)| KeyRole::ALL.into_iter().map(move |role| (index, key, role)))
}

/// Try the candidates against `sector` until one is accepted.
///
/// `Ok(None)` means every key was rejected in both roles, which is an
/// ordinary answer from a tag this reader was not provisioned for.
pub fn authenticate<T: TagTransport + ?Sized>(
    transport: &mut T,
    sector: u8,
    keys: &[SectorKey],
) -> std::result::Result<Option<AuthMatch>, TransportError> {
    for (key_index, key, role) in trial_order(keys) {
        debug!(sector, key_index, %role, "trying candidate key");
        if transport.authenticate_sector(sector, key, role)? {
            info!(sector, key_index, %role, "sector authenticated");
            return Ok(Some(AuthMatch { key_index, role }));
        }
    }
    warn!(sector, candidates = keys.len(), "no candidate key opened the sector");
    Ok(None)
}

/// Closes the transport when dropped, whichever way the scan ends.
struct Session<'a, T: TagTransport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: TagTransport + ?Sized> Session<'a, T> {
    fn new(transport: &'a mut T) -> Self {
        Self { transport }
    }
}

impl<T: TagTransport + ?Sized> Deref for Session<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.transport
    }
}

impl<T: TagTransport + ?Sized> DerefMut for Session<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.transport
    }
}

impl<T: TagTransport + ?Sized> Drop for Session<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.close() {
            warn!(error = %e, "failed to close tag session");
        }
    }
}

/// Derive the tag's keys, authenticate, read and decode the spool record.
///
/// Only key derivation errors are returned as `Err`; authentication
/// exhaustion and transport failures are reported in the outcome. The
/// transport is closed exactly once after derivation succeeds.
pub fn read_spool<T: TagTransport + ?Sized>(
    transport: &mut T,
    uid: &TagUid,
    params: &ScanParams,
) -> Result<ScanOutcome> {
    let keys = kdf::derive_sector_keys(uid, &params.derivation)?;
    debug!(%uid, candidates = keys.len(), "derived candidate keys");

    let mut session = Session::new(transport);
    match read_with_keys(&mut *session, params.sector, &keys) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            warn!(%uid, error = %e, "tag read failed");
            Ok(ScanOutcome::ReadError(e.to_string()))
        }
    }
}

fn read_with_keys<T: TagTransport + ?Sized>(
    transport: &mut T,
    sector: u8,
    keys: &DerivedKeySet,
) -> std::result::Result<ScanOutcome, TransportError> {
    transport.connect()?;

    if authenticate(transport, sector, keys.as_slice())?.is_none() {
        return Ok(ScanOutcome::AuthenticationFailed);
    }

    let first = transport.sector_to_block(sector)?;
    let second = first
        .checked_add(1)
        .ok_or(TransportError::BlockOutOfRange { block: first })?;
    let name_block = transport.read_block(first)?;
    let color_block = transport.read_block(second)?;

    let record = record_codec::decode_or_unknown(&name_block, &color_block);
    info!(name = %record.name, color = %record.color, "spool record decoded");
    Ok(ScanOutcome::Decoded(record))
}

/// Runs scans with a fixed set of parameters.
#[derive(Debug, Clone, Default)]
pub struct ScanService {
    params: ScanParams,
}

impl ScanService {
    pub fn new(params: ScanParams) -> Self {
        Self { params }
    }

    pub fn derive_keys(&self, uid: &TagUid) -> Result<DerivedKeySet> {
        kdf::derive_sector_keys(uid, &self.params.derivation)
    }

    pub fn scan<T: TagTransport + ?Sized>(
        &self,
        transport: &mut T,
        uid: TagUid,
    ) -> Result<ScanReport> {
        let outcome = read_spool(transport, &uid, &self.params)?;
        Ok(ScanReport { uid, outcome })
    }
}
