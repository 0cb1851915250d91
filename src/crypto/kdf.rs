use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretBox};
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroizing;

use crate::core::models::{DerivedKeySet, KeyDerivationParams, SectorKey, TagUid, KEY_LENGTH};
use crate::error::{Result, SpoolError};

/// Secret shared by every reader. Changing it orphans all provisioned tags.
pub const MASTER_SECRET: [u8; 16] = [
    0x9a, 0x75, 0x9c, 0xf2, 0xc4, 0xf7, 0xca, 0xff, 0x22, 0x2c, 0xb9, 0x76, 0x9b, 0x41, 0xbc, 0x96,
];

/// HKDF info string. The trailing NUL is part of the deployed format.
pub const DOMAIN_INFO: &[u8] = b"RFID-A\0";

const DIGEST_LENGTH: usize = 32;

/// HKDF-SHA256 can expand at most 255 blocks before its counter wraps.
pub const MAX_OUTPUT_LENGTH: usize = 255 * DIGEST_LENGTH;

/// Run HKDF-SHA256 with the master secret as salt and the tag UID as input
/// keying material, returning exactly `length` bytes.
pub fn derive_key_material(
    uid: &[u8],
    master_secret: &[u8],
    info: &[u8],
    length: usize,
) -> Result<SecretBox<Vec<u8>>> {
    if uid.is_empty() {
        return Err(SpoolError::Derivation("tag UID is empty".to_string()));
    }
    if length == 0 {
        return Err(SpoolError::Derivation(
            "requested output length is zero".to_string(),
        ));
    }
    if length > MAX_OUTPUT_LENGTH {
        return Err(SpoolError::Derivation(format!(
            "requested {length} bytes, HKDF-SHA256 yields at most {MAX_OUTPUT_LENGTH}"
        )));
    }

    let hk = Hkdf::<Sha256>::new(Some(master_secret), uid);
    let mut okm = vec![0u8; length];
    hk.expand(info, &mut okm)
        .map_err(|e| SpoolError::Derivation(e.to_string()))?;

    trace!(uid_len = uid.len(), length, "expanded tag key material");
    Ok(SecretBox::new(Box::new(okm)))
}

/// Derive `key_count` keys of `key_length` bytes each, in trial order.
pub fn derive(
    uid: &[u8],
    master_secret: &[u8],
    info: &[u8],
    params: &KeyDerivationParams,
) -> Result<Vec<Zeroizing<Vec<u8>>>> {
    if params.key_length == 0 || params.key_count == 0 {
        return Err(SpoolError::Derivation(format!(
            "key length and count must be positive (got {} x {})",
            params.key_length, params.key_count
        )));
    }
    let length = params.output_length().ok_or_else(|| {
        SpoolError::Derivation(format!(
            "{} keys of {} bytes overflows",
            params.key_count, params.key_length
        ))
    })?;

    let material = derive_key_material(uid, master_secret, info, length)?;
    Ok(material
        .expose_secret()
        .chunks_exact(params.key_length)
        .map(|chunk| Zeroizing::new(chunk.to_vec()))
        .collect())
}

/// Derive the candidate sector keys for `uid` using the deployed secret and info.
pub fn derive_sector_keys(uid: &TagUid, params: &KeyDerivationParams) -> Result<DerivedKeySet> {
    if params.key_length != KEY_LENGTH {
        return Err(SpoolError::Derivation(format!(
            "sector keys are {KEY_LENGTH} bytes, not {}",
            params.key_length
        )));
    }

    let chunks = derive(uid.as_bytes(), &MASTER_SECRET, DOMAIN_INFO, params)?;
    let keys = chunks
        .iter()
        .filter_map(|chunk| SectorKey::from_slice(chunk))
        .collect();
    Ok(DerivedKeySet::new(keys))
}
