use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key derivation error: {0}")]
    Derivation(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid tag dump: {reason}")]
    InvalidDump { reason: String },

    #[error("Invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Failures raised by a tag session. A rejected key is not one of these:
/// `authenticate_sector` reports it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Tag session is not connected")]
    NotConnected,

    #[error("Block {block} is not in an authenticated sector")]
    NotAuthenticated { block: u8 },

    #[error("Block {block} is outside the tag")]
    BlockOutOfRange { block: u8 },

    #[error("Sector {sector} is outside the tag")]
    SectorOutOfRange { sector: u8 },

    #[error("Reader returned status {sw1:02X}{sw2:02X}")]
    Status { sw1: u8, sw2: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "pcsc")]
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Byte {byte:#04x} at offset {offset} is not US-ASCII")]
    NonAscii { offset: usize, byte: u8 },

    #[error("Expected a {expected}-byte block, got {actual} bytes")]
    BlockLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, SpoolError>;
