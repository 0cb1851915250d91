#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod transport;
pub mod ui;
