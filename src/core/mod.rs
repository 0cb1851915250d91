pub mod models;
pub mod record_codec;
pub mod scan_service;
