pub mod kdf;
