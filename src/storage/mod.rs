pub mod dump_file;
pub mod format;
