pub mod spool_card;
