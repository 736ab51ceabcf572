//! Tally ERP → Postgres warehouse ETL.
//!
//! The crate is organised along the pipeline:
//! - [`client`] renders request envelopes and talks HTTP/XML to the source
//! - [`parsers`] turn the source's XML into typed records
//! - [`repos`] own every warehouse write (idempotent upserts, checkpoints)
//! - [`services`] drive date-windowed loads, master syncs and the bill-wise
//!   receivables reconciliation

pub mod client;
pub mod config;
pub mod db;
pub mod parsers;
pub mod repos;
pub mod services;
