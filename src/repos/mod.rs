//! Warehouse write path.
//!
//! Every table is owned here: idempotent upserts keyed by the documented
//! unique constraints, raw SQL with bound parameters throughout. Nothing
//! outside this module mutates warehouse state.

pub mod bill_repo;
pub mod checkpoint_repo;
pub mod customer_repo;
pub mod invoice_repo;
pub mod master_repo;
pub mod receipt_repo;

use thiserror::Error;

/// Errors at the warehouse boundary. A failure aborts the current voucher's
/// transaction only; the driver records it and moves on.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse error: {0}")]
    Database(#[from] sqlx::Error),
}
