//! Drivers and second-pass computations over the warehouse.

pub mod line_tax;
pub mod master_sync;
pub mod receivables;
pub mod sync;

use thiserror::Error;

use crate::client::ClientError;
use crate::parsers::ParseError;
use crate::repos::WarehouseError;

/// Cross-component failure taxonomy surfaced by the drivers.
///
/// Propagation policy: a source error aborts the current fetch, a warehouse
/// error aborts only the current voucher, parse issues inside a document are
/// local warnings. This enum is what reaches the operator.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Source(#[from] ClientError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("file error: {0}")]
    File(#[from] std::io::Error),
}

impl From<sqlx::Error> for EtlError {
    fn from(e: sqlx::Error) -> Self {
        EtlError::Warehouse(WarehouseError::Database(e))
    }
}
