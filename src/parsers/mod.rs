//! XML parsers for the source's voucher and master exports.

pub mod masters;
pub mod opening_bills;
pub mod vouchers;
pub mod xml;

pub use xml::ParseError;
