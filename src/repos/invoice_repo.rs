//! Invoice header, line and bill-allocation writes.
//!
//! Headers upsert by `invoice_key` (last writer wins). Lines and bill
//! allocations are regenerated: deleted and reinserted per voucher, so a
//! re-observation never leaves stale rows behind.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::WarehouseError;
use crate::parsers::vouchers::BillAllocation;

/// One invoice header row, any voucher type.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceHeader {
    pub invoice_key: String,
    pub voucher_key: String,
    pub voucher_type: String,
    pub date: NaiveDate,
    pub customer_id: String,
    pub salesperson_id: Option<String>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub roundoff: Decimal,
}

/// One item line, already priced and tax-allocated.
#[derive(Debug, Clone)]
pub struct InvoiceLineInsert {
    pub item_name: String,
    pub qty: Option<Decimal>,
    pub uom: Option<String>,
    pub rate: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub line_basic: Decimal,
    pub line_tax: Decimal,
    pub line_total: Decimal,
}

/// Insert-or-update a header by its stable key.
pub async fn upsert_invoice(
    tx: &mut Transaction<'_, Postgres>,
    header: &InvoiceHeader,
) -> Result<(), WarehouseError> {
    sqlx::query(
        r#"
        INSERT INTO invoice_header (
            invoice_key, voucher_key, voucher_type, date, customer_id,
            salesperson_id, subtotal, tax, total, roundoff, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
        ON CONFLICT (invoice_key) DO UPDATE SET
            voucher_type = EXCLUDED.voucher_type,
            date = EXCLUDED.date,
            customer_id = EXCLUDED.customer_id,
            salesperson_id = EXCLUDED.salesperson_id,
            subtotal = EXCLUDED.subtotal,
            tax = EXCLUDED.tax,
            total = EXCLUDED.total,
            roundoff = EXCLUDED.roundoff,
            updated_at = NOW()
        "#,
    )
    .bind(&header.invoice_key)
    .bind(&header.voucher_key)
    .bind(&header.voucher_type)
    .bind(header.date)
    .bind(&header.customer_id)
    .bind(&header.salesperson_id)
    .bind(header.subtotal)
    .bind(header.tax)
    .bind(header.total)
    .bind(header.roundoff)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Delete and reinsert the lines of one invoice. Item ids resolve against
/// the item dimension by name where a match exists.
pub async fn replace_invoice_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_key: &str,
    lines: &[InvoiceLineInsert],
) -> Result<(), WarehouseError> {
    sqlx::query("DELETE FROM invoice_line WHERE invoice_key = $1")
        .bind(invoice_key)
        .execute(&mut **tx)
        .await?;

    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO invoice_line (
                invoice_key, item_id, item_name, qty, uom, rate, discount,
                line_basic, line_tax, line_total
            )
            VALUES (
                $1,
                (SELECT item_id FROM item_dim WHERE lower(name) = lower($2)),
                $2, $3, $4, $5, $6, $7, $8, $9
            )
            "#,
        )
        .bind(invoice_key)
        .bind(&line.item_name)
        .bind(line.qty)
        .bind(&line.uom)
        .bind(line.rate)
        .bind(line.discount)
        .bind(line.line_basic)
        .bind(line.line_tax)
        .bind(line.line_total)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Delete and reinsert the raw bill allocations of one voucher. The
/// receivables reconciler reads these back, so they must mirror the source
/// exactly (signs preserved).
pub async fn replace_bill_allocations(
    tx: &mut Transaction<'_, Postgres>,
    voucher_key: &str,
    voucher_date: NaiveDate,
    allocations: &[BillAllocation],
) -> Result<(), WarehouseError> {
    sqlx::query("DELETE FROM bill_allocation WHERE voucher_key = $1")
        .bind(voucher_key)
        .execute(&mut **tx)
        .await?;

    for alloc in allocations {
        sqlx::query(
            r#"
            INSERT INTO bill_allocation (
                voucher_key, voucher_date, ledger, ref_name, amount,
                bill_type, credit_period_days
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(voucher_key)
        .bind(voucher_date)
        .bind(&alloc.ledger)
        .bind(&alloc.ref_name)
        .bind(alloc.amount)
        .bind(&alloc.bill_type)
        .bind(alloc.credit_period_days)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Delete headers (lines cascade), receipts and raw allocations inside a
/// date range. Used by clear-and-reload.
pub async fn delete_range(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<u64, WarehouseError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM bill_allocation WHERE voucher_date >= $1 AND voucher_date <= $2")
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM receipt WHERE date >= $1 AND date <= $2")
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM invoice_header WHERE date >= $1 AND date <= $2")
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted)
}

/// Header count within a window; used for post-load verification logging.
pub async fn count_in_range(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, WarehouseError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM invoice_header WHERE date >= $1 AND date <= $2")
            .bind(from)
            .bind(to)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
