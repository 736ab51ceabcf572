//! Receipt writes: the cashflow mirror of `Receipt` vouchers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use super::WarehouseError;

#[derive(Debug, Clone)]
pub struct ReceiptUpsert<'a> {
    pub receipt_key: &'a str,
    pub date: NaiveDate,
    pub customer_id: &'a str,
    pub amount: Decimal,
}

pub async fn upsert_receipt(
    tx: &mut Transaction<'_, Postgres>,
    receipt: &ReceiptUpsert<'_>,
) -> Result<(), WarehouseError> {
    sqlx::query(
        r#"
        INSERT INTO receipt (receipt_key, date, customer_id, amount, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (receipt_key) DO UPDATE SET
            date = EXCLUDED.date,
            customer_id = EXCLUDED.customer_id,
            amount = EXCLUDED.amount,
            updated_at = NOW()
        "#,
    )
    .bind(receipt.receipt_key)
    .bind(receipt.date)
    .bind(receipt.customer_id)
    .bind(receipt.amount)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
