//! Reads and writes for the bill-wise receivables reconciliation.
//!
//! The reconciler is a second pass over already-loaded state: opening bills
//! from the master load and raw voucher allocations from the voucher load.
//! It never talks to the source.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::WarehouseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    /// Opening residual from the ledger masters.
    Opening,
    /// Invoice creation; magnitude is the original bill amount.
    NewRef,
    /// Payment or adjustment against the bill.
    AgstRef,
    /// Money received before any bill existed.
    Advance,
    /// Unallocated settlement; tracked but outside the bill algebra.
    OnAccount,
}

/// One signed movement on a `(ledger, ref_name)` bill.
#[derive(Debug, Clone)]
pub struct BillMovement {
    pub ledger: String,
    pub ref_name: String,
    pub date: Option<NaiveDate>,
    pub amount: Decimal,
    pub kind: MovementKind,
    pub credit_period_days: Option<i32>,
}

/// One reconciled outstanding bill.
#[derive(Debug, Clone, FromRow)]
pub struct BillFact {
    pub ledger: String,
    pub ref_name: String,
    pub bill_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub original_amount: Decimal,
    pub adjusted_amount: Decimal,
    pub pending_amount: Decimal,
    pub last_adjusted_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct OpeningRow {
    ledger: String,
    ref_name: String,
    bill_date: Option<NaiveDate>,
    opening_balance: Decimal,
    credit_period_days: Option<i32>,
}

#[derive(Debug, FromRow)]
struct AllocationRow {
    ledger: String,
    ref_name: String,
    voucher_date: NaiveDate,
    amount: Decimal,
    bill_type: String,
    credit_period_days: Option<i32>,
}

/// Load every movement the reconciliation aggregates over: one opening
/// movement per opening bill, one per voucher allocation.
pub async fn load_movements(pool: &PgPool) -> Result<Vec<BillMovement>, WarehouseError> {
    let mut movements = Vec::new();

    let openings: Vec<OpeningRow> = sqlx::query_as(
        r#"
        SELECT ledger, ref_name, bill_date, opening_balance, credit_period_days
        FROM opening_bill
        WHERE ref_name <> '' AND opening_balance <> 0
        "#,
    )
    .fetch_all(pool)
    .await?;

    for row in openings {
        movements.push(BillMovement {
            ledger: row.ledger,
            ref_name: row.ref_name,
            date: row.bill_date,
            amount: row.opening_balance,
            kind: MovementKind::Opening,
            credit_period_days: row.credit_period_days,
        });
    }

    let allocations: Vec<AllocationRow> = sqlx::query_as(
        r#"
        SELECT ledger, ref_name, voucher_date, amount, bill_type, credit_period_days
        FROM bill_allocation
        WHERE ref_name <> ''
        "#,
    )
    .fetch_all(pool)
    .await?;

    for row in allocations {
        let kind = match row.bill_type.as_str() {
            "Agst Ref" => MovementKind::AgstRef,
            "Advance" => MovementKind::Advance,
            "On Account" => MovementKind::OnAccount,
            // Empty bill types behave like invoice creation.
            _ => MovementKind::NewRef,
        };
        movements.push(BillMovement {
            ledger: row.ledger,
            ref_name: row.ref_name,
            date: Some(row.voucher_date),
            amount: row.amount,
            kind,
            credit_period_days: row.credit_period_days,
        });
    }

    Ok(movements)
}

/// Replace the fact table with the freshly reconciled rows. Wholesale
/// rebuild: the reconciliation is cheap and never mutated incrementally.
pub async fn rebuild_fact(pool: &PgPool, facts: &[BillFact]) -> Result<usize, WarehouseError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM bill_receivable_fact")
        .execute(&mut *tx)
        .await?;

    for fact in facts {
        sqlx::query(
            r#"
            INSERT INTO bill_receivable_fact (
                ledger, ref_name, bill_date, due_date, original_amount,
                adjusted_amount, pending_amount, last_adjusted_date, last_seen_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            "#,
        )
        .bind(&fact.ledger)
        .bind(&fact.ref_name)
        .bind(fact.bill_date)
        .bind(fact.due_date)
        .bind(fact.original_amount)
        .bind(fact.adjusted_amount)
        .bind(fact.pending_amount)
        .bind(fact.last_adjusted_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(facts.len())
}

/// Current fact rows, largest outstanding first. The service attaches aging
/// buckets on top of these.
pub async fn fetch_facts(pool: &PgPool) -> Result<Vec<BillFact>, WarehouseError> {
    let rows: Vec<BillFact> = sqlx::query_as(
        r#"
        SELECT ledger, ref_name, bill_date, due_date, original_amount,
               adjusted_amount, pending_amount, last_adjusted_date
        FROM bill_receivable_fact
        ORDER BY pending_amount DESC, ledger, ref_name
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
