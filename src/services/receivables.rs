//! Bill-wise outstanding reconciliation.
//!
//! Rebuilds the receivables fact from two inputs already in the warehouse:
//! opening bill allocations (master load) and raw voucher allocations
//! (voucher loads). Receivables follow the source's sign convention: bills
//! are negative movements on the party ledger, settlements positive, so a
//! bill is outstanding while its signed sum stays negative.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::info;

use super::EtlError;
use crate::repos::bill_repo;
pub use crate::repos::bill_repo::{BillFact, BillMovement, MovementKind};

#[derive(Default)]
struct Aggregate {
    opening: Decimal,
    new_ref: Decimal,
    agst_ref: Decimal,
    advance: Decimal,
    has_new_ref: bool,
    bill_date: Option<NaiveDate>,
    credit_period_days: Option<i32>,
    last_adjusted_date: Option<NaiveDate>,
}

/// Aggregate movements into outstanding bills.
///
/// Per `(ledger, ref_name)`:
/// - the signed base is the New Ref total when one exists, else the opening
///   residual (an in-window New Ref supersedes the opening row for the same
///   bill rather than double counting it);
/// - `pending` is the magnitude of base + advances + adjustments, kept only
///   while that sum is still on the receivable side;
/// - `original` is the New Ref magnitude, or pending plus adjustments when
///   the bill predates the books;
/// - `bill_date` is the earliest New Ref/Opening date, `due_date` adds the
///   credit period, `last_adjusted_date` is the latest Agst Ref date.
pub fn reconcile(movements: &[BillMovement]) -> Vec<BillFact> {
    let mut groups: BTreeMap<(String, String), Aggregate> = BTreeMap::new();

    for m in movements {
        let agg = groups
            .entry((m.ledger.clone(), m.ref_name.clone()))
            .or_default();

        match m.kind {
            MovementKind::Opening => {
                agg.opening += m.amount;
                agg.bill_date = min_date(agg.bill_date, m.date);
                agg.credit_period_days = max_days(agg.credit_period_days, m.credit_period_days);
            }
            MovementKind::NewRef => {
                agg.new_ref += m.amount;
                agg.has_new_ref = true;
                agg.bill_date = min_date(agg.bill_date, m.date);
                agg.credit_period_days = max_days(agg.credit_period_days, m.credit_period_days);
            }
            MovementKind::AgstRef => {
                agg.agst_ref += m.amount;
                agg.last_adjusted_date = max_date(agg.last_adjusted_date, m.date);
            }
            MovementKind::Advance => agg.advance += m.amount,
            MovementKind::OnAccount => {}
        }
    }

    let threshold = Decimal::new(1, 2); // 0.01
    let mut facts = Vec::new();

    for ((ledger, ref_name), agg) in groups {
        let base = if agg.has_new_ref {
            agg.new_ref
        } else {
            agg.opening
        };

        let signed_sum = base + agg.advance + agg.agst_ref;
        // Outstanding receivables stay negative; anything at or past zero is
        // settled (or overpaid) and drops out.
        if signed_sum >= -threshold {
            continue;
        }

        let pending = signed_sum.abs();
        let adjusted = agg.agst_ref.abs();
        let original = if agg.has_new_ref {
            agg.new_ref.abs()
        } else {
            pending + adjusted
        };

        let due_date = match (agg.bill_date, agg.credit_period_days) {
            (Some(d), Some(days)) if days > 0 => Some(d + chrono::Duration::days(days as i64)),
            _ => None,
        };

        facts.push(BillFact {
            ledger,
            ref_name,
            bill_date: agg.bill_date,
            due_date,
            original_amount: original.round_dp(2),
            adjusted_amount: adjusted.round_dp(2),
            pending_amount: pending.round_dp(2),
            last_adjusted_date: agg.last_adjusted_date,
        });
    }

    facts
}

fn min_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (x, None) | (None, x) => x,
    }
}

fn max_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (x, None) | (None, x) => x,
    }
}

fn max_days(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (x, None) | (None, x) => x,
    }
}

/// Categorise how overdue a bill is.
pub fn aging_bucket(due_date: Option<NaiveDate>, today: NaiveDate) -> &'static str {
    let Some(due) = due_date else {
        return "No Due Date";
    };
    if today <= due {
        return "Not Due";
    }
    match (today - due).num_days() {
        1..=30 => "0-30 Days",
        31..=60 => "31-60 Days",
        61..=90 => "61-90 Days",
        _ => "90+ Days",
    }
}

/// Outstanding bill with its aging bucket, for reporting.
#[derive(Debug, Clone)]
pub struct OutstandingBill {
    pub fact: BillFact,
    pub aging_bucket: &'static str,
}

/// Recompute the receivables fact from warehouse state.
pub async fn reconcile_bills(pool: &PgPool) -> Result<usize, EtlError> {
    let movements = bill_repo::load_movements(pool).await?;
    info!(movements = movements.len(), "loaded bill movements");

    let facts = reconcile(&movements);
    let written = bill_repo::rebuild_fact(pool, &facts).await?;
    info!(rows = written, "rebuilt bill receivables fact");

    Ok(written)
}

/// Fact rows with aging buckets attached as of `today`.
pub async fn outstanding_with_aging(
    pool: &PgPool,
    today: NaiveDate,
) -> Result<Vec<OutstandingBill>, EtlError> {
    let facts = bill_repo::fetch_facts(pool).await?;
    Ok(facts
        .into_iter()
        .map(|fact| OutstandingBill {
            aging_bucket: aging_bucket(fact.due_date, today),
            fact,
        })
        .collect())
}
