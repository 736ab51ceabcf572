//! Date-windowed voucher loading: the incremental run, historical
//! backfills and clear-and-reload.
//!
//! One fetch serves two streams: every voucher lands in the header table,
//! and `Receipt` vouchers are re-projected into the receipt table from the
//! same in-memory batch. That batch lives exactly as long as one window
//! load; there is no cross-run cache.

use chrono::{Datelike, Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};

use super::line_tax::allocate_line_tax;
use super::EtlError;
use crate::client::TallyClient;
use crate::parsers::vouchers::{parse_vouchers, ParsedVoucher};
use crate::parsers::xml::{parse_qty_uom, parse_rate};
use crate::repos::checkpoint_repo;
use crate::repos::customer_repo::{self, CustomerUpsert};
use crate::repos::invoice_repo::{self, InvoiceHeader, InvoiceLineInsert};
use crate::repos::receipt_repo::{self, ReceiptUpsert};
use crate::repos::WarehouseError;

pub const INVOICE_STREAM: &str = "invoices";

/// Parties missing from the source still need a dimension row for the FK.
const UNKNOWN_CUSTOMER: &str = "UNKNOWN";

/// How a backfill walks its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillMode {
    /// One fetch for the whole range.
    Range,
    /// One fetch per day, batched for large ranges.
    DayByDay,
}

/// Outcome of one window load.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowCounts {
    /// Vouchers parsed out of the response.
    pub fetched: usize,
    /// Headers written (or would-be-written under dry-run).
    pub written: usize,
    /// Receipt rows projected.
    pub receipts: usize,
    /// Vouchers outside the requested window, dropped client-side.
    pub filtered: usize,
    /// Vouchers lost to parse skips or warehouse failures.
    pub errored: usize,
}

impl WindowCounts {
    fn absorb(&mut self, other: WindowCounts) {
        self.fetched += other.fetched;
        self.written += other.written;
        self.receipts += other.receipts;
        self.filtered += other.filtered;
        self.errored += other.errored;
    }
}

/// April-to-March fiscal year start for a given day.
pub fn fiscal_year_start(today: NaiveDate) -> NaiveDate {
    let year = if today.month() >= 4 {
        today.year()
    } else {
        today.year() - 1
    };
    NaiveDate::from_ymd_opt(year, 4, 1).expect("April 1 is always valid")
}

/// Incremental run: fetch everything since the checkpoint (with a one-day
/// overlap to absorb late edits), then advance the checkpoint to today.
///
/// The checkpoint only moves after the whole window has been processed; a
/// failed run leaves it untouched and is retried from the same point.
pub async fn run_incremental(pool: &PgPool, client: &TallyClient) -> Result<WindowCounts, EtlError> {
    let today = Local::now().date_naive();
    let checkpoint = checkpoint_repo::get_checkpoint(pool, INVOICE_STREAM).await?;
    let base = checkpoint.unwrap_or_else(|| fiscal_year_start(today));
    let from = base - Duration::days(1);

    info!(%from, to = %today, checkpoint = ?checkpoint, "incremental run");

    match load_window(pool, client, from, today, false).await {
        Ok(counts) => {
            checkpoint_repo::set_checkpoint(pool, INVOICE_STREAM, today).await?;
            let status = if counts.errored == 0 { "ok" } else { "partial" };
            checkpoint_repo::append_run_log(
                pool,
                INVOICE_STREAM,
                counts.written as i32,
                status,
                None,
            )
            .await?;
            info!(
                written = counts.written,
                receipts = counts.receipts,
                errored = counts.errored,
                status,
                "incremental run complete"
            );
            Ok(counts)
        }
        Err(e) => {
            error!(error = %e, "incremental run failed");
            checkpoint_repo::append_run_log(pool, INVOICE_STREAM, 0, "error", Some(&e.to_string()))
                .await?;
            Err(e)
        }
    }
}

/// Historical load over `[from, to]`. Never touches checkpoints: backfills
/// are manual and must not perturb the incremental stream's progress.
pub async fn run_backfill(
    pool: &PgPool,
    client: &TallyClient,
    from: NaiveDate,
    to: NaiveDate,
    mode: BackfillMode,
    dry_run: bool,
    batch_days: i64,
) -> Result<WindowCounts, EtlError> {
    if from > to {
        return Err(EtlError::InvalidArgs(format!(
            "from date {from} is after to date {to}"
        )));
    }
    let today = Local::now().date_naive();
    let to = if to > today {
        warn!(%to, "end date is in the future, clamping to today");
        today
    } else {
        to
    };

    if dry_run {
        warn!("dry run: nothing will be written");
    }

    let mut totals = WindowCounts::default();

    match mode {
        BackfillMode::Range => {
            info!(%from, %to, "backfill (single range fetch)");
            totals.absorb(load_window(pool, client, from, to, dry_run).await?);
        }
        BackfillMode::DayByDay => {
            let total_days = (to - from).num_days() + 1;
            info!(%from, %to, total_days, batch_days, "backfill (day by day)");

            let mut batch_start = from;
            let mut batch_num = 1;
            while batch_start <= to {
                let batch_end = (batch_start + Duration::days(batch_days - 1)).min(to);
                info!(batch = batch_num, %batch_start, %batch_end, "processing batch");

                let mut day = batch_start;
                while day <= batch_end {
                    let counts = load_window(pool, client, day, day, dry_run).await?;
                    if counts.written > 0 {
                        info!(%day, written = counts.written, "day loaded");
                    }
                    totals.absorb(counts);
                    day += Duration::days(1);
                }

                info!(
                    batch = batch_num,
                    written = totals.written,
                    "batch complete"
                );
                batch_start = batch_end + Duration::days(1);
                batch_num += 1;
                if batch_start <= to {
                    // Give the source a moment between batches; large
                    // exports are known to destabilise it.
                    tokio::time::sleep(StdDuration::from_secs(1)).await;
                }
            }
        }
    }

    if !dry_run {
        let in_db = invoice_repo::count_in_range(pool, from, to).await?;
        info!(
            written = totals.written,
            headers_in_range = in_db,
            "backfill complete"
        );
        let status = if totals.errored == 0 { "ok" } else { "partial" };
        checkpoint_repo::append_run_log(pool, "backfill", totals.written as i32, status, None)
            .await?;
    }

    Ok(totals)
}

/// Delete everything in the window, then backfill it afresh. For reloading
/// history after parser or mapping changes.
pub async fn clear_and_reload(
    pool: &PgPool,
    client: &TallyClient,
    from: NaiveDate,
    to: NaiveDate,
    mode: BackfillMode,
    dry_run: bool,
    batch_days: i64,
) -> Result<WindowCounts, EtlError> {
    if dry_run {
        info!(%from, %to, "[dry run] would delete and reload this window");
        return run_backfill(pool, client, from, to, mode, true, batch_days).await;
    }

    let deleted = invoice_repo::delete_range(pool, from, to).await?;
    info!(deleted, %from, %to, "cleared window");

    run_backfill(pool, client, from, to, mode, false, batch_days).await
}

/// Fetch one window, filter to it, and write each voucher in its own
/// transaction. The parsed batch then serves the receipt projection.
async fn load_window(
    pool: &PgPool,
    client: &TallyClient,
    from: NaiveDate,
    to: NaiveDate,
    dry_run: bool,
) -> Result<WindowCounts, EtlError> {
    let response = client.fetch_vouchers(from, to).await?;
    let (all_vouchers, parse_skipped) = parse_vouchers(&response)?;

    // The register is asked for the window, but variants of the source are
    // known to ignore date parameters; filter again here.
    let mut vouchers: Vec<ParsedVoucher> = Vec::with_capacity(all_vouchers.len());
    let mut filtered = 0;
    for v in all_vouchers {
        if v.date >= from && v.date <= to {
            vouchers.push(v);
        } else {
            filtered += 1;
        }
    }
    if filtered > 0 {
        warn!(filtered, %from, %to, "dropped vouchers outside the requested window");
    }

    let mut counts = WindowCounts {
        fetched: vouchers.len() + filtered,
        filtered,
        errored: parse_skipped,
        ..Default::default()
    };

    if dry_run {
        counts.written = vouchers.len();
        counts.receipts = vouchers.iter().filter(|v| v.is_receipt()).count();
        info!(
            %from, %to,
            headers = counts.written,
            receipts = counts.receipts,
            "[dry run] window parsed"
        );
        return Ok(counts);
    }

    let written = write_batch(pool, &vouchers).await;
    counts.absorb(written);
    Ok(counts)
}

/// Write a parsed batch: every voucher into the header table (each in its
/// own transaction), then the `Receipt` vouchers re-projected into the
/// receipt table from the same batch. A failed voucher is logged and
/// skipped; the rest of the batch proceeds.
pub async fn write_batch(pool: &PgPool, vouchers: &[ParsedVoucher]) -> WindowCounts {
    let mut counts = WindowCounts::default();

    for voucher in vouchers {
        match write_voucher(pool, voucher).await {
            Ok(()) => counts.written += 1,
            Err(e) => {
                warn!(
                    voucher_key = %voucher.voucher_key,
                    error = %e,
                    "failed to write voucher, continuing"
                );
                counts.errored += 1;
            }
        }
    }

    for voucher in vouchers.iter().filter(|v| v.is_receipt()) {
        match write_receipt(pool, voucher).await {
            Ok(()) => counts.receipts += 1,
            Err(e) => {
                warn!(
                    voucher_key = %voucher.voucher_key,
                    error = %e,
                    "failed to write receipt, continuing"
                );
                counts.errored += 1;
            }
        }
    }

    counts
}

fn customer_id_of(voucher: &ParsedVoucher) -> &str {
    if voucher.party.is_empty() {
        UNKNOWN_CUSTOMER
    } else {
        &voucher.party
    }
}

/// Header, lines, raw bill allocations and the customer row, atomically.
async fn write_voucher(pool: &PgPool, voucher: &ParsedVoucher) -> Result<(), WarehouseError> {
    let customer_id = customer_id_of(voucher);
    let mut tx = pool.begin().await?;

    customer_repo::upsert_customer(
        &mut tx,
        &CustomerUpsert {
            customer_id,
            name: customer_id,
            gstin: voucher.party_gstin.as_deref(),
            pincode: voucher.party_pincode.as_deref(),
            city: voucher.party_city.as_deref(),
        },
    )
    .await?;

    let header = InvoiceHeader {
        invoice_key: voucher.voucher_key.clone(),
        voucher_key: voucher.voucher_key.clone(),
        voucher_type: voucher.voucher_type.clone(),
        date: voucher.date,
        customer_id: customer_id.to_string(),
        salesperson_id: None,
        subtotal: voucher.subtotal,
        tax: voucher.tax,
        total: voucher.total,
        roundoff: voucher.roundoff,
    };
    invoice_repo::upsert_invoice(&mut tx, &header).await?;

    let lines = build_lines(voucher);
    if !lines.is_empty() {
        // Line totals must land within one currency unit of the header;
        // a mismatch is written anyway but flagged for investigation.
        let line_sum: Decimal = lines.iter().map(|l| l.line_total).sum();
        if (line_sum - voucher.total).abs() > Decimal::ONE {
            warn!(
                voucher_key = %voucher.voucher_key,
                %line_sum,
                total = %voucher.total,
                "line totals disagree with the header beyond tolerance"
            );
        }
    }
    invoice_repo::replace_invoice_lines(&mut tx, &voucher.voucher_key, &lines).await?;

    invoice_repo::replace_bill_allocations(
        &mut tx,
        &voucher.voucher_key,
        voucher.date,
        &voucher.bill_allocations,
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn write_receipt(pool: &PgPool, voucher: &ParsedVoucher) -> Result<(), WarehouseError> {
    let customer_id = customer_id_of(voucher);
    let mut tx = pool.begin().await?;

    customer_repo::upsert_customer(
        &mut tx,
        &CustomerUpsert {
            customer_id,
            name: customer_id,
            gstin: voucher.party_gstin.as_deref(),
            pincode: voucher.party_pincode.as_deref(),
            city: voucher.party_city.as_deref(),
        },
    )
    .await?;

    receipt_repo::upsert_receipt(
        &mut tx,
        &ReceiptUpsert {
            receipt_key: &voucher.voucher_key,
            date: voucher.date,
            customer_id,
            amount: voucher.total,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Price the item lines and spread the voucher tax across them.
fn build_lines(voucher: &ParsedVoucher) -> Vec<InvoiceLineInsert> {
    let basics: Vec<_> = voucher.inventory.iter().map(|e| e.amount).collect();
    let taxes = allocate_line_tax(&basics, voucher.tax);

    voucher
        .inventory
        .iter()
        .zip(taxes)
        .map(|(entry, line_tax)| {
            let (qty, uom) = entry
                .billed_qty
                .as_deref()
                .map(parse_qty_uom)
                .unwrap_or((None, None));
            let rate = entry.rate.as_deref().and_then(parse_rate);
            InvoiceLineInsert {
                item_name: entry.item_name.clone(),
                qty,
                uom,
                rate,
                discount: entry.discount,
                line_basic: entry.amount,
                line_tax,
                line_total: entry.amount + line_tax,
            }
        })
        .collect()
}
