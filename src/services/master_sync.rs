//! Master-data sync: dimensions and opening bills.
//!
//! Masters come either from the source (two exports: the inventory masters
//! and the accounts list with bill allocations exploded) or from a single
//! saved export file, which is handy for seeding a warehouse offline.

use sqlx::PgPool;
use std::path::Path;
use tracing::{info, warn};

use super::EtlError;
use crate::client::{MasterKind, TallyClient};
use crate::parsers::masters::{self, parse_ledger_masters};
use crate::parsers::opening_bills::parse_opening_bills;
use crate::repos::master_repo;

/// Where to read master exports from.
#[derive(Debug, Clone)]
pub enum MasterSource {
    Source,
    File(std::path::PathBuf),
}

/// Rows written per dimension.
#[derive(Debug, Default, Clone, Copy)]
pub struct MasterCounts {
    pub units: usize,
    pub stock_groups: usize,
    pub items: usize,
    pub ledger_groups: usize,
    pub ledgers_applied: usize,
    pub opening_bills: usize,
}

pub async fn sync_masters(
    pool: &PgPool,
    client: &TallyClient,
    source: MasterSource,
    dry_run: bool,
    preview: Option<usize>,
) -> Result<MasterCounts, EtlError> {
    let (inventory_xml, accounts_xml) = match &source {
        MasterSource::Source => {
            info!("fetching master exports from the source");
            let inventory = client.fetch_masters(MasterKind::AllMasters).await?;
            let accounts = client.fetch_masters(MasterKind::OpeningBills).await?;
            (inventory, accounts)
        }
        MasterSource::File(path) => {
            info!(path = %path.display(), "reading master export from file");
            let text = read_export(path)?;
            (text.clone(), text)
        }
    };

    let units = masters::parse_units(&inventory_xml)?;
    let stock_groups = masters::parse_stock_groups(&inventory_xml)?;
    let items = masters::parse_stock_items(&inventory_xml)?;
    let (ledger_groups, ledgers) = parse_ledger_masters(&accounts_xml)?;
    let opening_bills = parse_opening_bills(&accounts_xml)?;

    info!(
        units = units.len(),
        stock_groups = stock_groups.len(),
        items = items.len(),
        ledger_groups = ledger_groups.len(),
        ledgers = ledgers.len(),
        opening_bills = opening_bills.len(),
        "parsed master exports"
    );

    if let Some(n) = preview {
        for item in items.iter().take(n) {
            info!(
                "item: {}",
                serde_json::to_string(item).unwrap_or_default()
            );
        }
        for bill in opening_bills.iter().take(n) {
            info!(
                "opening bill: {}",
                serde_json::to_string(bill).unwrap_or_default()
            );
        }
    }

    if dry_run {
        warn!("dry run: masters parsed but not written");
        return Ok(MasterCounts::default());
    }

    let counts = MasterCounts {
        units: master_repo::upsert_units(pool, &units).await?,
        stock_groups: master_repo::upsert_stock_groups(pool, &stock_groups).await?,
        items: master_repo::upsert_items(pool, &items).await?,
        ledger_groups: master_repo::upsert_ledger_groups(pool, &ledger_groups).await?,
        ledgers_applied: master_repo::apply_ledger_groups(pool, &ledgers).await?,
        opening_bills: master_repo::upsert_opening_bills(pool, &opening_bills).await?,
    };

    info!(
        units = counts.units,
        stock_groups = counts.stock_groups,
        items = counts.items,
        ledger_groups = counts.ledger_groups,
        customers_grouped = counts.ledgers_applied,
        opening_bills = counts.opening_bills,
        "master sync complete"
    );

    Ok(counts)
}

fn read_export(path: &Path) -> Result<String, EtlError> {
    Ok(std::fs::read_to_string(path)?)
}
