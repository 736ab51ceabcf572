//! Master dimension writes: units, stock groups, items, ledger groups,
//! opening bills, plus customer enrichment from ledger masters.
//!
//! Upserts key on the source GUID when one exists, else on the unique name.
//! Bulk loads run in chunks of [`CHUNK_SIZE`] rows per transaction to stay
//! inside statement limits on large companies.

use sqlx::{PgPool, Postgres, Transaction};

use super::WarehouseError;
use crate::parsers::masters::{GroupRecord, ItemRecord, LedgerRecord, UnitRecord};
use crate::parsers::opening_bills::OpeningBillRecord;

pub const CHUNK_SIZE: usize = 500;

pub async fn upsert_units(pool: &PgPool, units: &[UnitRecord]) -> Result<usize, WarehouseError> {
    let mut written = 0;
    for chunk in units.chunks(CHUNK_SIZE) {
        let mut tx = pool.begin().await?;
        for unit in chunk {
            sqlx::query(
                r#"
                INSERT INTO uom_dim (name, guid, original_name, gst_rep_uom, is_simple, alter_id, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                ON CONFLICT (name) DO UPDATE SET
                    guid = COALESCE(EXCLUDED.guid, uom_dim.guid),
                    original_name = COALESCE(EXCLUDED.original_name, uom_dim.original_name),
                    gst_rep_uom = COALESCE(EXCLUDED.gst_rep_uom, uom_dim.gst_rep_uom),
                    is_simple = EXCLUDED.is_simple,
                    alter_id = COALESCE(EXCLUDED.alter_id, uom_dim.alter_id),
                    updated_at = NOW()
                "#,
            )
            .bind(&unit.name)
            .bind(&unit.guid)
            .bind(&unit.original_name)
            .bind(&unit.gst_rep_uom)
            .bind(unit.is_simple)
            .bind(unit.alter_id)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }
        tx.commit().await?;
    }
    Ok(written)
}

async fn upsert_group(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    group: &GroupRecord,
) -> Result<(), WarehouseError> {
    // Table name comes from a fixed set below, never from input.
    let by_guid = format!(
        r#"
        INSERT INTO {table} (guid, name, parent_name, alter_id, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (guid) DO UPDATE SET
            name = EXCLUDED.name,
            parent_name = EXCLUDED.parent_name,
            alter_id = COALESCE(EXCLUDED.alter_id, {table}.alter_id),
            updated_at = NOW()
        "#
    );
    let by_name = format!(
        r#"
        INSERT INTO {table} (guid, name, parent_name, alter_id, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (name) DO UPDATE SET
            guid = COALESCE(EXCLUDED.guid, {table}.guid),
            parent_name = EXCLUDED.parent_name,
            alter_id = COALESCE(EXCLUDED.alter_id, {table}.alter_id),
            updated_at = NOW()
        "#
    );

    let sql = if group.guid.is_some() { by_guid } else { by_name };
    sqlx::query(&sql)
        .bind(&group.guid)
        .bind(&group.name)
        .bind(&group.parent_name)
        .bind(group.alter_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

pub async fn upsert_stock_groups(
    pool: &PgPool,
    groups: &[GroupRecord],
) -> Result<usize, WarehouseError> {
    upsert_groups(pool, "stock_group_dim", groups).await
}

pub async fn upsert_ledger_groups(
    pool: &PgPool,
    groups: &[GroupRecord],
) -> Result<usize, WarehouseError> {
    upsert_groups(pool, "ledger_group_dim", groups).await
}

async fn upsert_groups(
    pool: &PgPool,
    table: &str,
    groups: &[GroupRecord],
) -> Result<usize, WarehouseError> {
    let mut written = 0;
    for chunk in groups.chunks(CHUNK_SIZE) {
        let mut tx = pool.begin().await?;
        for group in chunk {
            upsert_group(&mut tx, table, group).await?;
            written += 1;
        }
        tx.commit().await?;
    }
    Ok(written)
}

pub async fn upsert_items(pool: &PgPool, items: &[ItemRecord]) -> Result<usize, WarehouseError> {
    let mut written = 0;
    for chunk in items.chunks(CHUNK_SIZE) {
        let mut tx = pool.begin().await?;
        for item in chunk {
            let sql = if item.guid.is_some() {
                r#"
                INSERT INTO item_dim (guid, name, parent_name, base_units, hsn_code, alter_id, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                ON CONFLICT (guid) DO UPDATE SET
                    name = EXCLUDED.name,
                    parent_name = EXCLUDED.parent_name,
                    base_units = COALESCE(EXCLUDED.base_units, item_dim.base_units),
                    hsn_code = COALESCE(EXCLUDED.hsn_code, item_dim.hsn_code),
                    alter_id = COALESCE(EXCLUDED.alter_id, item_dim.alter_id),
                    updated_at = NOW()
                "#
            } else {
                r#"
                INSERT INTO item_dim (guid, name, parent_name, base_units, hsn_code, alter_id, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                ON CONFLICT (name) DO UPDATE SET
                    guid = COALESCE(EXCLUDED.guid, item_dim.guid),
                    parent_name = EXCLUDED.parent_name,
                    base_units = COALESCE(EXCLUDED.base_units, item_dim.base_units),
                    hsn_code = COALESCE(EXCLUDED.hsn_code, item_dim.hsn_code),
                    alter_id = COALESCE(EXCLUDED.alter_id, item_dim.alter_id),
                    updated_at = NOW()
                "#
            };
            sqlx::query(sql)
                .bind(&item.guid)
                .bind(&item.name)
                .bind(&item.parent_name)
                .bind(&item.base_units)
                .bind(&item.hsn_code)
                .bind(item.alter_id)
                .execute(&mut *tx)
                .await?;
            written += 1;
        }
        tx.commit().await?;
    }
    Ok(written)
}

/// Stamp ledger parent groups onto existing customers. Ledgers that are not
/// customers (tax heads, banks) simply update nothing.
pub async fn apply_ledger_groups(
    pool: &PgPool,
    ledgers: &[LedgerRecord],
) -> Result<usize, WarehouseError> {
    let mut updated = 0;
    for chunk in ledgers.chunks(CHUNK_SIZE) {
        let mut tx = pool.begin().await?;
        for ledger in chunk {
            let Some(parent) = ledger.parent_name.as_deref() else {
                continue;
            };
            let result = sqlx::query(
                "UPDATE customer_dim SET ledger_group_name = $2 WHERE customer_id = $1",
            )
            .bind(&ledger.name)
            .bind(parent)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected() as usize;
        }
        tx.commit().await?;
    }
    Ok(updated)
}

/// Overwrite the opening bill-wise state. A reloaded ledgers export must
/// take effect, hence DO UPDATE rather than DO NOTHING.
pub async fn upsert_opening_bills(
    pool: &PgPool,
    bills: &[OpeningBillRecord],
) -> Result<usize, WarehouseError> {
    let mut written = 0;
    for chunk in bills.chunks(CHUNK_SIZE) {
        let mut tx = pool.begin().await?;
        for bill in chunk {
            sqlx::query(
                r#"
                INSERT INTO opening_bill (ledger, ref_name, bill_date, opening_balance, credit_period_days, is_advance)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (ledger, ref_name) DO UPDATE SET
                    bill_date = EXCLUDED.bill_date,
                    opening_balance = EXCLUDED.opening_balance,
                    credit_period_days = EXCLUDED.credit_period_days,
                    is_advance = EXCLUDED.is_advance
                "#,
            )
            .bind(&bill.ledger)
            .bind(&bill.ref_name)
            .bind(bill.bill_date)
            .bind(bill.opening_balance)
            .bind(bill.credit_period_days)
            .bind(bill.is_advance)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }
        tx.commit().await?;
    }
    Ok(written)
}
