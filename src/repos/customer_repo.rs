//! Customer dimension writes.

use sqlx::{Postgres, Transaction};

use super::WarehouseError;

/// Customer upsert input. The id is the party ledger name; optional fields
/// arrive opportunistically from vouchers and master syncs.
#[derive(Debug, Clone)]
pub struct CustomerUpsert<'a> {
    pub customer_id: &'a str,
    pub name: &'a str,
    pub gstin: Option<&'a str>,
    pub pincode: Option<&'a str>,
    pub city: Option<&'a str>,
}

/// Insert or enrich a customer. New non-empty optional values override;
/// otherwise the existing values are kept.
pub async fn upsert_customer(
    tx: &mut Transaction<'_, Postgres>,
    customer: &CustomerUpsert<'_>,
) -> Result<(), WarehouseError> {
    sqlx::query(
        r#"
        INSERT INTO customer_dim (customer_id, name, gstin, pincode, city)
        VALUES ($1, $2, NULLIF($3, ''), NULLIF($4, ''), NULLIF($5, ''))
        ON CONFLICT (customer_id) DO UPDATE SET
            name = EXCLUDED.name,
            gstin = COALESCE(NULLIF(EXCLUDED.gstin, ''), customer_dim.gstin),
            pincode = COALESCE(NULLIF(EXCLUDED.pincode, ''), customer_dim.pincode),
            city = COALESCE(NULLIF(EXCLUDED.city, ''), customer_dim.city)
        "#,
    )
    .bind(customer.customer_id)
    .bind(customer.name)
    .bind(customer.gstin.unwrap_or(""))
    .bind(customer.pincode.unwrap_or(""))
    .bind(customer.city.unwrap_or(""))
    .execute(&mut **tx)
    .await?;

    Ok(())
}