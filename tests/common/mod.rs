//! Shared setup for warehouse integration tests.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Connect to the test warehouse and apply migrations.
/// Uses a small pool with short timeouts so leaked connections fail fast.
pub async fn setup_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for warehouse integration tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Unique party name so tests never collide on the customer dimension.
pub fn unique_party() -> String {
    format!("Test Party {}", Uuid::new_v4())
}

/// Unique voucher GUID.
pub fn unique_guid() -> String {
    format!("guid-{}", Uuid::new_v4())
}
