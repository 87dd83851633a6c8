use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[cfg(test)]
pub mod memory;
pub mod store;

pub use store::{DayStore, PgDayStore};

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let db = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations applied");

    Ok(db)
}
