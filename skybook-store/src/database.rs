use skybook_core::BookingError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Constraint guarding order-number uniqueness.
pub(crate) const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// Map a driver error onto the booking taxonomy. Unique violations on `orders.order_number`
/// become `OrderCreationFailed`; other unique violations are caller mistakes; everything else
/// is transport.
pub(crate) fn map_db_error(err: sqlx::Error) -> BookingError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(ORDER_NUMBER_CONSTRAINT) => {
                    BookingError::OrderCreationFailed("duplicate order number".to_string())
                }
                Some(constraint) => BookingError::InvalidRequest(format!("violates {}", constraint)),
                None => BookingError::InvalidRequest(db_err.message().to_string()),
            };
        }
    }
    BookingError::transport(err)
}
