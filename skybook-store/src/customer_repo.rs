use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::repository::CustomerRepository;
use skybook_core::{BookingError, BookingResult, Customer, CustomerStatus, NewCustomer};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::map_db_error;

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = BookingError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            status: row.status.parse().map_err(BookingError::transport)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn create_customer(&self, customer: NewCustomer) -> BookingResult<Customer> {
        let customer = customer.into_customer();
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.status.as_str())
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(customer)
    }

    async fn get_customer(&self, id: Uuid) -> BookingResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, email, phone, status, created_at, updated_at FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Customer::try_from).transpose()
    }

    async fn set_customer_status(&self, id: Uuid, status: CustomerStatus) -> BookingResult<()> {
        let result = sqlx::query("UPDATE customers SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(BookingError::CustomerNotFound);
        }
        Ok(())
    }
}
