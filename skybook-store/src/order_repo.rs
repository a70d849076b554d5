use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::repository::OrderRepository;
use skybook_core::search::{ListParams, Page, SortOrder};
use skybook_core::{BookingError, BookingResult, Flight, Order, OrderDraft};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::map_db_error;
use crate::flight_repo::FlightRow;

const ORDER_COLUMNS: &str = "id, flight_id, customer_id, status, ticket_amount, total_amount, order_number, \
     booking_time, created_at, updated_at";

/// Columns accepted as `LIKE` filters.
pub const ORDER_LIKE_FILTERS: [&str; 2] = ["status", "order_number"];
/// Columns accepted as exact-match id filters.
pub const ORDER_ID_FILTERS: [&str; 2] = ["customer_id", "flight_id"];

pub const ORDER_SORT_COLUMNS: [&str; 4] = ["booking_time", "order_number", "total_amount", "status"];

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    flight_id: Uuid,
    customer_id: Uuid,
    status: String,
    ticket_amount: i32,
    total_amount: i64,
    order_number: String,
    booking_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = BookingError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            flight_id: row.flight_id,
            customer_id: row.customer_id,
            status: row.status.parse().map_err(BookingError::transport)?,
            ticket_amount: row.ticket_amount,
            total_amount: row.total_amount,
            order_number: row.order_number,
            booking_time: row.booking_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every statement of the booking transaction. The caller commits on `Ok` and rolls back
    /// on `Err`.
    async fn write_order(tx: &mut Transaction<'_, Postgres>, draft: OrderDraft) -> BookingResult<Order> {
        // Exclusive row lock: concurrent writers for this flight queue here.
        let row: Option<FlightRow> = sqlx::query_as(
            r#"
            SELECT id, flight_number, airline, departure_city, arrival_city, departure_time, arrival_time,
                   aircraft, status, total_seats, available_seats, base_price, created_at, updated_at
            FROM flights
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(draft.flight_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;

        let flight = Flight::try_from(row.ok_or(BookingError::FlightNotFound)?)?;
        debug!(flight_id = %flight.id, available = flight.available_seats, "flight row locked");

        if !flight.status.is_bookable() {
            return Err(BookingError::InvalidFlightState(flight.status));
        }

        // Shared lock keeps the customer from being deactivated until we commit.
        let customer_status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM customers WHERE id = $1 FOR SHARE")
                .bind(draft.customer_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_db_error)?;
        match customer_status {
            None => return Err(BookingError::CustomerNotFound),
            Some((status,)) if status != "ACTIVE" => return Err(BookingError::CustomerInactive),
            Some(_) => {}
        }

        if flight.available_seats < draft.ticket_amount {
            return Err(BookingError::NoAvailableSeats);
        }

        let order = draft.into_order(flight.base_price);

        sqlx::query(
            r#"
            INSERT INTO orders (id, flight_id, customer_id, status, ticket_amount, total_amount, order_number,
                                booking_time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.flight_id)
        .bind(order.customer_id)
        .bind(order.status.as_str())
        .bind(order.ticket_amount)
        .bind(order.total_amount)
        .bind(&order.order_number)
        .bind(order.booking_time)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            "UPDATE flights SET available_seats = available_seats - $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(order.ticket_amount)
        .bind(order.flight_id)
        .execute(&mut **tx)
        .await
        .map_err(map_db_error)?;

        Ok(order)
    }
}

fn push_order_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &ListParams) -> BookingResult<()> {
    qb.push(" WHERE TRUE");
    for column in ORDER_LIKE_FILTERS {
        if let Some(pattern) = params.filter(column) {
            qb.push(format!(" AND {} LIKE ", column));
            qb.push_bind(pattern.to_string());
        }
    }
    for column in ORDER_ID_FILTERS {
        if let Some(value) = params.filter(column) {
            let id = Uuid::parse_str(value)
                .map_err(|_| BookingError::InvalidRequest(format!("{} must be a UUID", column)))?;
            qb.push(format!(" AND {} = ", column));
            qb.push_bind(id);
        }
    }
    Ok(())
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn commit_order(&self, draft: OrderDraft) -> BookingResult<Order> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        match Self::write_order(&mut tx, draft).await {
            Ok(order) => {
                tx.commit().await.map_err(map_db_error)?;
                info!(
                    order_number = %order.order_number,
                    flight_id = %order.flight_id,
                    seats = order.ticket_amount,
                    "Order committed"
                );
                Ok(order)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed booking also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn get_order(&self, id: Uuid) -> BookingResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self, params: &ListParams) -> BookingResult<Page<Order>> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count_query, params)?;
        let (total_count,): (i64,) = count_query
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut query = QueryBuilder::new(format!("SELECT {} FROM orders", ORDER_COLUMNS));
        push_order_filters(&mut query, params)?;
        let column = params.sort_column(&ORDER_SORT_COLUMNS).unwrap_or("booking_time");
        let direction = match params.sort_order() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        query.push(format!(" ORDER BY {} {}, id", column, direction));
        query.push(" LIMIT ");
        query.push_bind(i64::from(params.page_size()));
        query.push(" OFFSET ");
        query.push_bind(params.offset() as i64);

        let rows: Vec<OrderRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(Page {
            data: rows.into_iter().map(Order::try_from).collect::<Result<_, _>>()?,
            total_count,
            page: params.page(),
            page_size: params.page_size(),
        })
    }
}
