use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::repository::FlightRepository;
use skybook_core::search::{ListParams, Page, SortOrder};
use skybook_core::{BookingError, BookingResult, Flight, FlightStatus, NewFlight};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::database::map_db_error;

const FLIGHT_COLUMNS: &str = "id, flight_number, airline, departure_city, arrival_city, departure_time, \
     arrival_time, aircraft, status, total_seats, available_seats, base_price, created_at, updated_at";

/// Columns accepted as `LIKE` filters.
pub const FLIGHT_FILTER_COLUMNS: [&str; 4] = ["flight_number", "airline", "departure_city", "arrival_city"];

pub const FLIGHT_SORT_COLUMNS: [&str; 6] = [
    "flight_number",
    "airline",
    "departure_time",
    "arrival_time",
    "base_price",
    "available_seats",
];

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline: String,
    departure_city: String,
    arrival_city: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    aircraft: String,
    status: String,
    total_seats: i32,
    available_seats: i32,
    base_price: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = BookingError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            airline: row.airline,
            departure_city: row.departure_city,
            arrival_city: row.arrival_city,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            aircraft: row.aircraft,
            status: row.status.parse().map_err(BookingError::transport)?,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            base_price: row.base_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PostgresFlightRepository {
    pool: PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_flight_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &ListParams, departure_from: DateTime<Utc>) {
    qb.push(" WHERE departure_time >= ");
    qb.push_bind(departure_from);
    for column in FLIGHT_FILTER_COLUMNS {
        if let Some(pattern) = params.filter(column) {
            qb.push(format!(" AND {} LIKE ", column));
            qb.push_bind(pattern.to_string());
        }
    }
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn create_flight(&self, flight: NewFlight) -> BookingResult<Flight> {
        flight.validate()?;
        let flight = flight.into_flight();

        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, airline, departure_city, arrival_city, departure_time,
                                 arrival_time, aircraft, status, total_seats, available_seats, base_price,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.airline)
        .bind(&flight.departure_city)
        .bind(&flight.arrival_city)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(&flight.aircraft)
        .bind(flight.status.as_str())
        .bind(flight.total_seats)
        .bind(flight.available_seats)
        .bind(flight.base_price)
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        info!("Flight scheduled: {} ({})", flight.flight_number, flight.id);
        Ok(flight)
    }

    async fn get_flight(&self, id: Uuid) -> BookingResult<Option<Flight>> {
        let row: Option<FlightRow> = sqlx::query_as(&format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(Flight::try_from).transpose()
    }

    async fn list_flights(
        &self,
        params: &ListParams,
        departure_from: DateTime<Utc>,
    ) -> BookingResult<Page<Flight>> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM flights");
        push_flight_filters(&mut count_query, params, departure_from);
        let (total_count,): (i64,) = count_query
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut query = QueryBuilder::new(format!("SELECT {} FROM flights", FLIGHT_COLUMNS));
        push_flight_filters(&mut query, params, departure_from);
        let column = params.sort_column(&FLIGHT_SORT_COLUMNS).unwrap_or("departure_time");
        let direction = match params.sort_order() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        query.push(format!(" ORDER BY {} {}, id", column, direction));
        query.push(" LIMIT ");
        query.push_bind(i64::from(params.page_size()));
        query.push(" OFFSET ");
        query.push_bind(params.offset() as i64);

        let rows: Vec<FlightRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(Page {
            data: rows.into_iter().map(Flight::try_from).collect::<Result<_, _>>()?,
            total_count,
            page: params.page(),
            page_size: params.page_size(),
        })
    }

    async fn set_flight_status(&self, id: Uuid, status: FlightStatus) -> BookingResult<()> {
        let result = sqlx::query("UPDATE flights SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(BookingError::FlightNotFound);
        }
        info!("Flight {} is now {}", id, status);
        Ok(())
    }
}
