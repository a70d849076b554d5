use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use skybook_core::{BookingError, Flight, FlightStatus, ListParams, NewFlight, Page, SortOrder};
use skybook_order::SeatSnapshot;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ListFlightsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    /// Earliest departure day (UTC). Defaults to today.
    pub departure_date: Option<NaiveDate>,
}

impl ListFlightsQuery {
    fn into_params(self) -> (ListParams, DateTime<Utc>) {
        let day = self.departure_date.unwrap_or_else(|| Utc::now().date_naive());
        let departure_from = day.and_time(NaiveTime::default()).and_utc();

        let mut params = ListParams {
            page: self.page,
            page_size: self.page_size,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            ..Default::default()
        };
        let filters = [
            ("flight_number", self.flight_number),
            ("airline", self.airline),
            ("departure_city", self.departure_city),
            ("arrival_city", self.arrival_city),
        ];
        for (column, pattern) in filters {
            if let Some(pattern) = pattern {
                params.filters.insert(column.to_string(), pattern);
            }
        }
        (params, departure_from)
    }
}

#[derive(Debug, Deserialize)]
pub struct SeedSeatsRequest {
    pub available_seats: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFlightStatusRequest {
    pub status: FlightStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", get(list_flights).post(create_flight))
        .route("/v1/flights/{id}", get(get_flight))
        .route("/v1/flights/{id}/status", put(update_flight_status))
        .route("/v1/flights/{id}/seats", get(get_seats).put(seed_seats))
        .route("/v1/flights/{id}/seats/sync", post(sync_seats))
}

/// GET /v1/flights
async fn list_flights(
    State(state): State<AppState>,
    Query(query): Query<ListFlightsQuery>,
) -> Result<Json<Page<Flight>>, AppError> {
    let (params, departure_from) = query.into_params();
    let page = state.flight_repo.list_flights(&params, departure_from).await?;
    Ok(Json(page))
}

/// POST /v1/flights
async fn create_flight(
    State(state): State<AppState>,
    Json(flight): Json<NewFlight>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    let flight = state.flight_repo.create_flight(flight).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

/// GET /v1/flights/{id}
async fn get_flight(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Flight>, AppError> {
    let flight = state
        .flight_repo
        .get_flight(id)
        .await?
        .ok_or(BookingError::FlightNotFound)?;
    Ok(Json(flight))
}

/// PUT /v1/flights/{id}/status
async fn update_flight_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFlightStatusRequest>,
) -> Result<StatusCode, AppError> {
    state.flight_repo.set_flight_status(id, req.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/flights/{id}/seats
/// Cached and durable counters side by side.
async fn get_seats(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SeatSnapshot>, AppError> {
    Ok(Json(state.engine.seat_snapshot(id).await?))
}

/// PUT /v1/flights/{id}/seats
async fn seed_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SeedSeatsRequest>,
) -> Result<Json<SeatSnapshot>, AppError> {
    state.engine.initialize_flight_seats(id, req.available_seats).await?;
    Ok(Json(state.engine.seat_snapshot(id).await?))
}

/// POST /v1/flights/{id}/seats/sync
async fn sync_seats(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SeatSnapshot>, AppError> {
    state.engine.sync_flight_seats(id).await?;
    Ok(Json(state.engine.seat_snapshot(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_today() {
        let (params, from) = ListFlightsQuery::default().into_params();
        assert_eq!(from.date_naive(), Utc::now().date_naive());
        assert_eq!(from.time(), NaiveTime::default());
        assert!(params.filters.is_empty());
        assert_eq!(params.page_size(), 20);
    }

    #[test]
    fn test_query_collects_filters() {
        let query = ListFlightsQuery {
            airline: Some("EVA%".to_string()),
            arrival_city: Some("Tokyo".to_string()),
            departure_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            ..Default::default()
        };
        let (params, from) = query.into_params();
        assert_eq!(params.filter("airline"), Some("EVA%"));
        assert_eq!(params.filter("arrival_city"), Some("Tokyo"));
        assert_eq!(params.filter("flight_number"), None);
        assert_eq!(from.to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }
}
