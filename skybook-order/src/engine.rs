use chrono::Utc;
use serde::Serialize;
use skybook_core::cache::SEAT_CACHE_TTL;
use skybook_core::repository::{CustomerRepository, FlightRepository, OrderRepository};
use skybook_core::{BookingError, BookingResult, CreateOrderRequest, Flight, Order, OrderDraft, SeatCache};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::order_number::{generate_order_number, DEFAULT_ORDER_PREFIX};
use crate::seat_gate::SeatGate;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub seat_cache_ttl: Duration,
    pub order_number_prefix: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seat_cache_ttl: SEAT_CACHE_TTL,
            order_number_prefix: DEFAULT_ORDER_PREFIX.to_string(),
        }
    }
}

/// Cached and durable seat counters for one flight.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatSnapshot {
    pub flight_id: Uuid,
    pub cached_seats: Option<i32>,
    pub available_seats: i32,
    pub total_seats: i32,
}

/// Books seats against the cache first and confirms them in the durable store.
///
/// A booking runs validate → cache decrement (with warm-up) → locked durable write. Anything
/// that fails after the decrement, a passed deadline included, hands the seats back to the
/// cache before the error is returned.
pub struct ReservationEngine {
    gate: SeatGate,
    flights: Arc<dyn FlightRepository>,
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    settings: EngineSettings,
}

impl ReservationEngine {
    pub fn new(
        cache: Arc<dyn SeatCache>,
        flights: Arc<dyn FlightRepository>,
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            gate: SeatGate::new(cache, flights.clone(), settings.seat_cache_ttl),
            flights,
            customers,
            orders,
            settings,
        }
    }

    pub async fn create_order(&self, req: CreateOrderRequest) -> BookingResult<Order> {
        self.book(req, None).await
    }

    /// [`create_order`](Self::create_order) bounded by `deadline`. The deadline applies to
    /// each stage in turn; when it passes during the durable write, the write is dropped
    /// (its open transaction rolls back) and the cache is restored before the error returns.
    pub async fn create_order_with_deadline(
        &self,
        req: CreateOrderRequest,
        deadline: Instant,
    ) -> BookingResult<Order> {
        let result = self.book(req, Some(deadline)).await;
        if matches!(result, Err(BookingError::DeadlineExceeded)) {
            warn!(flight_id = %req.flight_id, seats = req.ticket_amount, "Booking deadline exceeded");
        }
        result
    }

    async fn book(&self, req: CreateOrderRequest, deadline: Option<Instant>) -> BookingResult<Order> {
        if req.ticket_amount <= 0 {
            return Err(BookingError::InvalidRequest("ticket_amount must be positive".to_string()));
        }
        within(deadline, self.validate(&req)).await?;

        let claim = within(deadline, self.gate.reserve(req.flight_id, req.ticket_amount)).await?;

        let draft = OrderDraft {
            flight_id: req.flight_id,
            customer_id: req.customer_id,
            ticket_amount: req.ticket_amount,
            order_number: generate_order_number(&self.settings.order_number_prefix),
            booking_time: Utc::now(),
        };

        match within(deadline, self.orders.commit_order(draft)).await {
            Ok(order) => {
                claim.commit();
                info!(
                    order_number = %order.order_number,
                    flight_id = %order.flight_id,
                    seats = order.ticket_amount,
                    "Booking confirmed"
                );
                Ok(order)
            }
            Err(e) => {
                warn!(
                    flight_id = %claim.flight_id(),
                    seats = claim.seats(),
                    before = claim.before(),
                    "Durable write failed, compensating seat cache: {}",
                    e
                );
                claim.compensate().await;
                Err(e)
            }
        }
    }

    /// Customer must be ACTIVE and the flight bookable before the cache is touched.
    async fn validate(&self, req: &CreateOrderRequest) -> BookingResult<()> {
        let customer = self
            .customers
            .get_customer(req.customer_id)
            .await?
            .ok_or(BookingError::CustomerNotFound)?;
        if !customer.is_active() {
            return Err(BookingError::CustomerInactive);
        }

        let flight = self.load_flight(req.flight_id).await?;
        if !flight.status.is_bookable() {
            return Err(BookingError::InvalidFlightState(flight.status));
        }
        Ok(())
    }

    async fn load_flight(&self, flight_id: Uuid) -> BookingResult<Flight> {
        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound)
    }

    /// Overwrite the cached counter for a flight.
    pub async fn initialize_flight_seats(&self, flight_id: Uuid, seats: i32) -> BookingResult<()> {
        let flight = self.load_flight(flight_id).await?;
        if seats < 0 || seats > flight.total_seats {
            return Err(BookingError::InvalidRequest(format!(
                "available_seats must be between 0 and {}",
                flight.total_seats
            )));
        }

        self.gate.cache().set_seats(flight_id, seats, self.gate.ttl()).await?;
        info!(%flight_id, seats, "Seat cache initialized");
        Ok(())
    }

    /// Reset the cached counter to the durable value. Returns the seeded count.
    pub async fn sync_flight_seats(&self, flight_id: Uuid) -> BookingResult<i32> {
        let flight = self.load_flight(flight_id).await?;
        self.gate
            .cache()
            .set_seats(flight_id, flight.available_seats, self.gate.ttl())
            .await?;
        info!(%flight_id, seats = flight.available_seats, "Seat cache synced from database");
        Ok(flight.available_seats)
    }

    pub async fn seat_snapshot(&self, flight_id: Uuid) -> BookingResult<SeatSnapshot> {
        let flight = self.load_flight(flight_id).await?;
        let cached_seats = self.gate.cache().get_seats(flight_id).await?;
        Ok(SeatSnapshot {
            flight_id,
            cached_seats,
            available_seats: flight.available_seats,
            total_seats: flight.total_seats,
        })
    }
}

/// Run one booking stage, giving up with `DeadlineExceeded` once `deadline` passes. A stage
/// is never started after the deadline.
async fn within<F, T>(deadline: Option<Instant>, stage: F) -> BookingResult<T>
where
    F: Future<Output = BookingResult<T>>,
{
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(BookingError::DeadlineExceeded),
        Some(deadline) => tokio::time::timeout_at(deadline, stage)
            .await
            .map_err(|_| BookingError::DeadlineExceeded)?,
        None => stage.await,
    }
}
