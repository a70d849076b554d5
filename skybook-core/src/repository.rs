use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Customer, CustomerStatus, Flight, FlightStatus, NewCustomer, NewFlight, Order, OrderDraft};
use crate::search::{ListParams, Page};
use crate::BookingResult;

/// Repository trait for flight data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn create_flight(&self, flight: NewFlight) -> BookingResult<Flight>;

    async fn get_flight(&self, id: Uuid) -> BookingResult<Option<Flight>>;

    /// Flights departing at or after `departure_from`, filtered and paged by `params`.
    async fn list_flights(
        &self,
        params: &ListParams,
        departure_from: DateTime<Utc>,
    ) -> BookingResult<Page<Flight>>;

    /// Operational status change (delay, cancellation, departure).
    async fn set_flight_status(&self, id: Uuid, status: FlightStatus) -> BookingResult<()>;
}

/// Repository trait for customer data access
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create_customer(&self, customer: NewCustomer) -> BookingResult<Customer>;

    async fn get_customer(&self, id: Uuid) -> BookingResult<Option<Customer>>;

    async fn set_customer_status(&self, id: Uuid, status: CustomerStatus) -> BookingResult<()>;
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create the order and take its seats off the flight in one durable transaction.
    ///
    /// The flight row is locked exclusively for the duration; seat availability, flight state
    /// and customer state are re-checked under that lock. Nothing is written unless every
    /// step succeeds.
    async fn commit_order(&self, draft: OrderDraft) -> BookingResult<Order>;

    async fn get_order(&self, id: Uuid) -> BookingResult<Option<Order>>;

    async fn list_orders(&self, params: &ListParams) -> BookingResult<Page<Order>>;
}
