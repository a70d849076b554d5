pub mod cache;
pub mod models;
pub mod repository;
pub mod search;

pub use cache::{ReserveOutcome, SeatCache};
pub use models::{
    CreateOrderRequest, Customer, CustomerStatus, Flight, FlightStatus, NewCustomer, NewFlight,
    Order, OrderDraft, OrderStatus,
};
pub use repository::{CustomerRepository, FlightRepository, OrderRepository};
pub use search::{ListParams, Page, SortOrder};

/// Failure kinds surfaced by the booking path. The API layer maps each one to a response;
/// nothing here is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("flight not found")]
    FlightNotFound,
    #[error("customer not found")]
    CustomerNotFound,
    #[error("customer is not active")]
    CustomerInactive,
    #[error("no available seats")]
    NoAvailableSeats,
    #[error("flight is not in bookable state: {0}")]
    InvalidFlightState(FlightStatus),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("order creation failed: {0}")]
    OrderCreationFailed(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl BookingError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        BookingError::TransportFailure(err.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
