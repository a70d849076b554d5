use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::BookingResult;

/// Lifetime of a seat counter in the cache before warm-up has to re-seed it.
pub const SEAT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub fn seat_key(flight_id: Uuid) -> String {
    format!("flight:{}:available_seats", flight_id)
}

/// Result of the atomic check-and-decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Counter was decremented. `before` is the value observed by the same atomic step.
    Reserved { before: i32 },
    /// Counter was left untouched because it holds fewer than the requested seats.
    Insufficient { available: i32 },
    /// No counter exists for the flight.
    Missing,
}

/// Remaining-seat counters kept in front of the durable store.
///
/// Implementations must execute `try_reserve` as a single indivisible step with respect to
/// every other caller; no caller ever reads and then writes a counter itself.
#[async_trait]
pub trait SeatCache: Send + Sync {
    /// Subtract `seats` from the counter when it holds at least that many.
    async fn try_reserve(&self, flight_id: Uuid, seats: i32) -> BookingResult<ReserveOutcome>;

    /// Publish a counter only when none exists. Returns whether this call wrote it.
    async fn seed_if_absent(&self, flight_id: Uuid, seats: i32, ttl: Duration) -> BookingResult<bool>;

    /// Overwrite the counter unconditionally. Used for explicit seeding and compensation.
    async fn set_seats(&self, flight_id: Uuid, seats: i32, ttl: Duration) -> BookingResult<()>;

    async fn get_seats(&self, flight_id: Uuid) -> BookingResult<Option<i32>>;

    async fn remove(&self, flight_id: Uuid) -> BookingResult<()>;
}
