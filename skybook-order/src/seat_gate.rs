use skybook_core::repository::FlightRepository;
use skybook_core::{BookingError, BookingResult, ReserveOutcome, SeatCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compensation::SeatClaim;

/// Warm-ups allowed for one reservation before a still-missing counter is treated as a
/// cache fault.
const MAX_WARM_UPS: usize = 2;

/// Fast-path admission: the atomic cache decrement, seeded from the durable store on a miss.
#[derive(Clone)]
pub struct SeatGate {
    cache: Arc<dyn SeatCache>,
    flights: Arc<dyn FlightRepository>,
    ttl: Duration,
}

impl SeatGate {
    pub fn new(cache: Arc<dyn SeatCache>, flights: Arc<dyn FlightRepository>, ttl: Duration) -> Self {
        Self { cache, flights, ttl }
    }

    pub fn cache(&self) -> &Arc<dyn SeatCache> {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take `seats` off the cached counter. The returned claim must be committed once the
    /// durable write succeeds; otherwise it restores the counter.
    pub async fn reserve(&self, flight_id: Uuid, seats: i32) -> BookingResult<SeatClaim> {
        let mut warm_ups = 0;
        loop {
            match self.cache.try_reserve(flight_id, seats).await? {
                ReserveOutcome::Reserved { before } => {
                    debug!(%flight_id, seats, before, "Seats reserved in cache");
                    return Ok(SeatClaim::new(self.cache.clone(), flight_id, seats, before, self.ttl));
                }
                ReserveOutcome::Insufficient { available } => {
                    debug!(%flight_id, seats, available, "Not enough seats in cache");
                    return Err(BookingError::NoAvailableSeats);
                }
                ReserveOutcome::Missing if warm_ups < MAX_WARM_UPS => {
                    self.warm_up(flight_id).await?;
                    warm_ups += 1;
                }
                ReserveOutcome::Missing => {
                    return Err(BookingError::TransportFailure(format!(
                        "seat counter for flight {} missing after warm-up",
                        flight_id
                    )));
                }
            }
        }
    }

    /// Seed the counter from the durable store unless another request already has.
    /// Returns whether this call wrote the seed.
    pub async fn warm_up(&self, flight_id: Uuid) -> BookingResult<bool> {
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound)?;

        let seats = flight.available_seats.max(0);
        let seeded = self.cache.seed_if_absent(flight_id, seats, self.ttl).await?;
        if seeded {
            info!(%flight_id, seats, "Seat cache warmed from database");
        } else {
            debug!(%flight_id, "Seat cache already seeded by a concurrent request");
        }
        Ok(seeded)
    }
}
