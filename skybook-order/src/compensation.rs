//! Provisional seat reservations and their release path.

use skybook_core::SeatCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Seats taken from the cache counter but not yet confirmed by a durable commit.
///
/// Every exit from the booking path either calls [`SeatClaim::commit`] or releases the claim,
/// which puts the counter back to the value it held right before the decrement. An explicit
/// [`SeatClaim::compensate`] restores inline; a claim dropped unsettled (early return, panic,
/// a cancelled future) schedules the same restore on the current runtime.
#[must_use = "an unsettled claim restores the seat counter when dropped"]
pub struct SeatClaim {
    cache: Arc<dyn SeatCache>,
    flight_id: Uuid,
    seats: i32,
    before: i32,
    ttl: Duration,
    settled: bool,
}

impl std::fmt::Debug for SeatClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatClaim")
            .field("flight_id", &self.flight_id)
            .field("seats", &self.seats)
            .field("before", &self.before)
            .field("ttl", &self.ttl)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}

impl SeatClaim {
    pub(crate) fn new(cache: Arc<dyn SeatCache>, flight_id: Uuid, seats: i32, before: i32, ttl: Duration) -> Self {
        Self {
            cache,
            flight_id,
            seats,
            before,
            ttl,
            settled: false,
        }
    }

    pub fn flight_id(&self) -> Uuid {
        self.flight_id
    }

    pub fn seats(&self) -> i32 {
        self.seats
    }

    /// Counter value observed by the decrement that created this claim.
    pub fn before(&self) -> i32 {
        self.before
    }

    /// The durable commit succeeded; the cache decrement stands.
    pub fn commit(mut self) {
        self.settled = true;
    }

    /// Restore the counter now. Failures are logged, never returned.
    pub async fn compensate(mut self) {
        self.settled = true;
        restore(self.cache.as_ref(), self.flight_id, self.before, self.ttl).await;
    }
}

impl Drop for SeatClaim {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        warn!(
            flight_id = %self.flight_id,
            seats = self.seats,
            "Seat claim released without commit, restoring cache"
        );
        match Handle::try_current() {
            Ok(handle) => {
                let cache = self.cache.clone();
                let (flight_id, before, ttl) = (self.flight_id, self.before, self.ttl);
                handle.spawn(async move {
                    restore(cache.as_ref(), flight_id, before, ttl).await;
                });
            }
            Err(_) => error!(
                flight_id = %self.flight_id,
                before = self.before,
                "No runtime to restore seat cache; counter stays stale until TTL expiry or sync"
            ),
        }
    }
}

async fn restore(cache: &dyn SeatCache, flight_id: Uuid, before: i32, ttl: Duration) {
    match cache.set_seats(flight_id, before, ttl).await {
        Ok(()) => info!(%flight_id, seats = before, "Seat cache restored"),
        Err(e) => error!(%flight_id, seats = before, "Failed to restore seat cache: {}", e),
    }
}
