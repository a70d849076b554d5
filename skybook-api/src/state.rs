use chrono::{DateTime, Utc};
use skybook_core::repository::{CustomerRepository, FlightRepository, OrderRepository};
use skybook_core::SeatCache;
use skybook_order::{EngineSettings, ReservationEngine};
use skybook_store::app_config::BookingConfig;
use skybook_store::{InMemorySeatCache, InMemoryStore};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub flight_repo: Arc<dyn FlightRepository>,
    pub customer_repo: Arc<dyn CustomerRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    /// Deadline for each booking request, if any.
    pub booking_timeout: Option<Duration>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        cache: Arc<dyn SeatCache>,
        flight_repo: Arc<dyn FlightRepository>,
        customer_repo: Arc<dyn CustomerRepository>,
        order_repo: Arc<dyn OrderRepository>,
        booking: &BookingConfig,
    ) -> Self {
        let settings = EngineSettings {
            seat_cache_ttl: booking.seat_cache_ttl(),
            order_number_prefix: booking.order_number_prefix.clone(),
        };
        let engine = ReservationEngine::new(
            cache,
            flight_repo.clone(),
            customer_repo.clone(),
            order_repo.clone(),
            settings,
        );

        Self {
            engine: Arc::new(engine),
            flight_repo,
            customer_repo,
            order_repo,
            booking_timeout: booking.request_timeout(),
            started_at: Utc::now(),
        }
    }

    /// Everything held in process memory.
    pub fn in_memory(booking: &BookingConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(
            Arc::new(InMemorySeatCache::new()),
            store.clone(),
            store.clone(),
            store,
            booking,
        )
    }
}
