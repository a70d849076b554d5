//! Process-local implementations of the cache and durable store.
//!
//! The seat cache evaluates check-and-decrement under one mutex, which gives it the same
//! all-or-nothing behaviour as the Redis script. The store gives every flight its own async
//! mutex, standing in for the `SELECT ... FOR UPDATE` row lock: writers for the same flight
//! queue, writers for different flights never meet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::repository::{CustomerRepository, FlightRepository, OrderRepository};
use skybook_core::search::{like_matches, ListParams, Page, SortOrder};
use skybook_core::{
    BookingError, BookingResult, Customer, CustomerStatus, Flight, FlightStatus, NewCustomer, NewFlight,
    Order, OrderDraft, ReserveOutcome, SeatCache,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::flight_repo::{FLIGHT_FILTER_COLUMNS, FLIGHT_SORT_COLUMNS};
use crate::order_repo::{ORDER_ID_FILTERS, ORDER_LIKE_FILTERS, ORDER_SORT_COLUMNS};

fn poisoned<T>(_: T) -> BookingError {
    BookingError::TransportFailure("in-memory store lock poisoned".to_string())
}

// ============================================================================
// Seat cache
// ============================================================================

struct CacheEntry {
    seats: i32,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemorySeatCache {
    entries: Mutex<HashMap<Uuid, CacheEntry>>,
    offline: AtomicBool,
}

impl InMemorySeatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the cache server becoming unreachable (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn entries(&self) -> BookingResult<MutexGuard<'_, HashMap<Uuid, CacheEntry>>> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(BookingError::TransportFailure("seat cache unreachable".to_string()));
        }
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(entries)
    }
}

#[async_trait]
impl SeatCache for InMemorySeatCache {
    async fn try_reserve(&self, flight_id: Uuid, seats: i32) -> BookingResult<ReserveOutcome> {
        let mut entries = self.entries()?;
        let outcome = match entries.get_mut(&flight_id) {
            None => ReserveOutcome::Missing,
            Some(entry) if entry.seats < seats => ReserveOutcome::Insufficient { available: entry.seats },
            Some(entry) => {
                let before = entry.seats;
                entry.seats -= seats;
                ReserveOutcome::Reserved { before }
            }
        };
        Ok(outcome)
    }

    async fn seed_if_absent(&self, flight_id: Uuid, seats: i32, ttl: Duration) -> BookingResult<bool> {
        let mut entries = self.entries()?;
        if entries.contains_key(&flight_id) {
            return Ok(false);
        }
        entries.insert(flight_id, CacheEntry { seats, expires_at: Instant::now() + ttl });
        Ok(true)
    }

    async fn set_seats(&self, flight_id: Uuid, seats: i32, ttl: Duration) -> BookingResult<()> {
        self.entries()?
            .insert(flight_id, CacheEntry { seats, expires_at: Instant::now() + ttl });
        Ok(())
    }

    async fn get_seats(&self, flight_id: Uuid) -> BookingResult<Option<i32>> {
        Ok(self.entries()?.get(&flight_id).map(|entry| entry.seats))
    }

    async fn remove(&self, flight_id: Uuid) -> BookingResult<()> {
        self.entries()?.remove(&flight_id);
        Ok(())
    }
}

// ============================================================================
// Durable store
// ============================================================================

type FlightRow = Arc<tokio::sync::Mutex<Flight>>;

struct FlightSlot {
    flight_number: String,
    row: FlightRow,
}

#[derive(Default)]
pub struct InMemoryStore {
    flights: RwLock<HashMap<Uuid, FlightSlot>>,
    customers: RwLock<HashMap<Uuid, Customer>>,
    orders: Mutex<Vec<Order>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn flight_row(&self, id: Uuid) -> BookingResult<Option<FlightRow>> {
        Ok(self.flights.read().map_err(poisoned)?.get(&id).map(|slot| slot.row.clone()))
    }

    fn flight_rows(&self) -> BookingResult<Vec<FlightRow>> {
        Ok(self.flights.read().map_err(poisoned)?.values().map(|slot| slot.row.clone()).collect())
    }

    fn customer_status(&self, id: Uuid) -> BookingResult<Option<CustomerStatus>> {
        Ok(self.customers.read().map_err(poisoned)?.get(&id).map(|c| c.status))
    }
}

fn compare_flights(a: &Flight, b: &Flight, column: &str) -> Ordering {
    match column {
        "flight_number" => a.flight_number.cmp(&b.flight_number),
        "airline" => a.airline.cmp(&b.airline),
        "arrival_time" => a.arrival_time.cmp(&b.arrival_time),
        "base_price" => a.base_price.cmp(&b.base_price),
        "available_seats" => a.available_seats.cmp(&b.available_seats),
        _ => a.departure_time.cmp(&b.departure_time),
    }
}

fn flight_field<'a>(flight: &'a Flight, column: &str) -> &'a str {
    match column {
        "flight_number" => &flight.flight_number,
        "airline" => &flight.airline,
        "departure_city" => &flight.departure_city,
        _ => &flight.arrival_city,
    }
}

fn compare_orders(a: &Order, b: &Order, column: &str) -> Ordering {
    match column {
        "order_number" => a.order_number.cmp(&b.order_number),
        "total_amount" => a.total_amount.cmp(&b.total_amount),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        _ => a.booking_time.cmp(&b.booking_time),
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn create_flight(&self, flight: NewFlight) -> BookingResult<Flight> {
        flight.validate()?;
        let flight = flight.into_flight();

        let mut flights = self.flights.write().map_err(poisoned)?;
        if flights.values().any(|slot| slot.flight_number == flight.flight_number) {
            return Err(BookingError::InvalidRequest("violates flights_flight_number_key".to_string()));
        }
        flights.insert(
            flight.id,
            FlightSlot {
                flight_number: flight.flight_number.clone(),
                row: Arc::new(tokio::sync::Mutex::new(flight.clone())),
            },
        );
        info!("Flight scheduled: {} ({})", flight.flight_number, flight.id);
        Ok(flight)
    }

    async fn get_flight(&self, id: Uuid) -> BookingResult<Option<Flight>> {
        match self.flight_row(id)? {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_flights(
        &self,
        params: &ListParams,
        departure_from: DateTime<Utc>,
    ) -> BookingResult<Page<Flight>> {
        let mut flights = Vec::new();
        for row in self.flight_rows()? {
            flights.push(row.lock().await.clone());
        }

        flights.retain(|flight| {
            flight.departure_time >= departure_from
                && FLIGHT_FILTER_COLUMNS.iter().all(|column| {
                    params
                        .filter(column)
                        .map_or(true, |pattern| like_matches(pattern, flight_field(flight, column)))
                })
        });

        let column = params.sort_column(&FLIGHT_SORT_COLUMNS).unwrap_or("departure_time");
        flights.sort_by(|a, b| {
            directed(compare_flights(a, b, column), params.sort_order()).then_with(|| a.id.cmp(&b.id))
        });

        Ok(Page::from_vec(flights, params))
    }

    async fn set_flight_status(&self, id: Uuid, status: FlightStatus) -> BookingResult<()> {
        let row = self.flight_row(id)?.ok_or(BookingError::FlightNotFound)?;
        let mut flight = row.lock().await;
        flight.status = status;
        flight.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn create_customer(&self, customer: NewCustomer) -> BookingResult<Customer> {
        let customer = customer.into_customer();
        let mut customers = self.customers.write().map_err(poisoned)?;
        if customers.values().any(|c| c.email == customer.email) {
            return Err(BookingError::InvalidRequest("violates customers_email_key".to_string()));
        }
        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: Uuid) -> BookingResult<Option<Customer>> {
        Ok(self.customers.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn set_customer_status(&self, id: Uuid, status: CustomerStatus) -> BookingResult<()> {
        let mut customers = self.customers.write().map_err(poisoned)?;
        let customer = customers.get_mut(&id).ok_or(BookingError::CustomerNotFound)?;
        customer.status = status;
        customer.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn commit_order(&self, draft: OrderDraft) -> BookingResult<Order> {
        let row = self.flight_row(draft.flight_id)?.ok_or(BookingError::FlightNotFound)?;
        let mut flight = row.lock().await;
        debug!(flight_id = %flight.id, available = flight.available_seats, "flight row locked");

        if !flight.status.is_bookable() {
            return Err(BookingError::InvalidFlightState(flight.status));
        }
        match self.customer_status(draft.customer_id)? {
            None => return Err(BookingError::CustomerNotFound),
            Some(CustomerStatus::Inactive) => return Err(BookingError::CustomerInactive),
            Some(CustomerStatus::Active) => {}
        }
        if flight.available_seats < draft.ticket_amount {
            return Err(BookingError::NoAvailableSeats);
        }

        let order = draft.into_order(flight.base_price);
        {
            let mut orders = self.orders.lock().map_err(poisoned)?;
            if orders.iter().any(|o| o.order_number == order.order_number) {
                return Err(BookingError::OrderCreationFailed("duplicate order number".to_string()));
            }
            orders.push(order.clone());
        }
        flight.available_seats -= order.ticket_amount;
        flight.updated_at = order.booking_time;

        info!(
            order_number = %order.order_number,
            flight_id = %order.flight_id,
            seats = order.ticket_amount,
            "Order committed"
        );
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> BookingResult<Option<Order>> {
        Ok(self.orders.lock().map_err(poisoned)?.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, params: &ListParams) -> BookingResult<Page<Order>> {
        let mut id_filters = Vec::new();
        for column in ORDER_ID_FILTERS {
            if let Some(value) = params.filter(column) {
                let id = Uuid::parse_str(value)
                    .map_err(|_| BookingError::InvalidRequest(format!("{} must be a UUID", column)))?;
                id_filters.push((column, id));
            }
        }

        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|order| {
                ORDER_LIKE_FILTERS.iter().all(|column| {
                    params.filter(column).map_or(true, |pattern| {
                        let value = match *column {
                            "status" => order.status.as_str(),
                            _ => order.order_number.as_str(),
                        };
                        like_matches(pattern, value)
                    })
                }) && id_filters.iter().all(|(column, id)| match *column {
                    "customer_id" => order.customer_id == *id,
                    _ => order.flight_id == *id,
                })
            })
            .cloned()
            .collect();

        let column = params.sort_column(&ORDER_SORT_COLUMNS).unwrap_or("booking_time");
        orders.sort_by(|a, b| {
            directed(compare_orders(a, b, column), params.sort_order()).then_with(|| a.id.cmp(&b.id))
        });

        Ok(Page::from_vec(orders, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use futures_util::future::join_all;

    fn new_flight(number: &str, seats: i32) -> NewFlight {
        let departure = Utc::now() + ChronoDuration::days(2);
        NewFlight {
            flight_number: number.to_string(),
            airline: "Starlux".to_string(),
            departure_city: "Taipei".to_string(),
            arrival_city: "Osaka".to_string(),
            departure_time: departure,
            arrival_time: departure + ChronoDuration::hours(3),
            aircraft: "A330".to_string(),
            total_seats: seats,
            base_price: 9_500,
        }
    }

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer {
            name: "Lin Mei".to_string(),
            email: email.to_string(),
            phone: "+886-2-5555-0100".to_string(),
        }
    }

    fn draft(flight: &Flight, customer: &Customer, seats: i32, number: &str) -> OrderDraft {
        OrderDraft {
            flight_id: flight.id,
            customer_id: customer.id,
            ticket_amount: seats,
            order_number: number.to_string(),
            booking_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cache_check_and_decrement() {
        let cache = InMemorySeatCache::new();
        let flight_id = Uuid::new_v4();
        let ttl = Duration::from_secs(60);

        assert_eq!(cache.try_reserve(flight_id, 1).await.unwrap(), ReserveOutcome::Missing);
        assert!(cache.seed_if_absent(flight_id, 3, ttl).await.unwrap());
        assert!(!cache.seed_if_absent(flight_id, 99, ttl).await.unwrap());

        assert_eq!(cache.try_reserve(flight_id, 2).await.unwrap(), ReserveOutcome::Reserved { before: 3 });
        assert_eq!(
            cache.try_reserve(flight_id, 2).await.unwrap(),
            ReserveOutcome::Insufficient { available: 1 }
        );
        assert_eq!(cache.get_seats(flight_id).await.unwrap(), Some(1));

        cache.remove(flight_id).await.unwrap();
        assert_eq!(cache.get_seats(flight_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cache_entries_expire() {
        let cache = InMemorySeatCache::new();
        let flight_id = Uuid::new_v4();
        cache.set_seats(flight_id, 4, Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.try_reserve(flight_id, 1).await.unwrap(), ReserveOutcome::Missing);
    }

    #[tokio::test]
    async fn test_offline_cache_fails_fast() {
        let cache = InMemorySeatCache::new();
        cache.set_offline(true);
        let err = cache.try_reserve(Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, BookingError::TransportFailure(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cache_never_goes_negative_under_contention() {
        let cache = Arc::new(InMemorySeatCache::new());
        let flight_id = Uuid::new_v4();
        cache.set_seats(flight_id, 10, Duration::from_secs(60)).await.unwrap();

        let attempts = (0..50).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.try_reserve(flight_id, 1).await.unwrap() })
        });
        let reserved = join_all(attempts)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(ReserveOutcome::Reserved { .. })))
            .count();

        assert_eq!(reserved, 10);
        assert_eq!(cache.get_seats(flight_id).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_commit_order_decrements_and_prices() {
        let store = InMemoryStore::new();
        let flight = store.create_flight(new_flight("JX820", 5)).await.unwrap();
        let customer = store.create_customer(new_customer("mei@example.com")).await.unwrap();

        let order = store.commit_order(draft(&flight, &customer, 3, "ORD-1")).await.unwrap();
        assert_eq!(order.total_amount, 28_500);

        let after = store.get_flight(flight.id).await.unwrap().unwrap();
        assert_eq!(after.available_seats, 2);
        assert_eq!(store.get_order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_commit_order_rechecks_under_lock() {
        let store = InMemoryStore::new();
        let flight = store.create_flight(new_flight("JX821", 2)).await.unwrap();
        let customer = store.create_customer(new_customer("a@example.com")).await.unwrap();

        let err = store.commit_order(draft(&flight, &customer, 3, "ORD-2")).await.unwrap_err();
        assert_eq!(err, BookingError::NoAvailableSeats);

        store.set_customer_status(customer.id, CustomerStatus::Inactive).await.unwrap();
        let err = store.commit_order(draft(&flight, &customer, 1, "ORD-3")).await.unwrap_err();
        assert_eq!(err, BookingError::CustomerInactive);

        store.set_flight_status(flight.id, FlightStatus::Cancelled).await.unwrap();
        let err = store.commit_order(draft(&flight, &customer, 1, "ORD-4")).await.unwrap_err();
        assert_eq!(err, BookingError::InvalidFlightState(FlightStatus::Cancelled));

        let after = store.get_flight(flight.id).await.unwrap().unwrap();
        assert_eq!(after.available_seats, 2);
        assert_eq!(store.list_orders(&ListParams::default()).await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_order_number_writes_nothing() {
        let store = InMemoryStore::new();
        let flight = store.create_flight(new_flight("JX822", 10)).await.unwrap();
        let customer = store.create_customer(new_customer("b@example.com")).await.unwrap();

        store.commit_order(draft(&flight, &customer, 1, "ORD-DUP")).await.unwrap();
        let err = store.commit_order(draft(&flight, &customer, 1, "ORD-DUP")).await.unwrap_err();
        assert!(matches!(err, BookingError::OrderCreationFailed(_)));

        let after = store.get_flight(flight.id).await.unwrap().unwrap();
        assert_eq!(after.available_seats, 9);
    }

    #[tokio::test]
    async fn test_unique_flight_number_and_email() {
        let store = InMemoryStore::new();
        store.create_flight(new_flight("CI100", 10)).await.unwrap();
        assert!(matches!(
            store.create_flight(new_flight("CI100", 10)).await,
            Err(BookingError::InvalidRequest(_))
        ));

        store.create_customer(new_customer("c@example.com")).await.unwrap();
        assert!(store.create_customer(new_customer("c@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_flights_filters_and_pages() {
        let store = InMemoryStore::new();
        for (i, number) in ["BR001", "BR002", "CI003"].iter().enumerate() {
            let mut flight = new_flight(number, 10);
            flight.base_price = 1_000 * (i as i32 + 1);
            store.create_flight(flight).await.unwrap();
        }
        let mut past = new_flight("BR999", 10);
        past.departure_time = Utc::now() - ChronoDuration::days(10);
        past.arrival_time = past.departure_time + ChronoDuration::hours(2);
        store.create_flight(past).await.unwrap();

        let params = ListParams {
            sort_by: Some("base_price".to_string()),
            sort_order: Some(SortOrder::Desc),
            page_size: Some(1),
            ..Default::default()
        }
        .with_filter("flight_number", "BR%");

        let page = store.list_flights(&params, Utc::now()).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].flight_number, "BR002");
    }

    #[tokio::test]
    async fn test_list_orders_by_customer() {
        let store = InMemoryStore::new();
        let flight = store.create_flight(new_flight("JX830", 10)).await.unwrap();
        let alice = store.create_customer(new_customer("alice@example.com")).await.unwrap();
        let bob = store.create_customer(new_customer("bob@example.com")).await.unwrap();

        store.commit_order(draft(&flight, &alice, 1, "ORD-A1")).await.unwrap();
        store.commit_order(draft(&flight, &alice, 2, "ORD-A2")).await.unwrap();
        store.commit_order(draft(&flight, &bob, 1, "ORD-B1")).await.unwrap();

        let params = ListParams::default().with_filter("customer_id", &alice.id.to_string());
        let page = store.list_orders(&params).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert!(page.data.iter().all(|o| o.customer_id == alice.id));

        let params = ListParams::default().with_filter("order_number", "ORD-B%");
        assert_eq!(store.list_orders(&params).await.unwrap().total_count, 1);

        let params = ListParams::default().with_filter("flight_id", "not-a-uuid");
        assert!(matches!(store.list_orders(&params).await, Err(BookingError::InvalidRequest(_))));
    }
}
