use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

// ============================================================================
// Flight
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Delayed,
    Cancelled,
    InProgress,
    Completed,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::Delayed => "DELAYED",
            FlightStatus::Cancelled => "CANCELLED",
            FlightStatus::InProgress => "IN_PROGRESS",
            FlightStatus::Completed => "COMPLETED",
        }
    }

    /// Only flights that have not departed and are still operating can take bookings.
    pub fn is_bookable(&self) -> bool {
        matches!(self, FlightStatus::Scheduled | FlightStatus::Delayed)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(FlightStatus::Scheduled),
            "DELAYED" => Ok(FlightStatus::Delayed),
            "CANCELLED" => Ok(FlightStatus::Cancelled),
            "IN_PROGRESS" => Ok(FlightStatus::InProgress),
            "COMPLETED" => Ok(FlightStatus::Completed),
            other => Err(ParseStatusError { kind: "flight", value: other.to_string() }),
        }
    }
}

/// A scheduled flight. `available_seats` is the durable seat counter and stays within
/// `0..=total_seats` in every committed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub aircraft: String,
    pub status: FlightStatus,
    pub total_seats: i32,
    pub available_seats: i32,
    pub base_price: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlight {
    pub flight_number: String,
    pub airline: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub aircraft: String,
    pub total_seats: i32,
    pub base_price: i32,
}

impl NewFlight {
    pub fn validate(&self) -> Result<(), crate::BookingError> {
        if self.flight_number.trim().is_empty() {
            return Err(crate::BookingError::InvalidRequest("flight_number is required".into()));
        }
        if self.total_seats < 0 {
            return Err(crate::BookingError::InvalidRequest("total_seats must not be negative".into()));
        }
        if self.base_price < 0 {
            return Err(crate::BookingError::InvalidRequest("base_price must not be negative".into()));
        }
        if self.arrival_time <= self.departure_time {
            return Err(crate::BookingError::InvalidRequest("arrival_time must be after departure_time".into()));
        }
        Ok(())
    }

    /// Materialise the flight with a full cabin.
    pub fn into_flight(self) -> Flight {
        let now = Utc::now();
        Flight {
            id: Uuid::new_v4(),
            flight_number: self.flight_number,
            airline: self.airline,
            departure_city: self.departure_city,
            arrival_city: self.arrival_city,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            aircraft: self.aircraft,
            status: FlightStatus::Scheduled,
            total_seats: self.total_seats,
            available_seats: self.total_seats,
            base_price: self.base_price,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Customer
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CustomerStatus::Active),
            "INACTIVE" => Ok(CustomerStatus::Inactive),
            other => Err(ParseStatusError { kind: "customer", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl NewCustomer {
    pub fn into_customer(self) -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            status: CustomerStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Order
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "COMPLETED" => Ok(OrderStatus::Completed),
            other => Err(ParseStatusError { kind: "order", value: other.to_string() }),
        }
    }
}

/// A committed booking. `total_amount` is in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub ticket_amount: i32,
    pub total_amount: i64,
    pub order_number: String,
    pub booking_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub flight_id: Uuid,
    pub customer_id: Uuid,
    pub ticket_amount: i32,
}

/// Everything the durable writer needs to create an order. The amount is priced by the writer
/// against the locked flight row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub flight_id: Uuid,
    pub customer_id: Uuid,
    pub ticket_amount: i32,
    pub order_number: String,
    pub booking_time: DateTime<Utc>,
}

impl OrderDraft {
    /// Build the order row for a flight that passed the locked re-check.
    pub fn into_order(self, base_price: i32) -> Order {
        Order {
            id: Uuid::new_v4(),
            flight_id: self.flight_id,
            customer_id: self.customer_id,
            status: OrderStatus::Completed,
            ticket_amount: self.ticket_amount,
            total_amount: i64::from(base_price) * i64::from(self.ticket_amount),
            order_number: self.order_number,
            booking_time: self.booking_time,
            created_at: self.booking_time,
            updated_at: self.booking_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_flight() -> NewFlight {
        let departure = Utc::now() + Duration::days(3);
        NewFlight {
            flight_number: "BR0225".to_string(),
            airline: "EVA Air".to_string(),
            departure_city: "Taipei".to_string(),
            arrival_city: "Tokyo".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(3),
            aircraft: "A321".to_string(),
            total_seats: 180,
            base_price: 12_000,
        }
    }

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in [
            FlightStatus::Scheduled,
            FlightStatus::Delayed,
            FlightStatus::Cancelled,
            FlightStatus::InProgress,
            FlightStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<FlightStatus>().unwrap(), status);
        }
        assert!("BOARDING".parse::<FlightStatus>().is_err());
        assert_eq!("INACTIVE".parse::<CustomerStatus>().unwrap(), CustomerStatus::Inactive);
        assert_eq!("COMPLETED".parse::<OrderStatus>().unwrap(), OrderStatus::Completed);
    }

    #[test]
    fn test_bookable_states() {
        assert!(FlightStatus::Scheduled.is_bookable());
        assert!(FlightStatus::Delayed.is_bookable());
        assert!(!FlightStatus::Cancelled.is_bookable());
        assert!(!FlightStatus::InProgress.is_bookable());
        assert!(!FlightStatus::Completed.is_bookable());
    }

    #[test]
    fn test_new_flight_starts_full() {
        let flight = new_flight().into_flight();
        assert_eq!(flight.available_seats, flight.total_seats);
        assert_eq!(flight.status, FlightStatus::Scheduled);
    }

    #[test]
    fn test_new_flight_validation() {
        assert!(new_flight().validate().is_ok());

        let mut bad = new_flight();
        bad.arrival_time = bad.departure_time;
        assert!(matches!(bad.validate(), Err(crate::BookingError::InvalidRequest(_))));

        let mut bad = new_flight();
        bad.total_seats = -1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_draft_prices_order() {
        let draft = OrderDraft {
            flight_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            ticket_amount: 3,
            order_number: "ORD-20250101-abcdef12".to_string(),
            booking_time: Utc::now(),
        };
        let order = draft.clone().into_order(12_000);
        assert_eq!(order.total_amount, 36_000);
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.order_number, draft.order_number);
        assert_eq!(order.booking_time, draft.booking_time);
    }

    #[test]
    fn test_draft_total_exceeds_i32() {
        let draft = OrderDraft {
            flight_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            ticket_amount: 500,
            order_number: "ORD-20250101-0badc0de".to_string(),
            booking_time: Utc::now(),
        };
        let order = draft.into_order(5_000_000);
        assert_eq!(order.total_amount, 2_500_000_000);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&FlightStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
