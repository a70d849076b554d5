pub mod compensation;
pub mod engine;
pub mod order_number;
pub mod seat_gate;

pub use compensation::SeatClaim;
pub use engine::{EngineSettings, ReservationEngine, SeatSnapshot};
pub use order_number::generate_order_number;
pub use seat_gate::SeatGate;
