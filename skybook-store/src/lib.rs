pub mod app_config;
pub mod customer_repo;
pub mod database;
pub mod flight_repo;
pub mod memory;
pub mod order_repo;
pub mod redis_repo;

pub use customer_repo::PostgresCustomerRepository;
pub use database::DbClient;
pub use flight_repo::PostgresFlightRepository;
pub use memory::{InMemorySeatCache, InMemoryStore};
pub use order_repo::PostgresOrderRepository;
pub use redis_repo::RedisClient;
