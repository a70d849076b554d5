use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use skybook_core::cache::seat_key;
use skybook_core::{BookingError, BookingResult, ReserveOutcome, SeatCache};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Check-and-decrement evaluated inside Redis so no other client interleaves.
///
/// Returns `{status, before}`: status `1` decremented, `0` insufficient, `-1` key absent.
/// `before` is the counter as read by this same evaluation.
const CHECK_AND_DECREMENT_SEATS: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return {-1, 0}
end
current = tonumber(current)
local requested = tonumber(ARGV[1])
if current < requested then
    return {0, current}
end
redis.call('DECRBY', KEYS[1], requested)
return {1, current}
"#;

#[derive(Clone)]
pub struct RedisClient {
    conn: MultiplexedConnection,
    reserve_script: redis::Script,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, RedisError> {
        let client = redis::Client::open(connection_string)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis at {}", connection_string);
        Ok(Self {
            conn,
            reserve_script: redis::Script::new(CHECK_AND_DECREMENT_SEATS),
        })
    }

    pub async fn ping(&self) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn transport(err: RedisError) -> BookingError {
    BookingError::TransportFailure(format!("redis: {}", err))
}

fn decode_outcome(status: i64, before: i64) -> BookingResult<ReserveOutcome> {
    let before = i32::try_from(before)
        .map_err(|_| BookingError::TransportFailure(format!("seat counter out of range: {}", before)))?;
    match status {
        1 => Ok(ReserveOutcome::Reserved { before }),
        0 => Ok(ReserveOutcome::Insufficient { available: before }),
        -1 => Ok(ReserveOutcome::Missing),
        other => Err(BookingError::TransportFailure(format!("unexpected seat script result: {}", other))),
    }
}

#[async_trait]
impl SeatCache for RedisClient {
    async fn try_reserve(&self, flight_id: Uuid, seats: i32) -> BookingResult<ReserveOutcome> {
        let mut conn = self.conn.clone();
        let (status, before): (i64, i64) = self
            .reserve_script
            .key(seat_key(flight_id))
            .arg(seats)
            .invoke_async(&mut conn)
            .await
            .map_err(transport)?;
        debug!(%flight_id, seats, status, before, "seat script evaluated");
        decode_outcome(status, before)
    }

    async fn seed_if_absent(&self, flight_id: Uuid, seats: i32, ttl: Duration) -> BookingResult<bool> {
        let mut conn = self.conn.clone();
        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(seat_key(flight_id))
            .arg(seats)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(result.is_some())
    }

    async fn set_seats(&self, flight_id: Uuid, seats: i32, ttl: Duration) -> BookingResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(seat_key(flight_id), seats, ttl_seconds(ttl))
            .await
            .map_err(transport)
    }

    async fn get_seats(&self, flight_id: Uuid) -> BookingResult<Option<i32>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<i32>>(seat_key(flight_id)).await.map_err(transport)
    }

    async fn remove(&self, flight_id: Uuid) -> BookingResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(seat_key(flight_id)).await.map_err(transport)
    }
}
