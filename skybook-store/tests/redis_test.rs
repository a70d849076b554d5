//! Seat counter behaviour against a real Redis.
//!
//! Skipped unless `SKYBOOK_TEST_REDIS_URL` is set, e.g.
//! `SKYBOOK_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -p skybook-store --test redis_test`.

use futures_util::future::join_all;
use skybook_core::cache::seat_key;
use skybook_core::{ReserveOutcome, SeatCache};
use skybook_store::RedisClient;
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

const TTL: Duration = Duration::from_secs(120);

async fn redis() -> Option<RedisClient> {
    let Ok(url) = std::env::var("SKYBOOK_TEST_REDIS_URL") else {
        eprintln!("SKYBOOK_TEST_REDIS_URL not set, skipping live Redis test");
        return None;
    };
    let client = RedisClient::new(&url).await.unwrap();
    client.ping().await.unwrap();
    Some(client)
}

async fn raw_ttl(flight_id: Uuid) -> i64 {
    let url = std::env::var("SKYBOOK_TEST_REDIS_URL").unwrap();
    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("TTL").arg(seat_key(flight_id)).query_async(&mut conn).await.unwrap()
}

#[tokio::test]
async fn test_try_reserve_outcomes() {
    let Some(redis) = redis().await else { return };
    let flight_id = Uuid::new_v4();

    assert_eq!(redis.try_reserve(flight_id, 1).await.unwrap(), ReserveOutcome::Missing);
    assert_eq!(redis.get_seats(flight_id).await.unwrap(), None);

    redis.set_seats(flight_id, 3, TTL).await.unwrap();
    assert_eq!(
        redis.try_reserve(flight_id, 2).await.unwrap(),
        ReserveOutcome::Reserved { before: 3 }
    );
    assert_eq!(redis.get_seats(flight_id).await.unwrap(), Some(1));

    assert_eq!(
        redis.try_reserve(flight_id, 2).await.unwrap(),
        ReserveOutcome::Insufficient { available: 1 }
    );
    assert_eq!(redis.get_seats(flight_id).await.unwrap(), Some(1));

    redis.remove(flight_id).await.unwrap();
    assert_eq!(redis.try_reserve(flight_id, 1).await.unwrap(), ReserveOutcome::Missing);
}

#[tokio::test]
async fn test_seed_if_absent_keeps_first_value_and_sets_expiry() {
    let Some(redis) = redis().await else { return };
    let flight_id = Uuid::new_v4();

    assert!(redis.seed_if_absent(flight_id, 5, TTL).await.unwrap());
    assert!(!redis.seed_if_absent(flight_id, 9, TTL).await.unwrap());
    assert_eq!(redis.get_seats(flight_id).await.unwrap(), Some(5));

    let ttl = raw_ttl(flight_id).await;
    assert!(ttl > 0 && ttl <= 120, "unexpected ttl {}", ttl);

    redis.remove(flight_id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_seeds_have_one_winner() {
    let Some(redis) = redis().await else { return };
    let flight_id = Uuid::new_v4();

    let seeds = join_all((1..=16).map(|seats| {
        let redis = redis.clone();
        tokio::spawn(async move { (seats, redis.seed_if_absent(flight_id, seats, TTL).await.unwrap()) })
    }))
    .await;
    let winners: Vec<i32> = seeds
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|(_, seeded)| *seeded)
        .map(|(seats, _)| seats)
        .collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(redis.get_seats(flight_id).await.unwrap(), Some(winners[0]));

    redis.remove(flight_id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_never_overdraw() {
    let Some(redis) = redis().await else { return };
    let flight_id = Uuid::new_v4();
    redis.set_seats(flight_id, 10, TTL).await.unwrap();

    let outcomes: Vec<ReserveOutcome> = join_all((0..25).map(|_| {
        let redis = redis.clone();
        tokio::spawn(async move { redis.try_reserve(flight_id, 1).await.unwrap() })
    }))
    .await
    .into_iter()
    .map(|r| r.unwrap())
    .collect();

    let befores: HashSet<i32> = outcomes
        .iter()
        .filter_map(|o| match o {
            ReserveOutcome::Reserved { before } => Some(*before),
            _ => None,
        })
        .collect();
    let refused = outcomes
        .iter()
        .filter(|o| matches!(o, ReserveOutcome::Insufficient { available: 0 }))
        .count();

    // Each decrement saw a distinct pre-value, so none of them interleaved.
    assert_eq!(befores, (1..=10).collect());
    assert_eq!(refused, 15);
    assert_eq!(redis.get_seats(flight_id).await.unwrap(), Some(0));

    redis.remove(flight_id).await.unwrap();
}
