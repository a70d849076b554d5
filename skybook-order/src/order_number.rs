use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const DEFAULT_ORDER_PREFIX: &str = "ORD";

/// `<prefix>-<UTC date as YYYYMMDD>-<8 random hex chars>`, e.g. `ORD-20250314-9f2c41ab`.
///
/// Collisions are left to the `orders.order_number` unique constraint; nothing here retries.
pub fn generate_order_number(prefix: &str) -> String {
    format_order_number(prefix, Utc::now(), Uuid::new_v4())
}

fn format_order_number(prefix: &str, at: DateTime<Utc>, entropy: Uuid) -> String {
    let random = entropy.simple().to_string();
    format!("{}-{}-{}", prefix, at.format("%Y%m%d"), &random[..8])
}
