use chrono::{DateTime, Utc};
use rand::Rng;

/// Generates an original transaction reference:
/// `{prefix}-{yyyyMMddHHmmssfff}-{6 upper-case hex chars}`.
pub fn generate(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{}-{}-{:06X}", prefix, now.format("%Y%m%d%H%M%S%3f"), suffix)
}
