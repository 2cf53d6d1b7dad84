//! Response post-processing
//!
//! Upstream payloads carry epoch timestamps in either seconds or
//! milliseconds. Fields named `timestamp` or ending in `_date` are rewritten
//! in place to `YYYY-MM-DD HH:MM:SS` in China Standard Time, the exchange
//! time zone for the covered markets.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::Value;

const MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;
const SECONDS_THRESHOLD: f64 = 1_000_000_000.0;
const CST_OFFSET_SECS: i32 = 8 * 3600;

/// Rewrite epoch-valued time fields throughout `value`
pub fn convert_timestamps(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_time_key(key) {
                    if let Some(formatted) = field.as_f64().and_then(format_epoch) {
                        *field = Value::String(formatted);
                        continue;
                    }
                }
                convert_timestamps(field);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(convert_timestamps),
        _ => {}
    }
}

fn is_time_key(key: &str) -> bool {
    key == "timestamp" || key.ends_with("_date")
}

/// Format an epoch number, or `None` if it is too small to be a timestamp
fn format_epoch(raw: f64) -> Option<String> {
    let millis = if raw > MILLIS_THRESHOLD {
        raw as i64
    } else if raw > SECONDS_THRESHOLD {
        (raw * 1000.0) as i64
    } else {
        return None;
    };

    let offset = FixedOffset::east_opt(CST_OFFSET_SECS)?;
    let time: DateTime<FixedOffset> = offset.timestamp_millis_opt(millis).single()?;
    Some(time.format("%Y-%m-%d %H:%M:%S").to_string())
}
