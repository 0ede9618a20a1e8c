use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since the epoch, used to time the splitters.
pub fn get_current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}
