/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::time::{Instant, SystemTime};

/// Convert a wall-clock instant into a monotonic `Instant`, sampled once.
///
/// Returns `None` if the instant lies too far in the future to be
/// represented, i.e. it will never be reached anyway. Instants in the past
/// map to "now".
pub fn instant_of(time: SystemTime) -> Option<Instant> {
    let now = Instant::now();
    match time.duration_since(SystemTime::now()) {
        Ok(remaining) => now.checked_add(remaining),
        Err(_) => Some(now),
    }
}
