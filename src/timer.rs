use std::time::{Duration, SystemTime};

/// Wall-clock instant at which playback would have started had it run
/// uninterrupted: `now - view_offset`.
///
/// Publishing this anchor instead of the offset keeps the elapsed-time display
/// correct no matter how long the publish itself takes.
pub fn playback_start(now: SystemTime, view_offset_ms: i64) -> SystemTime {
    let offset = Duration::from_millis(sanitize_offset(view_offset_ms));
    now.checked_sub(offset).unwrap_or(now)
}

/// Negative offsets are not meaningful; clamp to zero.
pub fn sanitize_offset(view_offset_ms: i64) -> u64 {
    view_offset_ms.max(0) as u64
}
