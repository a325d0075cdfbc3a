//! Small shared helpers.

use rand::Rng;
use std::ops::Range;
use std::time::Duration;

/// Format a duration the way users see it in notifications and `!list`
/// output: `3d 4h 12m`, `4h 12m 9s`, `12m 9s`, or `9s`.
pub fn format_duration(d: Duration) -> String {
    let seconds = d.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m", days, hours % 24, minutes % 60)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Pick a uniformly random duration from `range`.
///
/// Used for the scheduler's inter-check jitter. An empty range, or one
/// narrower than the millisecond sampling granularity, yields the start
/// value, so zeroed test settings produce no delay.
pub fn jitter(range: Range<Duration>) -> Duration {
    if range.end <= range.start {
        return range.start;
    }
    let span = (range.end - range.start).as_millis() as u64;
    if span == 0 {
        return range.start;
    }
    let offset = rand::thread_rng().gen_range(0..span);
    range.start + Duration::from_millis(offset)
}
