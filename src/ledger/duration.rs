//! Session duration reporting

use chrono::{DateTime, Duration, Utc};

/// Label reported for a session that has not ended yet.
pub const IN_PROGRESS: &str = "in progress";

/// Format an elapsed duration as whole hours/minutes/seconds, omitting
/// zero-valued leading units ("1h 23m 45s", "23m 45s", "45s").
#[must_use]
pub fn format_session_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Duration label for a session record: the formatted elapsed time once both
/// endpoints exist, `in progress` otherwise.
#[must_use]
pub fn session_duration_label(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format_session_duration(end - start),
        _ => IN_PROGRESS.to_string(),
    }
}
