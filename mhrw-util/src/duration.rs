use std::time::Duration;

/// Formats a duration the way status reports and summaries want it:
/// `H:MM:SS.sss` once an hour has elapsed, `M:SS.sss` once a minute has
/// elapsed, and a bare `S.sss` below that. Callers append their own unit
/// suffix (e.g. "s elapsed") where needed.
pub fn format_duration(d: Duration) -> String {
    let total_millis = d.as_millis();
    let millis = total_millis % 1000;
    let total_secs = total_millis / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
    } else if mins > 0 {
        format!("{}:{:02}.{:03}", mins, secs, millis)
    } else {
        format!("{}.{:03}", secs, millis)
    }
}
