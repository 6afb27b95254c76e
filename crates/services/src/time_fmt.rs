/// Countdown display: `MM:SS`, or `HH:MM:SS` once an hour or more remains.
#[must_use]
pub fn format_countdown(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
