//! `H+:MM:SS` duration text used by AVTransport variables.

/// Format a number of seconds as `HH:MM:SS`.
///
/// Hours are zero-padded to two digits and grow past 99 as needed.
pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Parse `H:MM:SS` duration text into whole seconds.
///
/// Empty text is zero. Fractional seconds (`0:03:15.250`) are truncated.
/// Returns `None` for anything else that is not three numeric fields, such
/// as the `NOT_IMPLEMENTED` placeholder some renderers report.
pub fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0);
    }

    let mut parts = text.split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    let seconds_field = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }

    let whole_seconds = seconds_field.split('.').next().unwrap_or(seconds_field);
    let seconds: u32 = whole_seconds.parse().ok()?;

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}
