//! ISO-8601 duration formatting for video lengths.

use regex::Regex;
use std::sync::OnceLock;

/// Returned when a duration token carries no numeric component.
pub const UNKNOWN_DURATION: &str = "unknown";

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$")
            .expect("valid duration regex")
    })
}

/// Format a duration token such as `PT4M13S` as `4:13`, or `PT1H30M45S` as `1:30:45`.
///
/// Days fold into hours. Malformed or overflowing tokens yield
/// [`UNKNOWN_DURATION`].
pub fn format_iso8601_duration(token: &str) -> String {
    let Some(caps) = duration_regex().captures(token.trim()) else {
        return UNKNOWN_DURATION.to_string();
    };

    let mut parts = [None; 4];
    for (slot, group) in parts.iter_mut().zip(1..) {
        if let Some(m) = caps.get(group) {
            match m.as_str().parse::<u64>() {
                Ok(value) => *slot = Some(value),
                Err(_) => return UNKNOWN_DURATION.to_string(),
            }
        }
    }
    let [days, hours, minutes, seconds] = parts;

    if days.is_none() && hours.is_none() && minutes.is_none() && seconds.is_none() {
        return UNKNOWN_DURATION.to_string();
    }

    let Some(hours) = days
        .unwrap_or(0)
        .checked_mul(24)
        .and_then(|h| h.checked_add(hours.unwrap_or(0)))
    else {
        return UNKNOWN_DURATION.to_string();
    };
    let minutes = minutes.unwrap_or(0);
    let seconds = seconds.unwrap_or(0);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
