use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format a note timestamp for display, falling back to the raw string when it
/// cannot be parsed
pub fn display_date(raw: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(raw)
        // the service sometimes sends the offset without a colon
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|d| Utc.from_utc_datetime(&d))
        });
    match parsed {
        Ok(d) => d.format(DISPLAY_FORMAT).to_string(),
        Err(_) => String::from(raw),
    }
}
