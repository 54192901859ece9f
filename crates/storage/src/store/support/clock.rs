#![forbid(unsafe_code)]

use time::OffsetDateTime;

/// `YYYY-MM-DD HH:MM:SS.mmm` in UTC. Sorts lexicographically next to `datetime('now')` values.
pub(in crate::store) fn now_timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

fn format_timestamp(at: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond()
    )
}
