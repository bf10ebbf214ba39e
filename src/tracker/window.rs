use chrono::{DateTime, NaiveTime, TimeZone};

/// The `[local midnight, now)` window used for the baseline step query.
pub fn today_window<Tz: TimeZone>(now: DateTime<Tz>) -> (DateTime<Tz>, DateTime<Tz>) {
    (midnight_of(&now), now)
}

/// Start of `now`'s calendar day in its own zone. When midnight does not exist
/// (a DST jump at 00:00) the first instant of the day that does is used.
pub fn midnight_of<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let date = now.date_naive();
    let zone = now.timezone();

    let first_valid = (0..24u32).find_map(|hour| {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        zone.from_local_datetime(&date.and_time(time)).earliest()
    });

    first_valid.unwrap_or_else(|| now.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Local, Timelike};

    #[test]
    fn window_starts_at_midnight_and_ends_now() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2026, 3, 14, 17, 45, 12).unwrap();

        let (start, end) = today_window(now);
        assert_eq!(end, now);
        assert_eq!(start, zone.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn just_after_midnight_is_a_tiny_window() {
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2026, 1, 1, 0, 0, 3).unwrap();

        let (start, end) = today_window(now);
        assert_eq!((end - start).num_seconds(), 3);
    }

    #[test]
    fn local_window_is_same_day() {
        let now = Local::now();
        let (start, end) = today_window(now);
        assert!(start <= end);
        assert_eq!(start.date_naive(), end.date_naive());
        assert_eq!(start.minute(), 0);
    }
}
