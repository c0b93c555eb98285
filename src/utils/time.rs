use chrono::{DateTime, Duration, NaiveTime, TimeZone};

/// Returns the first moment of the day `date` falls on. When a clock change skips midnight the day
/// starts at the first local time that exists.
pub fn day_start<Tz: TimeZone>(date: &DateTime<Tz>) -> DateTime<Tz> {
    let midnight = date.date_naive().and_time(NaiveTime::MIN);
    let tz = date.timezone();
    (0..=24)
        .find_map(|hour| {
            tz.from_local_datetime(&(midnight + Duration::hours(hour)))
                .earliest()
        })
        .unwrap_or_else(|| date.clone())
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    day_start(&(date + Duration::days(1)))
}

/// The standard way of showing a duration in crono, e.g. `1h2m3s`. Negative durations are shown
/// as zero.
pub fn format_duration(v: Duration) -> String {
    let v = v.max(Duration::zero());
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{
        Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
    };

    use super::{day_start, format_duration, next_day_start};

    /// Zone whose clocks jump from 00:00 straight to 01:00 on 2024-09-08, like America/Santiago.
    #[derive(Clone, Copy, Debug)]
    struct MidnightGap;

    fn switch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 8)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn winter() -> FixedOffset {
        FixedOffset::west_opt(4 * 3600).unwrap()
    }

    fn summer() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local < switch() {
                LocalResult::Single(winter())
            } else if *local < switch() + Duration::hours(1) {
                LocalResult::None
            } else {
                LocalResult::Single(summer())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < switch() + Duration::hours(4) {
                winter()
            } else {
                summer()
            }
        }
    }

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(format_duration(Duration::minutes(90)), "1h30m0s");
        assert_eq!(format_duration(Duration::milliseconds(999)), "0s");
    }

    #[test]
    fn negative_durations_show_as_zero() {
        assert_eq!(format_duration(Duration::seconds(-30)), "0s");
    }

    #[test]
    fn next_day_start_is_midnight() {
        let date = Utc.with_ymd_and_hms(2024, 4, 5, 17, 30, 0).unwrap();
        let next = next_day_start(date);
        assert_eq!(
            next.date_naive(),
            NaiveDate::from_ymd_opt(2024, 4, 6).unwrap()
        );
        assert_eq!(next.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn skipped_midnight_starts_the_day_at_the_first_real_hour() {
        let evening = MidnightGap
            .from_local_datetime(&(switch() - Duration::hours(6)))
            .unwrap();

        let next = next_day_start(evening);
        assert_eq!(next.naive_local(), switch() + Duration::hours(1));

        let during = MidnightGap
            .from_local_datetime(&(switch() + Duration::hours(15)))
            .unwrap();
        assert_eq!(day_start(&during), next);
    }
}
