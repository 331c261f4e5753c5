use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

// `%#z` accepts `Z`, `+hh`, `+hhmm` and `+hh:mm`.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses free-form time text into instants anchored to one reference zone.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    zone: Tz,
}

impl TimeNormalizer {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Returns `None` for anything it cannot read; never panics.
    pub fn parse(&self, text: &str) -> Option<DateTime<Tz>> {
        self.parse_at(text, Utc::now())
    }

    /// Same as [`parse`](Self::parse), with relative words anchored at `now`.
    pub fn parse_at(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(relative) = self.parse_relative(text, now) {
            return Some(relative);
        }
        if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
            return Some(zoned.with_timezone(&self.zone));
        }
        for format in OFFSET_FORMATS {
            if let Ok(zoned) = DateTime::parse_from_str(text, format) {
                return Some(zoned.with_timezone(&self.zone));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return self.attach(naive);
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| self.attach(date.and_hms_opt(0, 0, 0)?))
    }

    pub fn format_minutes(&self, value: &DateTime<Tz>) -> String {
        value.with_timezone(&self.zone).format("%Y-%m-%d %H:%M").to_string()
    }

    pub fn format_iso(&self, value: &DateTime<Tz>) -> String {
        value.with_timezone(&self.zone).to_rfc3339()
    }

    // Local times are read as standard time whenever the wall clock alone is not enough:
    // a time skipped by a DST gap keeps the standard offset, an ambiguous one takes it too.
    fn attach(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(value) => Some(value),
            LocalResult::Ambiguous(first, second) => {
                if first.offset().dst_offset() == TimeDelta::zero() {
                    Some(first)
                } else {
                    Some(second)
                }
            }
            LocalResult::None => {
                let standard = self.zone.offset_from_utc_datetime(&naive).base_utc_offset();
                let utc = naive.checked_sub_signed(standard)?;
                Some(self.zone.from_utc_datetime(&utc))
            }
        }
    }

    fn parse_relative(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let local_now = now.with_timezone(&self.zone);
        let today = local_now.date_naive();
        let day = match text.to_lowercase().as_str() {
            "now" => return Some(local_now),
            "today" => today,
            "tomorrow" => today.checked_add_days(Days::new(1))?,
            "yesterday" => today.checked_sub_days(Days::new(1))?,
            _ => return None,
        };
        self.attach(day.and_hms_opt(0, 0, 0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn normalizer() -> TimeNormalizer {
        TimeNormalizer::new(New_York)
    }

    #[test]
    fn attaches_reference_zone_to_naive_times() {
        let parsed = normalizer().parse("2024-01-15T09:00").unwrap();
        assert_eq!(parsed, New_York.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());

        let spaced = normalizer().parse("2024-01-15 09:00").unwrap();
        assert_eq!(spaced, parsed);
    }

    #[test]
    fn converts_zoned_times_to_reference_zone() {
        let parsed = normalizer().parse("2024-01-15T14:00:00Z").unwrap();
        assert_eq!(parsed, New_York.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        assert_eq!(normalizer().format_minutes(&parsed), "2024-01-15 09:00");

        let offset = normalizer().parse("2024-07-01T12:00:00+02:00").unwrap();
        assert_eq!(normalizer().format_iso(&offset), "2024-07-01T06:00:00-04:00");
    }

    #[test]
    fn accepts_minute_precision_with_zulu_or_short_offsets() {
        let expected = New_York.with_ymd_and_hms(2024, 1, 15, 4, 0, 0).unwrap();
        for text in [
            "2024-01-15T09:00Z",
            "2024-01-15 09:00Z",
            "2024-01-15T09:00+00:00",
            "2024-01-15T10:00+0100",
            "2024-01-15T11:00+02",
        ] {
            assert_eq!(normalizer().parse(text), Some(expected), "for {text:?}");
        }
    }

    #[test]
    fn bare_dates_start_at_midnight() {
        let parsed = normalizer().parse("2024-01-16").unwrap();
        assert_eq!(parsed, New_York.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn relative_words_follow_the_anchor() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap();
        // 03:00 UTC is still the 14th in New York.
        let tomorrow = normalizer().parse_at("Tomorrow", now).unwrap();
        assert_eq!(tomorrow, New_York.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        let right_now = normalizer().parse_at("now", now).unwrap();
        assert_eq!(right_now.with_timezone(&Utc), now);
    }

    #[test]
    fn malformed_input_returns_none() {
        let n = normalizer();
        for text in ["", "   ", "not a date", "2024-13-45", "2024-01-15T25:00", "{}", "🙂"] {
            assert!(n.parse(text).is_none(), "expected None for {text:?}");
        }
    }

    #[test]
    fn skipped_local_time_keeps_standard_offset() {
        // Clocks jump from 02:00 to 03:00 in New York on this date.
        let parsed = normalizer().parse("2024-03-10T02:30").unwrap();
        assert_eq!(parsed.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
        assert_eq!(normalizer().format_iso(&parsed), "2024-03-10T03:30:00-04:00");
    }

    #[test]
    fn repeated_local_time_resolves_to_standard_time() {
        // 01:00-02:00 happens twice in New York on this date.
        let parsed = normalizer().parse("2024-11-03T01:30").unwrap();
        assert_eq!(normalizer().format_iso(&parsed), "2024-11-03T01:30:00-05:00");
    }

    #[test]
    fn normalizing_is_idempotent() {
        let n = normalizer();
        for text in [
            "2024-01-15T09:00",
            "2024-01-15T09:00:00.250",
            "2024-01-15T14:00:00Z",
            "2024-06-01T23:45:00+09:00",
            "2024-11-03T01:30",
            "2024-03-10T02:30",
            "2024-01-15T09:00Z",
        ] {
            let first = n.parse(text).unwrap();
            let again = n.parse(&n.format_iso(&first)).unwrap();
            assert_eq!(first, again, "not idempotent for {text:?}");
        }
    }
}
