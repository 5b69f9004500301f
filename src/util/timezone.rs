use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use time::{Date, Month, OffsetDateTime, UtcOffset};

/// Timezone that defines the server's notion of "today".
pub const REFERENCE_TIMEZONE: Tz = chrono_tz::America::New_York;

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    let utc = time.to_offset(UtcOffset::UTC);
    DateTime::<Utc>::from_timestamp(utc.unix_timestamp(), utc.nanosecond())
        .map(|datetime| datetime.with_timezone(&tz))
}

/// Calendar date of `time` as observed in `tz`; falls back to the UTC date if
/// the instant cannot be represented by chrono.
pub fn localized_date(time: OffsetDateTime, tz: Tz) -> Date {
    let utc_date = time.to_offset(UtcOffset::UTC).date();
    let Some(localized) = localized_datetime(time, tz) else {
        return utc_date;
    };

    u8::try_from(localized.month())
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .zip(u8::try_from(localized.day()).ok())
        .and_then(|(month, day)| Date::from_calendar_date(localized.year(), month, day).ok())
        .unwrap_or(utc_date)
}

/// Today's date in the reference timezone.
pub fn reference_today(now: OffsetDateTime) -> Date {
    localized_date(now, REFERENCE_TIMEZONE)
}

/// Coarse longitude heuristic: the continental US band gets New York time,
/// everything else is served in UTC.
pub fn forecast_timezone(longitude: f64) -> Tz {
    if (-130.0..=-60.0).contains(&longitude) {
        chrono_tz::America::New_York
    } else {
        chrono_tz::UTC
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn reference_today_follows_new_york_calendar() {
        // 03:30 UTC is still the previous evening in New York.
        let now = datetime!(2025-01-16 03:30:00 UTC);
        assert_eq!(reference_today(now), date!(2025 - 01 - 15));

        let later = datetime!(2025-01-16 12:00:00 UTC);
        assert_eq!(reference_today(later), date!(2025 - 01 - 16));
    }

    #[test]
    fn us_longitudes_select_new_york() {
        assert_eq!(forecast_timezone(-74.0).name(), "America/New_York");
        assert_eq!(forecast_timezone(-130.0).name(), "America/New_York");
        assert_eq!(forecast_timezone(-60.0).name(), "America/New_York");
    }

    #[test]
    fn other_longitudes_select_utc() {
        assert_eq!(forecast_timezone(-0.1).name(), "UTC");
        assert_eq!(forecast_timezone(-130.5).name(), "UTC");
        assert_eq!(forecast_timezone(139.7).name(), "UTC");
    }
}
