//! Cache key derivation.

use std::fmt;

use time::Date;

use crate::domain::location::Location;
use crate::domain::series::SeriesKind;
use crate::util::date::iso_date;

/// Identifies one cached forecast.
///
/// Coordinates are rounded to two decimals and stored as integer hundredths, so
/// nearby requests collapse onto the same entry and hashing stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: SeriesKind,
    lat_e2: i32,
    lon_e2: i32,
    date: Date,
}

impl CacheKey {
    pub fn new(kind: SeriesKind, location: &Location, date: Date) -> Self {
        Self {
            kind,
            lat_e2: hundredths(location.latitude()),
            lon_e2: hundredths(location.longitude()),
            date,
        }
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn date(&self) -> Date {
        self.date
    }
}

fn hundredths(value: f64) -> i32 {
    // Location bounds keep this well inside i32.
    (value * 100.0).round() as i32
}

fn write_fixed2(f: &mut fmt::Formatter<'_>, value: i32) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.kind)?;
        write_fixed2(f, self.lat_e2)?;
        f.write_str(",")?;
        write_fixed2(f, self.lon_e2)?;
        write!(f, ":{}", iso_date(self.date))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn location(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).expect("valid location")
    }

    #[test]
    fn nearby_coordinates_share_a_key() {
        let day = date!(2025 - 01 - 15);
        let a = CacheKey::new(SeriesKind::Hourly, &location(40.7206, -74.3637), day);
        let b = CacheKey::new(SeriesKind::Hourly, &location(40.7249, -74.3601), day);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "hourly:40.72,-74.36:2025-01-15");

        let c = CacheKey::new(SeriesKind::Hourly, &location(40.7161, -74.3624), day);
        let d = CacheKey::new(SeriesKind::Hourly, &location(40.7162, -74.3626), day);
        assert_eq!(c, d);
        assert_eq!(c, a);
    }

    #[test]
    fn kind_and_date_separate_keys() {
        let loc = location(40.72, -74.36);
        let hourly = CacheKey::new(SeriesKind::Hourly, &loc, date!(2025 - 01 - 15));
        let daily = CacheKey::new(SeriesKind::Daily, &loc, date!(2025 - 01 - 15));
        let next_day = CacheKey::new(SeriesKind::Hourly, &loc, date!(2025 - 01 - 16));
        assert_ne!(hourly, daily);
        assert_ne!(hourly, next_day);
    }

    #[test]
    fn renders_small_negative_values() {
        let key = CacheKey::new(SeriesKind::Daily, &location(-0.05, 0.0), date!(2025 - 06 - 01));
        assert_eq!(key.to_string(), "daily:-0.05,0.00:2025-06-01");
    }
}
