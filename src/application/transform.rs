//! Pure projections from raw provider payloads to stored series.

use thiserror::Error;
use time::Date;

use crate::domain::series::{DailySummary, HourlySeries};
use crate::infra::upstream::{RawDailyFields, RawHourlyFields};
use crate::util::date::iso_date;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("forecast provider returned no daily record for {date}")]
    DateNotFound { date: String },
}

/// Select every hourly record whose timestamp falls on `date`, in order.
pub fn hourly_series(raw: &RawHourlyFields, date: Date) -> HourlySeries {
    let target = iso_date(date);
    let indices: Vec<usize> = raw
        .time
        .iter()
        .enumerate()
        .filter(|(_, timestamp)| date_part(timestamp) == target)
        .map(|(idx, _)| idx)
        .collect();

    HourlySeries {
        labels: indices.iter().map(|&idx| hour_label(&raw.time[idx])).collect(),
        uv: project(&raw.uv_index, &indices),
        uv_clear_sky: project(&raw.uv_index_clear_sky, &indices),
        precipitation: project(&raw.precipitation_probability, &indices),
        temperature: project(&raw.temperature_2m, &indices),
        apparent_temperature: project(&raw.apparent_temperature, &indices),
        cloud_cover: project(&raw.cloud_cover, &indices),
        humidity: project(&raw.relative_humidity_2m, &indices),
        date: target,
    }
}

/// Extract the single daily record for `date`.
pub fn daily_summary(raw: &RawDailyFields, date: Date) -> Result<DailySummary, TransformError> {
    let target = iso_date(date);
    let idx = raw
        .time
        .iter()
        .position(|timestamp| date_part(timestamp) == target)
        .ok_or_else(|| TransformError::DateNotFound {
            date: target.clone(),
        })?;

    Ok(DailySummary {
        date: target,
        temp_max: value_at(&raw.temperature_2m_max, idx),
        temp_min: value_at(&raw.temperature_2m_min, idx),
        uv_max: value_at(&raw.uv_index_max, idx),
        precip_max: value_at(&raw.precipitation_probability_max, idx),
        humidity_max: value_at(&raw.relative_humidity_2m_max, idx),
    })
}

/// Missing trailing values read as `None` so every projected array keeps the
/// same length.
fn value_at(values: &[Option<f64>], idx: usize) -> Option<f64> {
    values.get(idx).copied().flatten()
}

fn project(values: &[Option<f64>], indices: &[usize]) -> Vec<Option<f64>> {
    indices.iter().map(|&idx| value_at(values, idx)).collect()
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

/// Render a `YYYY-MM-DDTHH:MM` timestamp as a 12-hour clock label.
///
/// Unparseable timestamps are passed through unchanged.
pub fn hour_label(timestamp: &str) -> String {
    let hour = timestamp
        .split_once('T')
        .and_then(|(_, clock)| clock.split(':').next())
        .and_then(|hour| hour.parse::<u8>().ok())
        .filter(|hour| *hour < 24);

    match hour {
        Some(hour) => {
            let suffix = if hour < 12 { "AM" } else { "PM" };
            let display = match hour % 12 {
                0 => 12,
                other => other,
            };
            format!("{display}:00 {suffix}")
        }
        None => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn raw_hourly() -> RawHourlyFields {
        let time = [
            "2025-01-14T23:00",
            "2025-01-15T00:00",
            "2025-01-15T01:00",
            "2025-01-15T12:00",
            "2025-01-15T13:00",
            "2025-01-16T00:00",
        ];
        RawHourlyFields {
            time: time.iter().map(|t| t.to_string()).collect(),
            uv_index: vec![Some(0.0), Some(0.1), Some(0.2), Some(4.5), Some(4.0), Some(0.0)],
            uv_index_clear_sky: vec![Some(0.0); 6],
            precipitation_probability: vec![Some(10.0); 6],
            temperature_2m: vec![Some(30.0), Some(31.0), None, Some(40.0), Some(41.0), Some(29.0)],
            apparent_temperature: vec![Some(25.0); 6],
            cloud_cover: vec![Some(50.0); 6],
            relative_humidity_2m: vec![Some(70.0); 4],
        }
    }

    #[test]
    fn hourly_series_keeps_only_target_date_in_order() {
        let series = hourly_series(&raw_hourly(), date!(2025 - 01 - 15));

        assert_eq!(series.date, "2025-01-15");
        assert_eq!(
            series.labels,
            vec!["12:00 AM", "1:00 AM", "12:00 PM", "1:00 PM"]
        );
        assert_eq!(series.uv, vec![Some(0.1), Some(0.2), Some(4.5), Some(4.0)]);
        assert_eq!(series.temperature, vec![Some(31.0), None, Some(40.0), Some(41.0)]);
        // Short upstream arrays pad with nulls so lengths stay aligned.
        assert_eq!(series.humidity, vec![Some(70.0), Some(70.0), Some(70.0), None]);
        assert_eq!(series.cloud_cover.len(), series.len());
    }

    #[test]
    fn hourly_series_is_empty_for_dates_outside_payload() {
        let series = hourly_series(&raw_hourly(), date!(2025 - 02 - 01));
        assert!(series.is_empty());
        assert!(series.uv.is_empty());
    }

    #[test]
    fn hour_labels_use_twelve_hour_clock() {
        assert_eq!(hour_label("2025-01-15T00:00"), "12:00 AM");
        assert_eq!(hour_label("2025-01-15T09:00"), "9:00 AM");
        assert_eq!(hour_label("2025-01-15T12:00"), "12:00 PM");
        assert_eq!(hour_label("2025-01-15T23:00"), "11:00 PM");
        assert_eq!(hour_label("garbage"), "garbage");
    }

    #[test]
    fn daily_summary_picks_matching_record() {
        let raw = RawDailyFields {
            time: vec!["2025-01-15".into(), "2025-01-16".into()],
            temperature_2m_max: vec![Some(45.0), Some(50.0)],
            temperature_2m_min: vec![Some(30.0), Some(33.0)],
            uv_index_max: vec![Some(3.0), None],
            precipitation_probability_max: vec![Some(20.0), Some(80.0)],
            relative_humidity_2m_max: vec![Some(90.0), Some(95.0)],
        };

        let summary = daily_summary(&raw, date!(2025 - 01 - 16)).expect("summary");
        assert_eq!(summary.date, "2025-01-16");
        assert_eq!(summary.temp_max, Some(50.0));
        assert_eq!(summary.uv_max, None);
        assert_eq!(summary.precip_max, Some(80.0));

        let missing = daily_summary(&raw, date!(2025 - 01 - 20)).unwrap_err();
        assert_eq!(
            missing,
            TransformError::DateNotFound {
                date: "2025-01-20".into()
            }
        );
    }
}
