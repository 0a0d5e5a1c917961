use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use super::models::{ForecastSample, HourlyRecord, InputError};

/// Wind band in km/h that is flyable on the ground
pub const WIND_RANGE: RangeInclusive<f64> = 14.0..=25.0;

/// Maximum precipitation in mm/h
pub const MAX_PRECIPITATION: f64 = 0.1;

/// German compass labels, one per 22.5° sector starting at north
pub const BEARING_LABELS: [&str; 16] = [
    "N", "NNO", "NO", "ONO", "O", "OSO", "SO", "SSO", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Valid cloud cover fractions, clear to overcast
pub const CLOUD_COVER_RANGE: RangeInclusive<f64> = 0.0..=1.0;

const HOURLY: &str = "hourly";

/// Map a bearing in degrees to its compass label. Wraps at 360°.
pub fn bearing_label(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).floor() as i64;
    BEARING_LABELS[index.rem_euclid(16) as usize]
}

/// Cloud cover fraction to eighths, rounding half away from zero.
/// Callers must pass a fraction already checked against `CLOUD_COVER_RANGE`.
pub fn clouds_eighths(cloud_cover: f64) -> u8 {
    (cloud_cover * 8.0).round() as u8
}

pub fn is_suitable(wind_speed: f64, precipitation_rate: f64) -> bool {
    WIND_RANGE.contains(&wind_speed) && precipitation_rate <= MAX_PRECIPITATION
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, InputError> {
    value.ok_or(InputError::MissingField {
        record: HOURLY,
        field,
    })
}

/// Convert one hourly record into a sample and compute its verdict.
pub fn evaluate(record: &HourlyRecord) -> Result<ForecastSample, InputError> {
    let timestamp = require(record.time, "time")?;
    let time =
        DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or(InputError::InvalidTimestamp {
            record: HOURLY,
            field: "time",
            value: timestamp,
        })?;

    let wind_speed = require(record.wind_speed, "windSpeed")?;
    let precipitation_rate = require(record.precip_intensity, "precipIntensity")?;

    // NaN fails the range check as well
    let cloud_cover = require(record.cloud_cover, "cloudCover")?;
    if !CLOUD_COVER_RANGE.contains(&cloud_cover) {
        return Err(InputError::OutOfRange {
            record: HOURLY,
            field: "cloudCover",
            value: cloud_cover,
        });
    }

    Ok(ForecastSample {
        time,
        clouds_eighths: clouds_eighths(cloud_cover),
        wind_speed,
        wind_bearing_label: bearing_label(require(record.wind_bearing, "windBearing")?),
        precipitation_rate,
        temperature: require(record.temperature, "temperature")?,
        is_suitable: is_suitable(wind_speed, precipitation_rate),
    })
}

/// Evaluate every hourly record, failing on the first malformed one.
pub fn evaluate_all(records: &[HourlyRecord]) -> Result<Vec<ForecastSample>, InputError> {
    records.iter().map(evaluate).collect()
}
