use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Provider Response (Internal)
// Only the fields the evaluator and window selector read are modelled; the
// full payload is kept verbatim in `TaggedForecast::document`.
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub hourly: DataBlock<HourlyRecord>,
    pub daily: DataBlock<DailyRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataBlock<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// One hourly data point. Fields are optional at decode time so a missing
/// value surfaces as an `InputError` naming the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyRecord {
    pub time: Option<i64>,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_bearing: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub precip_intensity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub sunrise_time: Option<i64>,
    pub sunset_time: Option<i64>,
}

/// Audit metadata merged into the archived document under `_request`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestTag {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub api_key: String,
    pub url: String,
}

/// A fetched forecast: the verbatim tagged document plus its typed view.
#[derive(Debug, Clone)]
pub struct TaggedForecast {
    pub document: serde_json::Value,
    pub data: ForecastResponse,
}

impl TaggedForecast {
    /// Decode the typed view from a raw document, then attach the request tag.
    /// The tag lives under its own key and never touches `hourly` or `daily`.
    pub fn from_document(
        mut document: serde_json::Value,
        tag: &RequestTag,
    ) -> Result<Self, InputError> {
        let data: ForecastResponse = serde_json::from_value(document.clone())?;

        let object = document.as_object_mut().ok_or(InputError::NotAnObject)?;
        object.insert("_request".to_string(), serde_json::to_value(tag)?);

        Ok(Self { document, data })
    }
}

// ============================================================================
// Domain Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized view of one hour
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    pub time: DateTime<Utc>,
    pub clouds_eighths: u8,
    pub wind_speed: f64,
    pub wind_bearing_label: &'static str,
    pub precipitation_rate: f64,
    pub temperature: f64,
    pub is_suitable: bool,
}

/// Evaluation window for one calendar day, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DailyWindow {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Missing field `{field}` in {record} record")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("Field `{field}` in {record} record is out of range: {value}")]
    OutOfRange {
        record: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error("Field `{field}` in {record} record is not a valid timestamp: {value}")]
    InvalidTimestamp {
        record: &'static str,
        field: &'static str,
        value: i64,
    },

    #[error("Malformed forecast payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Forecast payload is not a JSON object")]
    NotAnObject,

    #[error("Forecast contains no daily record")]
    NoDailyRecord,

    #[error("Local time {0} does not exist in the configured timezone")]
    InvalidLocalTime(String),
}
