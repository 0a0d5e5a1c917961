use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::models::{DailyRecord, DailyWindow, ForecastSample, InputError};

const DAILY: &str = "daily";

/// Intersects fixed wall-clock bounds with the day's sunrise and sunset
#[derive(Debug, Clone)]
pub struct WindowSelector {
    timezone: Tz,
    fixed_start: NaiveTime,
    fixed_stop: NaiveTime,
}

impl WindowSelector {
    pub fn new(timezone: Tz, fixed_start: NaiveTime, fixed_stop: NaiveTime) -> Self {
        Self {
            timezone,
            fixed_start,
            fixed_stop,
        }
    }

    /// 09:00 to 22:00 local time
    pub fn with_default_bounds(timezone: Tz) -> Self {
        Self::new(
            timezone,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        )
    }

    fn local_instant(&self, day: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, InputError> {
        let naive = day.and_time(time);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| InputError::InvalidLocalTime(naive.to_string()))
    }

    /// Window for `day` from the first daily record; later days are ignored.
    pub fn select_window(
        &self,
        day: NaiveDate,
        daily: &[DailyRecord],
    ) -> Result<DailyWindow, InputError> {
        let today = daily.first().ok_or(InputError::NoDailyRecord)?;

        let sunrise = solar_instant(today.sunrise_time, "sunriseTime")?;
        let sunset = solar_instant(today.sunset_time, "sunsetTime")?;

        let start = self.local_instant(day, self.fixed_start)?.max(sunrise);
        let end = self.local_instant(day, self.fixed_stop)?.min(sunset);

        tracing::debug!(start = %start, end = %end, "Selected daily window");

        Ok(DailyWindow { start, end })
    }
}

fn solar_instant(value: Option<i64>, field: &'static str) -> Result<DateTime<Utc>, InputError> {
    let ts = value.ok_or(InputError::MissingField {
        record: DAILY,
        field,
    })?;
    DateTime::<Utc>::from_timestamp(ts, 0).ok_or(InputError::InvalidTimestamp {
        record: DAILY,
        field,
        value: ts,
    })
}

/// Keep samples whose time falls inside the window, bounds included.
pub fn filter_to_window(samples: Vec<ForecastSample>, window: &DailyWindow) -> Vec<ForecastSample> {
    samples
        .into_iter()
        .filter(|sample| window.contains(sample.time))
        .collect()
}
