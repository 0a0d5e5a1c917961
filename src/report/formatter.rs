use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::{Location, Recipient};
use crate::forecast::evaluator::{MAX_PRECIPITATION, WIND_RANGE};
use crate::forecast::{DailyWindow, ForecastSample};
use crate::mail::EmailMessage;

pub const SENDER_NAME: &str = "Groundhandling Forecast";

const WIND_UNIT: &str = "km/h";
const TEMP_UNIT: &str = "°C";
const PRECIPITATION_UNIT: &str = "mm/h";

/// Rendered report for one recipient
#[derive(Debug, Clone)]
pub struct Report {
    pub lines: Vec<String>,
    pub message: EmailMessage,
}

/// Builds the German plaintext mail
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    admin_email: String,
    timezone: Tz,
}

/// One fixed-width line per suitable hour, e.g.
/// `12:00: WSW 18 km/h | 21.3°C | 3/8 | 0.05 mm/h`
pub fn format_line(sample: &ForecastSample, timezone: Tz) -> String {
    let time = sample.time.with_timezone(&timezone).format("%H:%M");
    let wind = format!(
        "{:>3} {:>2} {}",
        sample.wind_bearing_label,
        sample.wind_speed.round() as i64,
        WIND_UNIT
    );
    let temperature = format!("{:>4.1}{}", sample.temperature, TEMP_UNIT);
    let clouds = format!("{}/8", sample.clouds_eighths);
    let precipitation = format!("{:.2} {}", sample.precipitation_rate, PRECIPITATION_UNIT);

    format!(
        "{}: {}",
        time,
        [wind, temperature, clouds, precipitation].join(" | ")
    )
}

impl ReportFormatter {
    pub fn new(admin_email: impl Into<String>, timezone: Tz) -> Self {
        Self {
            admin_email: admin_email.into(),
            timezone,
        }
    }

    fn local(&self, time: DateTime<Utc>, pattern: &str) -> String {
        time.with_timezone(&self.timezone).format(pattern).to_string()
    }

    /// Render the suitable samples into a complete message for `recipient`
    pub fn format_report(
        &self,
        location: &Location,
        recipient: &Recipient,
        window: &DailyWindow,
        samples: &[ForecastSample],
    ) -> Report {
        let lines: Vec<String> = samples
            .iter()
            .filter(|sample| sample.is_suitable)
            .map(|sample| format_line(sample, self.timezone))
            .collect();

        let date = self.local(window.start, "%d.%m.%Y");
        let position = format!("{},{}", location.lat, location.long);

        let body = format!(
            "Hallo {name},

Lust auf Groundhandling in \"{location}\"? Das heutige Wetter am {date} könnte zu den folgenden Uhrzeiten geeignet sein:

{lines}

{notice}
Windy: https://www.windy.com/?{position},11
Air: https://www.meteoblue.com/de/wetter/vorhersage/air/{position}

Die Vorhersage basiert auf diesen Bedingungen:
- Wind: {wind_min} – {wind_max} km/h
- max. Niederschlag: {max_precipitation} mm/h
- Zeitraum: {start} – {end}
- Position: {position}

Meteo-Quelle: https://darksky.net

Zitat des Tages: „Das Wetter wird auf dem Platz gemacht!“ – irgendein Fluglehrer

Dein Groundhandling Forecast Team

Diese Email wurde automatisch generiert. Bei Fragen/Anregungen/Beschwerden: Email an {admin}
",
            name = recipient.name,
            location = location.name,
            date = date,
            lines = lines.join("\n"),
            notice = location.notice.trim_end_matches(['\r', '\n']),
            position = position,
            wind_min = WIND_RANGE.start(),
            wind_max = WIND_RANGE.end(),
            max_precipitation = MAX_PRECIPITATION,
            start = self.local(window.start, "%H:%M"),
            end = self.local(window.end, "%H:%M"),
            admin = self.admin_email,
        );

        let message = EmailMessage {
            to: recipient.email.clone(),
            from_name: SENDER_NAME.to_string(),
            from_address: self.admin_email.clone(),
            subject: format!("Groundhandling am {}?", date),
            body,
        };

        Report { lines, message }
    }
}
