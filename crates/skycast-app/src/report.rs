//! Plain-text rendering of a ready weather state.

use std::fmt::Display;

use chrono::TimeZone;
use skycast_weather::{CurrentWeather, Summary};

/// Temperatures are shown rounded up to whole degrees
pub fn whole_degrees(celsius: f64) -> i64 {
    celsius.ceil() as i64
}

/// Render current conditions and the midday summary, with slot times in `tz`.
pub fn render<Tz>(current: &CurrentWeather, summary: &Summary, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let name = if current.location_name.is_empty() {
        "Unknown location"
    } else {
        current.location_name.as_str()
    };

    let mut lines = vec![
        name.to_string(),
        format!(
            "  now  {}°C  {} (feels like {}°C, humidity {}%)",
            whole_degrees(current.metrics.temp),
            current.condition.description(),
            whole_degrees(current.metrics.feels_like),
            current.metrics.humidity.round()
        ),
    ];

    if summary.is_empty() {
        lines.push("  no midday forecast available".to_string());
    }
    lines.extend(summary.iter().map(|entry| {
        let local = entry.timestamp.with_timezone(tz);
        format!(
            "  {}  {}°C  {}",
            local.format("%a %d %b %H:00"),
            whole_degrees(entry.metrics.temp),
            entry.condition.description()
        )
    }));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use skycast_weather::{ConditionCode, ForecastEntry, MainMetrics};

    fn metrics(temp: f64) -> MainMetrics {
        MainMetrics {
            temp,
            feels_like: temp - 2.0,
            temp_min: temp,
            temp_max: temp,
            pressure: 1000.0,
            humidity: 64.0,
            sea_level: None,
            ground_level: None,
        }
    }

    #[test]
    fn test_whole_degrees_rounds_up() {
        assert_eq!(whole_degrees(4.1), 5);
        assert_eq!(whole_degrees(4.0), 4);
        assert_eq!(whole_degrees(-0.4), 0);
        assert_eq!(whole_degrees(-3.7), -3);
    }

    #[test]
    fn test_render() {
        let current = CurrentWeather {
            location_name: "Warsaw".into(),
            metrics: metrics(3.2),
            condition: ConditionCode::Rain,
        };
        let summary = Summary {
            upcoming: vec![ForecastEntry {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 11, 12, 0, 0).unwrap(),
                metrics: metrics(6.5),
                condition: ConditionCode::Clear,
            }],
            reference_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        };

        let text = render(&current, &summary, &Utc);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Warsaw");
        assert!(lines[1].contains("4°C"));
        assert!(lines[2].contains("Thu 11 Jan 12:00"));
        assert!(lines[2].contains("7°C"));
        assert_eq!(lines.len(), 3);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_render_empty_summary() {
        let current = CurrentWeather {
            location_name: String::new(),
            metrics: metrics(0.0),
            condition: ConditionCode::Other,
        };
        let summary = Summary {
            upcoming: vec![],
            reference_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        };
        let text = render(&current, &summary, &Utc);
        assert!(text.starts_with("Unknown location"));
        assert!(text.contains("no midday forecast"));
    }
}
