use std::fmt::Write;

use sunny_core::{DailyForecastEntry, Place, Weather};

pub fn place_line(place: &Place) -> String {
    format!("{} ({}) [{}]", place.name, place.address, place.location)
}

/// Multi-line report: current conditions, the daily list, today's advice.
pub fn weather(title: &str, weather: &Weather) -> String {
    let mut out = String::new();
    let now = &weather.realtime;

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{title}");
    let _ = writeln!(
        out,
        "  Now: {} °C, {}, AQI {}",
        now.temperature.round() as i64,
        now.sky(),
        now.air_quality.aqi_china.round() as i64
    );

    if !weather.daily.is_empty() {
        let _ = writeln!(out, "\nForecast");
        for day in &weather.daily {
            let _ = writeln!(out, "  {}", day_line(day));
        }
    }

    if let Some(today) = weather.today() {
        let advice = &today.life_index;
        let rows = [
            ("Cold risk", &advice.cold_risk),
            ("Dressing", &advice.dressing),
            ("UV", &advice.ultraviolet),
            ("Car washing", &advice.car_washing),
        ];

        let present: Vec<_> = rows
            .iter()
            .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
            .collect();

        if !present.is_empty() {
            let _ = writeln!(out, "\nToday");
            for (label, value) in present {
                let _ = writeln!(out, "  {label:<12}{value}");
            }
        }
    }

    out
}

fn day_line(day: &DailyForecastEntry) -> String {
    let date = day
        .day()
        .map(|d| d.format("%a %Y-%m-%d").to_string())
        .unwrap_or_else(|| day.date.clone());

    format!(
        "{date:<15} {:<16} {} ~ {} °C",
        day.sky().description(),
        day.temperature.min.round() as i64,
        day.temperature.max.round() as i64
    )
}
