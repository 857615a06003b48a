use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::{error::FetchError, sky::Sky};

/// Outcome of a single search or weather fetch.
pub type FetchResult<T> = Result<T, FetchError>;

/// Coordinate pair, kept as decimal strings.
///
/// Upstream sends coordinates either as strings or as JSON numbers; both
/// decode to the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(deserialize_with = "coordinate")]
    pub lng: String,
    #[serde(deserialize_with = "coordinate")]
    pub lat: String,
}

impl Location {
    pub fn new(lng: impl Into<String>, lat: impl Into<String>) -> Self {
        Self {
            lng: lng.into(),
            lat: lat.into(),
        }
    }
}

fn coordinate<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(de::Error::custom(format!("invalid coordinate {other}"))),
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub location: Location,
    #[serde(rename = "formatted_address")]
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub aqi_china: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConditions {
    pub temperature: f64,
    /// Upstream sky code, e.g. `PARTLY_CLOUDY_DAY`.
    pub sky_condition: String,
    pub air_quality: AirQuality,
}

impl RealtimeConditions {
    pub fn sky(&self) -> Sky {
        Sky::from_code(&self.sky_condition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

/// Life-index advisories for one day. Upstream lists can be shorter than the
/// forecast, so each entry is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeIndex {
    pub cold_risk: Option<String>,
    pub dressing: Option<String>,
    pub ultraviolet: Option<String>,
    pub car_washing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    /// Date as sent upstream, e.g. `2024-05-01T00:00+08:00`.
    pub date: String,
    pub sky_condition: String,
    pub temperature: TemperatureRange,
    pub life_index: LifeIndex,
}

impl DailyForecastEntry {
    /// Calendar day of this entry, if the upstream date starts with `YYYY-MM-DD`.
    pub fn day(&self) -> Option<NaiveDate> {
        let prefix = self.date.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }

    pub fn sky(&self) -> Sky {
        Sky::from_code(&self.sky_condition)
    }
}

/// Current conditions plus the daily forecast for one location.
///
/// Only built when both upstream calls succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub realtime: RealtimeConditions,
    pub daily: Vec<DailyForecastEntry>,
}

impl Weather {
    pub fn today(&self) -> Option<&DailyForecastEntry> {
        self.daily.first()
    }
}
