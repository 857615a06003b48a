use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    config::ApiConfig,
    error::{Endpoint, FetchError},
    model::{
        AirQuality, DailyForecastEntry, LifeIndex, Location, Place, RealtimeConditions,
        TemperatureRange,
    },
};

use super::{Reply, STATUS_OK, WeatherProvider};

/// Client for the Caiyun place-search and weather endpoints.
#[derive(Debug, Clone)]
pub struct CaiyunProvider {
    base_url: String,
    token: String,
    lang: String,
    http: Client,
}

impl CaiyunProvider {
    pub fn new(api: &ApiConfig, token: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(api.timeout())
            .build()
            .context("Failed to build HTTP client for Caiyun")?;

        Ok(Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            lang: api.lang.clone(),
            http,
        })
    }

    fn weather_url(&self, location: &Location, resource: &str) -> String {
        format!(
            "{}/v2.5/{}/{},{}/{resource}.json",
            self.base_url, self.token, location.lng, location.lat
        )
    }

    /// Send the request and split the body into its status and the rest.
    async fn fetch_envelope(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
    ) -> Result<Envelope, FetchError> {
        tracing::debug!(%endpoint, "sending Caiyun request");

        let res = request
            .send()
            .await
            .map_err(|source| FetchError::Transport { endpoint, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| FetchError::Transport { endpoint, source })?;

        if !status.is_success() {
            tracing::warn!(%endpoint, http_status = status.as_u16(), "Caiyun request failed");
            return Err(FetchError::HttpStatus {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|source| FetchError::Decode { endpoint, source })?;

        if envelope.status != STATUS_OK {
            tracing::warn!(%endpoint, status = %envelope.status, "Caiyun reported a non-ok status");
        }

        Ok(envelope)
    }
}

/// Every Caiyun body carries a `status`; search puts its data under `places`,
/// the weather endpoints under `result`.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    places: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
}

impl Envelope {
    /// Decode `section` only when the status is `ok`; error bodies are not trusted.
    fn into_reply<R, T>(
        self,
        endpoint: Endpoint,
        section: fn(Envelope) -> Option<Value>,
        map: impl FnOnce(R) -> Result<T, String>,
    ) -> Result<Reply<T>, FetchError>
    where
        R: DeserializeOwned,
    {
        if self.status != STATUS_OK {
            return Ok(Reply::with_status(self.status));
        }

        let status = self.status.clone();
        let Some(value) = section(self) else {
            return Ok(Reply {
                status,
                payload: None,
            });
        };

        let raw: R = serde_json::from_value(value)
            .map_err(|source| FetchError::Decode { endpoint, source })?;
        let payload = map(raw).map_err(|reason| FetchError::Malformed { endpoint, reason })?;

        Ok(Reply {
            status,
            payload: Some(payload),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CyAqi {
    chn: f64,
}

#[derive(Debug, Deserialize)]
struct CyAirQuality {
    aqi: CyAqi,
}

#[derive(Debug, Deserialize)]
struct CyRealtime {
    temperature: f64,
    skycon: String,
    air_quality: CyAirQuality,
}

#[derive(Debug, Deserialize)]
struct CyRealtimeResult {
    realtime: CyRealtime,
}

impl From<CyRealtime> for RealtimeConditions {
    fn from(raw: CyRealtime) -> Self {
        Self {
            temperature: raw.temperature,
            sky_condition: raw.skycon,
            air_quality: AirQuality {
                aqi_china: raw.air_quality.aqi.chn,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CySkycon {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct CyTemperature {
    max: f64,
    min: f64,
}

#[derive(Debug, Deserialize)]
struct CyLifeDesc {
    desc: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CyLifeIndex {
    cold_risk: Vec<CyLifeDesc>,
    dressing: Vec<CyLifeDesc>,
    ultraviolet: Vec<CyLifeDesc>,
    car_washing: Vec<CyLifeDesc>,
}

#[derive(Debug, Deserialize)]
struct CyDaily {
    skycon: Vec<CySkycon>,
    temperature: Vec<CyTemperature>,
    #[serde(default)]
    life_index: CyLifeIndex,
}

#[derive(Debug, Deserialize)]
struct CyDailyResult {
    daily: CyDaily,
}

impl CyDaily {
    /// Zip the per-field arrays into one entry per day.
    fn into_entries(self) -> Result<Vec<DailyForecastEntry>, String> {
        if self.skycon.len() != self.temperature.len() {
            return Err(format!(
                "{} skycon entries but {} temperature entries",
                self.skycon.len(),
                self.temperature.len()
            ));
        }

        let desc = |list: &[CyLifeDesc], day: usize| list.get(day).map(|d| d.desc.clone());
        let life = &self.life_index;

        Ok(self
            .skycon
            .into_iter()
            .zip(self.temperature)
            .enumerate()
            .map(|(day, (sky, temp))| DailyForecastEntry {
                date: sky.date,
                sky_condition: sky.value,
                temperature: TemperatureRange {
                    min: temp.min,
                    max: temp.max,
                },
                life_index: LifeIndex {
                    cold_risk: desc(&life.cold_risk, day),
                    dressing: desc(&life.dressing, day),
                    ultraviolet: desc(&life.ultraviolet, day),
                    car_washing: desc(&life.car_washing, day),
                },
            })
            .collect())
    }
}

#[async_trait]
impl WeatherProvider for CaiyunProvider {
    async fn search_places(&self, query: &str) -> Result<Reply<Vec<Place>>, FetchError> {
        let url = format!("{}/v2/place", self.base_url);
        let params = [
            ("query", query),
            ("token", self.token.as_str()),
            ("lang", self.lang.as_str()),
        ];
        let request = self.http.get(url).query(&params);

        let envelope = self.fetch_envelope(Endpoint::Search, request).await?;
        envelope.into_reply(
            Endpoint::Search,
            |e| e.places,
            |places: Vec<Place>| Ok(places),
        )
    }

    async fn realtime(&self, location: &Location) -> Result<Reply<RealtimeConditions>, FetchError> {
        let request = self.http.get(self.weather_url(location, "realtime"));

        let envelope = self.fetch_envelope(Endpoint::Realtime, request).await?;
        envelope.into_reply(
            Endpoint::Realtime,
            |e| e.result,
            |raw: CyRealtimeResult| Ok(RealtimeConditions::from(raw.realtime)),
        )
    }

    async fn daily(
        &self,
        location: &Location,
    ) -> Result<Reply<Vec<DailyForecastEntry>>, FetchError> {
        let request = self.http.get(self.weather_url(location, "daily"));

        let envelope = self.fetch_envelope(Endpoint::Daily, request).await?;
        envelope.into_reply(
            Endpoint::Daily,
            |e| e.result,
            |raw: CyDailyResult| raw.daily.into_entries(),
        )
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
