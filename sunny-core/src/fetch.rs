//! Turns provider replies into [`FetchResult`]s.
//!
//! Both fetchers hold the shared provider behind an `Arc`, so cloning one to
//! move into a spawned task is cheap.

use std::sync::Arc;

use crate::{
    error::{Endpoint, FetchError},
    model::{DailyForecastEntry, FetchResult, Location, Place, RealtimeConditions, Weather},
    provider::{Reply, WeatherProvider},
};

#[derive(Debug, Clone)]
pub struct SearchFetcher {
    provider: Arc<dyn WeatherProvider>,
}

impl SearchFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Search places by name. Callers are expected not to send empty queries.
    pub async fn search(&self, query: &str) -> FetchResult<Vec<Place>> {
        let reply = match self.provider.search_places(query).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(query, error = %err, "place search failed");
                return Err(err);
            }
        };

        if !reply.is_ok() {
            return Err(FetchError::Status {
                endpoint: Endpoint::Search,
                status: reply.status,
            });
        }

        let places = require_payload(Endpoint::Search, reply.payload)?;
        tracing::debug!(query, count = places.len(), "place search finished");

        Ok(places)
    }
}

/// Fetches realtime conditions and the daily forecast together.
#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Both requests are in flight at once and both are awaited to completion,
    /// whatever the other one returned.
    pub async fn refresh(&self, location: &Location) -> FetchResult<Weather> {
        let realtime = self.provider.realtime(location);
        let daily = self.provider.daily(location);
        let (realtime, daily) = tokio::join!(realtime, daily);

        let weather = combine(realtime, daily);
        match &weather {
            Ok(_) => tracing::debug!(%location, "weather refreshed"),
            Err(err) => tracing::warn!(%location, error = %err, "weather refresh failed"),
        }

        weather
    }
}

fn combine(
    realtime: Result<Reply<RealtimeConditions>, FetchError>,
    daily: Result<Reply<Vec<DailyForecastEntry>>, FetchError>,
) -> FetchResult<Weather> {
    match (realtime, daily) {
        (Ok(realtime), Ok(daily)) => {
            if !realtime.is_ok() || !daily.is_ok() {
                return Err(FetchError::WeatherStatus {
                    realtime: realtime.status,
                    daily: daily.status,
                });
            }

            let realtime = require_payload(Endpoint::Realtime, realtime.payload);
            let daily = require_payload(Endpoint::Daily, daily.payload);
            match (realtime, daily) {
                (Ok(realtime), Ok(daily)) => Ok(Weather { realtime, daily }),
                (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
                (Err(a), Err(b)) => Err(FetchError::Combined(vec![a, b])),
            }
        }
        (Err(err), Ok(daily)) => Err(with_sibling_status(err, Endpoint::Daily, daily)),
        (Ok(realtime), Err(err)) => Err(with_sibling_status(err, Endpoint::Realtime, realtime)),
        (Err(a), Err(b)) => Err(FetchError::Combined(vec![a, b])),
    }
}

/// One side failed outright; keep the other side's bad status in the report too.
fn with_sibling_status<T>(err: FetchError, sibling: Endpoint, reply: Reply<T>) -> FetchError {
    if reply.is_ok() {
        return err;
    }

    let status = FetchError::Status {
        endpoint: sibling,
        status: reply.status,
    };
    match sibling {
        Endpoint::Realtime => FetchError::Combined(vec![status, err]),
        _ => FetchError::Combined(vec![err, status]),
    }
}

fn require_payload<T>(endpoint: Endpoint, payload: Option<T>) -> FetchResult<T> {
    payload.ok_or_else(|| FetchError::Malformed {
        endpoint,
        reason: "status is ok but the response has no data".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        model::{AirQuality, LifeIndex, TemperatureRange},
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    type Canned<T> = Mutex<Option<Result<Reply<T>, FetchError>>>;

    /// Provider double: each endpoint answers once with a canned reply after a delay.
    #[derive(Debug, Default)]
    struct FakeProvider {
        places: Canned<Vec<Place>>,
        realtime: Canned<RealtimeConditions>,
        daily: Canned<Vec<DailyForecastEntry>>,
        realtime_delay: Duration,
        daily_delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn weather(
            realtime: Result<Reply<RealtimeConditions>, FetchError>,
            daily: Result<Reply<Vec<DailyForecastEntry>>, FetchError>,
        ) -> Self {
            Self {
                realtime: Mutex::new(Some(realtime)),
                daily: Mutex::new(Some(daily)),
                ..Self::default()
            }
        }

        fn take<T>(slot: &Canned<T>) -> Result<Reply<T>, FetchError> {
            slot.lock().take().expect("endpoint called more than once")
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn search_places(&self, query: &str) -> Result<Reply<Vec<Place>>, FetchError> {
            self.calls.lock().push(format!("search:{query}"));
            Self::take(&self.places)
        }

        async fn realtime(
            &self,
            location: &Location,
        ) -> Result<Reply<RealtimeConditions>, FetchError> {
            self.calls.lock().push(format!("realtime:{location}"));
            tokio::time::sleep(self.realtime_delay).await;
            Self::take(&self.realtime)
        }

        async fn daily(
            &self,
            location: &Location,
        ) -> Result<Reply<Vec<DailyForecastEntry>>, FetchError> {
            self.calls.lock().push(format!("daily:{location}"));
            tokio::time::sleep(self.daily_delay).await;
            Self::take(&self.daily)
        }
    }

    fn paris() -> Location {
        Location::new("2.35", "48.85")
    }

    fn realtime() -> RealtimeConditions {
        RealtimeConditions {
            temperature: 17.5,
            sky_condition: "PARTLY_CLOUDY_DAY".into(),
            air_quality: AirQuality { aqi_china: 42.0 },
        }
    }

    fn daily() -> Vec<DailyForecastEntry> {
        vec![DailyForecastEntry {
            date: "2024-05-01T00:00+02:00".into(),
            sky_condition: "LIGHT_RAIN".into(),
            temperature: TemperatureRange {
                min: 11.0,
                max: 19.0,
            },
            life_index: LifeIndex {
                cold_risk: Some("Low".into()),
                dressing: Some("Light jacket".into()),
                ultraviolet: Some("Weak".into()),
                car_washing: Some("Not advised".into()),
            },
        }]
    }

    fn decode_error(endpoint: Endpoint) -> FetchError {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        FetchError::Decode { endpoint, source }
    }

    async fn refresh(provider: FakeProvider) -> FetchResult<Weather> {
        let fetcher = WeatherFetcher::new(Arc::new(provider));
        fetcher.refresh(&paris()).await
    }

    async fn refresh_replies(
        realtime: Result<Reply<RealtimeConditions>, FetchError>,
        daily: Result<Reply<Vec<DailyForecastEntry>>, FetchError>,
    ) -> FetchResult<Weather> {
        refresh(FakeProvider::weather(realtime, daily)).await
    }

    #[tokio::test]
    async fn both_ok_mirrors_both_payloads() {
        let realtime_reply = Ok(Reply::ok(realtime()));
        let daily_reply = Ok(Reply::ok(daily()));

        let weather = refresh_replies(realtime_reply, daily_reply)
            .await
            .expect("weather");

        assert_eq!(weather.realtime, realtime());
        assert_eq!(weather.daily, daily());
    }

    #[tokio::test]
    async fn realtime_status_error_names_both_statuses() {
        let realtime = Ok(Reply::with_status("error"));
        let daily = Ok(Reply::ok(daily()));

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("realtime response status is error"), "{msg}");
        assert!(msg.contains("daily response status is ok"), "{msg}");
        assert_eq!(err.kind(), ErrorKind::ProviderStatus);
    }

    #[tokio::test]
    async fn both_statuses_bad_are_both_reported() {
        let realtime = Ok(Reply::with_status("failed"));
        let daily = Ok(Reply::with_status("invalid"));

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("failed"), "{msg}");
        assert!(msg.contains("invalid"), "{msg}");
    }

    #[tokio::test]
    async fn realtime_exception_fails_the_whole_fetch() {
        let realtime = Err(decode_error(Endpoint::Realtime));
        let daily = Ok(Reply::ok(daily()));

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.endpoints(), vec![Endpoint::Realtime]);
        let message = err.to_string();
        assert!(message.contains("failed to decode realtime response"));
    }

    #[tokio::test]
    async fn transport_failure_on_one_side_fails_the_fetch() {
        let realtime = Ok(Reply::ok(realtime()));
        let daily = Err(FetchError::HttpStatus {
            endpoint: Endpoint::Daily,
            status: 502,
            body: "bad gateway".into(),
        });

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.endpoints(), vec![Endpoint::Daily]);
        assert!(err.to_string().contains("HTTP 502"), "{err}");
    }

    #[tokio::test]
    async fn exception_plus_bad_status_reports_both_sides() {
        let realtime = Ok(Reply::with_status("error"));
        let daily = Err(decode_error(Endpoint::Daily));

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        assert_eq!(err.endpoints(), vec![Endpoint::Realtime, Endpoint::Daily]);
        let msg = err.to_string();
        assert!(msg.contains("realtime response status is error"), "{msg}");
        assert!(msg.contains("failed to decode daily response"), "{msg}");
    }

    #[tokio::test]
    async fn two_exceptions_are_combined() {
        let realtime = Err(decode_error(Endpoint::Realtime));
        let daily = Err(decode_error(Endpoint::Daily));

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        assert!(matches!(err, FetchError::Combined(ref causes) if causes.len() == 2));
        assert_eq!(err.endpoints(), vec![Endpoint::Realtime, Endpoint::Daily]);
    }

    #[tokio::test]
    async fn ok_status_without_payload_is_malformed() {
        let realtime = Ok(Reply {
            status: "ok".into(),
            payload: None,
        });
        let daily = Ok(Reply::ok(daily()));

        let err = refresh_replies(realtime, daily).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.endpoints(), vec![Endpoint::Realtime]);
        assert!(err.to_string().starts_with("malformed realtime response"));
    }

    #[tokio::test]
    async fn failing_side_does_not_cut_the_other_short() {
        let realtime = Err(decode_error(Endpoint::Realtime));
        let provider = Arc::new(FakeProvider {
            daily_delay: Duration::from_millis(50),
            ..FakeProvider::weather(realtime, Ok(Reply::ok(daily())))
        });

        let fetcher = WeatherFetcher::new(provider.clone());
        assert!(fetcher.refresh(&paris()).await.is_err());
        // The daily reply was consumed, so that call ran to completion.
        assert!(provider.daily.lock().is_none());
    }

    #[tokio::test]
    async fn requests_run_concurrently() {
        let provider = FakeProvider {
            realtime_delay: Duration::from_millis(100),
            daily_delay: Duration::from_millis(150),
            ..FakeProvider::weather(Ok(Reply::ok(realtime())), Ok(Reply::ok(daily())))
        };

        let started = Instant::now();
        refresh(provider).await.expect("weather");
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(150), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(240), "{elapsed:?}");
    }

    #[tokio::test]
    async fn search_ok_returns_places() {
        let place = Place {
            name: "Paris".into(),
            location: paris(),
            address: "Paris, France".into(),
        };
        let provider = Arc::new(FakeProvider {
            places: Mutex::new(Some(Ok(Reply::ok(vec![place.clone()])))),
            ..FakeProvider::default()
        });

        let fetcher = SearchFetcher::new(provider.clone());
        let places = fetcher.search("Paris").await.expect("places");

        assert_eq!(places, vec![place]);
        assert_eq!(*provider.calls.lock(), vec!["search:Paris".to_string()]);
    }

    #[tokio::test]
    async fn search_status_error_carries_status() {
        let provider = FakeProvider {
            places: Mutex::new(Some(Ok(Reply::with_status("invalid_token")))),
            ..FakeProvider::default()
        };

        let fetcher = SearchFetcher::new(Arc::new(provider));
        let err = fetcher.search("Paris").await.unwrap_err();

        assert_eq!(err.to_string(), "search response status is invalid_token");
    }

    #[tokio::test]
    async fn search_exception_becomes_failure() {
        let provider = FakeProvider {
            places: Mutex::new(Some(Err(decode_error(Endpoint::Search)))),
            ..FakeProvider::default()
        };

        let fetcher = SearchFetcher::new(Arc::new(provider));
        let err = fetcher.search("Paris").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
