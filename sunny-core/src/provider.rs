use crate::{
    Config,
    error::FetchError,
    model::{DailyForecastEntry, Location, Place, RealtimeConditions},
    provider::caiyun::CaiyunProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod caiyun;

/// Status value the upstream uses to signal success.
pub const STATUS_OK: &str = "ok";

/// What an endpoint answered: its business status, plus the payload when it had one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: String,
    pub payload: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            payload: Some(payload),
        }
    }

    /// A reply with the given status and no payload.
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            payload: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Upstream place-search and weather endpoints.
///
/// Implementations report transport and decoding problems as `Err`; a provider
/// status other than `ok` is returned as a normal [`Reply`] for the caller to judge.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn search_places(&self, query: &str) -> Result<Reply<Vec<Place>>, FetchError>;

    async fn realtime(&self, location: &Location) -> Result<Reply<RealtimeConditions>, FetchError>;

    async fn daily(
        &self,
        location: &Location,
    ) -> Result<Reply<Vec<DailyForecastEntry>>, FetchError>;
}

/// Construct the shared provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let token = config.api_token()?;
    let provider = CaiyunProvider::new(&config.api, token)?;

    Ok(Arc::new(provider))
}
