//! Core library for Sunny Weather.
//!
//! This crate defines:
//! - Shared domain models (places, realtime conditions, daily forecast)
//! - Abstraction over the upstream place-search and weather endpoints
//! - Fetchers that turn upstream replies into a single result
//! - A latest-wins result channel for consumers
//! - Persistence of the last selected place and configuration handling
//!
//! It is used by `sunny-cli`, but can also be reused by other front-ends.

pub mod channel;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod provider;
pub mod sky;
pub mod store;

pub use channel::{Emission, ResultChannel};
pub use config::{ApiConfig, Config, StorageConfig};
pub use error::{Endpoint, ErrorKind, FetchError, StoreError};
pub use fetch::{SearchFetcher, WeatherFetcher};
pub use model::{
    AirQuality, DailyForecastEntry, FetchResult, LifeIndex, Location, Place, RealtimeConditions,
    TemperatureRange, Weather,
};
pub use provider::{Reply, WeatherProvider, caiyun::CaiyunProvider, provider_from_config};
pub use sky::Sky;
pub use store::PlaceStore;
