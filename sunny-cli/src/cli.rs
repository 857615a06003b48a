use std::{fmt, future::Future, sync::Arc, time::Duration};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};
use sunny_core::{
    Config, Emission, Location, Place, PlaceStore, ResultChannel, SearchFetcher, StoreError,
    Weather, WeatherFetcher, provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "sunny", version, about = "Sunny Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API token used for all requests.
    Configure {
        /// Point at a different API host, e.g. a staging endpoint.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Search places by name.
    Search {
        query: String,

        /// Pick one of the results and remember it.
        #[arg(long)]
        select: bool,
    },

    /// Print the remembered place.
    Place,

    /// Show current conditions and the forecast.
    Show {
        /// Longitude; defaults to the remembered place.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<String>,

        /// Latitude; defaults to the remembered place.
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<String>,

        /// Print the weather as JSON.
        #[arg(long)]
        json: bool,

        /// Keep refreshing every SECS seconds.
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure { base_url } => configure(config, base_url),
            Command::Search { query, select } => search(&config, query, select).await,
            Command::Place => {
                let place = place_store(&config)?.load().map_err(hint_no_place)?;
                println!("{}", render::place_line(&place));
                Ok(())
            }
            Command::Show {
                lng,
                lat,
                json,
                every,
            } => {
                let target = Target::resolve(&config, lng, lat)?;
                show(&config, target, json, every).await
            }
        }
    }
}

fn configure(mut config: Config, base_url: Option<String>) -> anyhow::Result<()> {
    let token = Password::new("Caiyun API token:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API token")?;

    if token.trim().is_empty() {
        bail!("API token must not be empty");
    }

    config.set_api_token(token.trim().to_string());

    if let Some(base_url) = base_url {
        config.api.base_url = base_url;
    } else {
        let base_url = Text::new("API base URL:")
            .with_default(&config.api.base_url)
            .prompt()
            .context("Failed to read API base URL")?;
        config.api.base_url = base_url;
    }

    config.save()?;
    let path = Config::config_file_path()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

fn place_store(config: &Config) -> anyhow::Result<PlaceStore> {
    Ok(PlaceStore::new(config.place_store_path()?))
}

fn hint_no_place(err: StoreError) -> anyhow::Error {
    match err {
        StoreError::NotFound => anyhow!(
            "No place selected yet.\n\
             Hint: run `sunny search <name> --select`, or pass --lng and --lat."
        ),
        other => other.into(),
    }
}

async fn search(config: &Config, query: String, select: bool) -> anyhow::Result<()> {
    let query = query.trim().to_string();
    if query.is_empty() {
        bail!("Search query must not be empty");
    }

    let fetcher = SearchFetcher::new(provider_from_config(config)?);
    let channel = ResultChannel::new();

    let generation = {
        let fetcher = fetcher.clone();
        let request = query.clone();
        channel.launch(query, async move { fetcher.search(&request).await })
    };

    let emission = settled(&channel, generation).await?;
    let places = emission.result.as_ref().map_err(|err| {
        tracing::error!(query = %emission.request, error = %err, "place search failed");
        anyhow!("Place search failed: {err}")
    })?;

    if places.is_empty() {
        println!("No places found for \"{}\".", emission.request);
        return Ok(());
    }

    if !select {
        for place in places {
            println!("{}", render::place_line(place));
        }
        return Ok(());
    }

    let options = places.iter().cloned().map(PlaceOption).collect();
    let PlaceOption(chosen) = Select::new("Pick a place:", options)
        .prompt()
        .context("No place selected")?;

    place_store(config)?.save(&chosen)?;
    println!("Selected {}", render::place_line(&chosen));

    Ok(())
}

/// Where to fetch weather for, with a display name when it came from the store.
struct Target {
    name: Option<String>,
    location: Location,
}

impl Target {
    /// Explicit coordinates win; otherwise fall back to the remembered place.
    fn resolve(config: &Config, lng: Option<String>, lat: Option<String>) -> anyhow::Result<Self> {
        if let (Some(lng), Some(lat)) = (lng, lat) {
            return Ok(Self {
                name: None,
                location: Location::new(lng, lat),
            });
        }

        let place = place_store(config)?.load().map_err(hint_no_place)?;
        Ok(Self {
            name: Some(place.name),
            location: place.location,
        })
    }

    fn title(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.location.to_string(),
        }
    }
}

async fn show(
    config: &Config,
    target: Target,
    json: bool,
    every: Option<u64>,
) -> anyhow::Result<()> {
    let fetcher = WeatherFetcher::new(provider_from_config(config)?);
    let channel: ResultChannel<Location, Weather> = ResultChannel::new();

    let launch = || {
        let fetcher = fetcher.clone();
        let location = target.location.clone();
        let request = location.clone();
        channel.launch(request, async move { fetcher.refresh(&location).await })
    };

    let Some(secs) = every else {
        let emission = settled(&channel, launch()).await?;
        return print_weather(&target, &emission, json);
    };

    let period = Duration::from_secs(secs.max(1));
    let report = |emission: &Emission<Location, Weather>| {
        let now = chrono::Local::now();
        println!("-- refreshed at {} --", now.format("%H:%M:%S"));
        // A failed refresh is reported; the next tick tries again.
        if let Err(err) = print_weather(&target, emission, json) {
            eprintln!("{err:#}");
        }
    };

    refresh_every(&channel, period, launch, report, tokio::signal::ctrl_c()).await
}

/// Launch a fetch on every tick and report what it settles to, until `stop`
/// resolves. A stop that arrives mid-fetch cancels that fetch.
async fn refresh_every<P, T>(
    channel: &ResultChannel<P, T>,
    period: Duration,
    launch: impl Fn() -> u64,
    mut report: impl FnMut(&Emission<P, T>),
    stop: impl Future,
) -> anyhow::Result<()>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    tokio::pin!(stop);
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop => break,
        }

        let generation = launch();
        tokio::select! {
            emission = settled(channel, generation) => {
                let emission = emission?;
                report(emission.as_ref());
            }
            _ = &mut stop => break,
        }
    }

    channel.cancel();
    Ok(())
}

async fn settled<P, T>(
    channel: &ResultChannel<P, T>,
    generation: u64,
) -> anyhow::Result<Arc<Emission<P, T>>>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    channel
        .wait_for(generation)
        .await
        .ok_or_else(|| anyhow!("Request was cancelled before it completed"))
}

fn print_weather(
    target: &Target,
    emission: &Emission<Location, Weather>,
    json: bool,
) -> anyhow::Result<()> {
    let weather = emission.result.as_ref().map_err(|err| {
        tracing::error!(location = %emission.request, error = %err, "weather refresh failed");
        anyhow!("Could not load weather: {err}")
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(weather)?);
    } else {
        print!("{}", render::weather(&target.title(), weather));
    }

    Ok(())
}

struct PlaceOption(Place);

impl fmt::Display for PlaceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::place_line(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, time::Instant};

    #[tokio::test]
    async fn stop_during_a_fetch_ends_the_loop() {
        let channel: ResultChannel<u32, ()> = ResultChannel::new();
        let launch = || {
            let slow = async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            };
            channel.launch(1, slow)
        };
        let reports = Cell::new(0);
        let report = |_: &Emission<u32, ()>| reports.set(reports.get() + 1);
        let stop = tokio::time::sleep(Duration::from_millis(50));
        let period = Duration::from_secs(1);

        let started = Instant::now();
        refresh_every(&channel, period, launch, report, stop)
            .await
            .expect("loop ends cleanly");

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(reports.get(), 0);
        assert!(channel.latest().is_none());
    }

    #[tokio::test]
    async fn every_tick_reports_its_emission() {
        let channel: ResultChannel<u32, u32> = ResultChannel::new();
        let launch = || channel.launch(7, async { Ok(42) });
        let seen = Cell::new(0);
        let report = |emission: &Emission<u32, u32>| {
            assert_eq!(emission.request, 7);
            assert_eq!(*emission.result.as_ref().expect("ok"), 42);
            seen.set(seen.get() + 1);
        };
        let stop = tokio::time::sleep(Duration::from_millis(130));
        let period = Duration::from_millis(40);

        refresh_every(&channel, period, launch, report, stop)
            .await
            .expect("loop ends cleanly");

        assert!(seen.get() >= 2, "saw {} reports", seen.get());
    }
}
