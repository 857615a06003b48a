use std::path::PathBuf;

use thiserror::Error;

/// Which upstream endpoint a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Realtime,
    Daily,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Search => "search",
            Endpoint::Realtime => "realtime",
            Endpoint::Daily => "daily",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad classes of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport succeeded, but the provider reported a non-`ok` status.
    ProviderStatus,
    /// Network failure, timeout or non-2xx response.
    Transport,
    /// Body missing or not matching the expected schema.
    Decode,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint} response status is {status}")]
    Status { endpoint: Endpoint, status: String },

    #[error("realtime response status is {realtime}, daily response status is {daily}")]
    WeatherStatus { realtime: String, daily: String },

    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} request failed with HTTP {status}: {body}")]
    HttpStatus {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {endpoint} response: {reason}")]
    Malformed { endpoint: Endpoint, reason: String },

    #[error("{}", join_messages(.0))]
    Combined(Vec<FetchError>),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Status { .. } | FetchError::WeatherStatus { .. } => {
                ErrorKind::ProviderStatus
            }
            FetchError::Transport { .. } | FetchError::HttpStatus { .. } => ErrorKind::Transport,
            FetchError::Decode { .. } | FetchError::Malformed { .. } => ErrorKind::Decode,
            // A combined failure always carries at least one cause; report the first.
            FetchError::Combined(causes) => causes.first().map_or(ErrorKind::Transport, Self::kind),
        }
    }

    /// Endpoints named by this failure, in report order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        match self {
            FetchError::Status { endpoint, .. }
            | FetchError::Transport { endpoint, .. }
            | FetchError::HttpStatus { endpoint, .. }
            | FetchError::Decode { endpoint, .. }
            | FetchError::Malformed { endpoint, .. } => vec![*endpoint],
            FetchError::WeatherStatus { .. } => vec![Endpoint::Realtime, Endpoint::Daily],
            FetchError::Combined(causes) => causes.iter().flat_map(FetchError::endpoints).collect(),
        }
    }
}

fn join_messages(causes: &[FetchError]) -> String {
    causes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no place has been saved yet")]
    NotFound,

    #[error("failed to access place store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("place store {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_status_names_both_sides() {
        let err = FetchError::WeatherStatus {
            realtime: "error".into(),
            daily: "ok".into(),
        };
        let msg = err.to_string();

        assert!(msg.contains("realtime response status is error"));
        assert!(msg.contains("daily response status is ok"));
        assert_eq!(err.kind(), ErrorKind::ProviderStatus);
    }

    #[test]
    fn combined_joins_every_cause() {
        let err = FetchError::Combined(vec![
            FetchError::Malformed {
                endpoint: Endpoint::Realtime,
                reason: "no result".into(),
            },
            FetchError::Status {
                endpoint: Endpoint::Daily,
                status: "failed".into(),
            },
        ]);

        let msg = err.to_string();
        assert!(msg.contains("malformed realtime response: no result"));
        assert!(msg.contains("daily response status is failed"));
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.endpoints(), vec![Endpoint::Realtime, Endpoint::Daily]);
    }
}
