use std::io;
use thiserror::Error;

/// Why a telemetry source could not produce a value.
///
/// None of these ever reach the HTTP layer: collectors log them and fall
/// back to their documented defaults.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A `/proc` or `/sys` path, or an external command, is missing or unreadable.
    #[error("{path}: {source}")]
    Unavailable {
        path:   String,
        #[source]
        source: io::Error,
    },

    /// The source was readable but did not have the expected shape.
    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    /// Network I/O failure or timeout during a bandwidth probe.
    #[error("transport: {0}")]
    Transport(String),

    #[error("no default route in routing table")]
    NoDefaultRoute,

    /// The probe finished but transferred nothing worth caching.
    #[error("probe measured zero throughput")]
    EmptyMeasurement,

    /// The slave walk hit its hop cap while the device still had slaves.
    #[error("block topology walk from {start} stopped at {last} after hop limit")]
    ResolutionExhausted { start: String, last: String },
}

impl TelemetryError {
    pub fn unavailable(path: impl Into<String>, source: io::Error) -> Self {
        TelemetryError::Unavailable { path: path.into(), source }
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(e: reqwest::Error) -> Self {
        TelemetryError::Transport(e.to_string())
    }
}
