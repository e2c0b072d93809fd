//! Bus configuration.

/// Number of dispatch workers used when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 1;

/// Dispatch worker settings.
///
/// Reads from environment variables:
/// - `EVENT_BUS_WORKERS`: dispatch worker count (default: `1`; `0` or
///   unparsable values fall back to the default)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub workers: usize,
}

impl BusConfig {
    /// Configuration with `workers` competing dispatch workers (at least one).
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::parse_workers(std::env::var("EVENT_BUS_WORKERS").ok().as_deref())
    }

    /// Parses a raw `EVENT_BUS_WORKERS` value. Surrounding whitespace is
    /// ignored; `0`, unparsable or absent values give the default.
    pub fn parse_workers(raw: Option<&str>) -> Self {
        let workers = raw
            .and_then(|w| w.trim().parse::<usize>().ok())
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_WORKERS);
        Self { workers }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}
