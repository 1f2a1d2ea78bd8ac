use std::{path::Path, str::FromStr, time::Duration};

use route_trace_lib::coordinates::{coordinates, Coordinates};

use crate::{adapters::{Endpoint, OptimizeOptions}, error::ConfigError, metrics::RemainingDistanceModel};

pub const DEFAULT_MAPBOX_BASE_URL: &str = "https://api.mapbox.com";
/// São Paulo, where the center pin lands when tracing starts.
pub const DEFAULT_CENTER: (f64, f64) = (-46.6333, -23.5505);

pub const TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";
pub const BASE_URL_ENV: &str = "MAPBOX_BASE_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub mapbox_token: Option<String>,
    pub mapbox_base_url: String,
    pub language: String,
    pub search_country: String,

    pub geocode_timeout: Duration,
    pub optimize_timeout: Duration,
    pub geocode_retries: u32,
    pub geocode_retry_delay: Duration,
    pub optimize_retries: u32,
    pub optimize_retry_delay: Duration,

    pub search_debounce: Duration,
    pub search_min_query_length: usize,
    pub search_limit: usize,

    pub default_center: Coordinates,
    pub remaining_distance_model: RemainingDistanceModel,
    pub optimize_options: OptimizeOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mapbox_token: None,
            mapbox_base_url: DEFAULT_MAPBOX_BASE_URL.to_string(),
            language: "pt".to_string(),
            search_country: "BR".to_string(),
            geocode_timeout: Duration::from_millis(8_000),
            optimize_timeout: Duration::from_millis(15_000),
            geocode_retries: 1,
            geocode_retry_delay: Duration::from_millis(500),
            optimize_retries: 1,
            optimize_retry_delay: Duration::from_millis(1_000),
            search_debounce: Duration::from_millis(300),
            search_min_query_length: 3,
            search_limit: 5,
            default_center: coordinates(DEFAULT_CENTER.0, DEFAULT_CENTER.1),
            remaining_distance_model: RemainingDistanceModel::Uniform,
            optimize_options: OptimizeOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Parses `key = value` lines. Blank lines and `#` comments are skipped, unknown keys are logged and ignored.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut center = (config.default_center.x(), config.default_center.y());

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine { line: number + 1, content: line.to_string() });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "mapbox_token" => config.mapbox_token = Some(value.to_string()).filter(|token| !token.is_empty()),
                "mapbox_base_url" => config.mapbox_base_url = value.trim_end_matches('/').to_string(),
                "language" => config.language = value.to_string(),
                "search_country" => config.search_country = value.to_string(),
                "geocode_timeout_ms" => config.geocode_timeout = millis(key, value)?,
                "optimize_timeout_ms" => config.optimize_timeout = millis(key, value)?,
                "geocode_retries" => config.geocode_retries = parse_value(key, value)?,
                "geocode_retry_delay_ms" => config.geocode_retry_delay = millis(key, value)?,
                "optimize_retries" => config.optimize_retries = parse_value(key, value)?,
                "optimize_retry_delay_ms" => config.optimize_retry_delay = millis(key, value)?,
                "search_debounce_ms" => config.search_debounce = millis(key, value)?,
                "search_min_query_length" => config.search_min_query_length = parse_value(key, value)?,
                "search_limit" => config.search_limit = parse_value(key, value)?,
                "default_center_lng" => center.0 = parse_value(key, value)?,
                "default_center_lat" => center.1 = parse_value(key, value)?,
                "remaining_distance_model" => config.remaining_distance_model = parse_value(key, value)?,
                "optimize_source" => config.optimize_options.source = parse_value::<Endpoint>(key, value)?,
                "optimize_destination" => config.optimize_options.destination = parse_value::<Endpoint>(key, value)?,
                "optimize_roundtrip" => config.optimize_options.roundtrip = parse_value(key, value)?,
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        config.default_center = coordinates(center.0, center.1);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::parse(&text)
    }

    /// Overlays `MAPBOX_ACCESS_TOKEN` and `MAPBOX_BASE_URL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|token| !token.trim().is_empty()) {
            self.mapbox_token = Some(token.trim().to_string());
        }
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.mapbox_base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        self
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() })
}

fn millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_value::<u64>(key, value).map(Duration::from_millis)
}
