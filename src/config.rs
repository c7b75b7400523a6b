//! Agent configuration: TOML on disk, validated into [`Config`] before any
//! monitor is built.
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::credentials::Credentials;
use crate::model::{ApiConfig, AwardTemplate, Flag};

pub const DEFAULT_CONFIG_PATH: &str = "koth.toml";

/// Longest accepted flag interval: one week.
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing API for configuration")]
    MissingApi,
    #[error("missing API URL")]
    MissingApiUrl,
    #[error("invalid API URL {url:?}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("missing API credentials; set either `token` or both `session` and `csrf`")]
    MissingCredentials,
    #[error("ambiguous API credentials; `token` cannot be combined with `session` or `csrf`")]
    AmbiguousCredentials,
    #[error("missing API CSRF token for session credentials")]
    MissingCsrf,
    #[error("missing API session for CSRF token")]
    MissingSession,
    #[error("missing flags for configuration")]
    NoFlags,
    #[error("flag #{index}: {reason}")]
    InvalidInterval { index: usize, reason: String },
    #[error("flag #{index}: missing path for flag")]
    MissingFlagPath { index: usize },
    #[error("flag #{index}: missing award for flag")]
    MissingAward { index: usize },
    #[error("flag #{index}: missing name for award")]
    MissingAwardName { index: usize },
    #[error("flag #{index}: missing category for award")]
    MissingAwardCategory { index: usize },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub flags: Vec<Flag>,
}

#[derive(Deserialize, Debug, Default)]
struct RawConfig {
    api: Option<RawApi>,
    #[serde(default)]
    flags: Vec<RawFlag>,
}

#[derive(Deserialize, Debug, Default)]
struct RawApi {
    url: Option<String>,
    token: Option<String>,
    session: Option<String>,
    csrf: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawFlag {
    interval: Option<RawInterval>,
    #[serde(default)]
    path: String,
    award: Option<RawAward>,
}

/// `interval = 30` (seconds) or `interval = "1m30s"`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawInterval {
    Seconds(i64),
    Text(String),
}

#[derive(Deserialize, Debug)]
struct RawAward {
    #[serde(default)]
    name: String,
    description: Option<String>,
    #[serde(default)]
    value: i64,
    #[serde(default)]
    category: String,
    icon: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let absolute_path_display = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        info!(path = ?absolute_path_display, "Attempting to load config.");

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;

        info!(
            api = %config.api.url,
            scheme = config.api.credentials.scheme(),
            flags = config.flags.len(),
            "Loaded config successfully."
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        raw.check()
    }
}

impl RawConfig {
    fn check(self) -> Result<Config, ConfigError> {
        let api = self.api.ok_or(ConfigError::MissingApi)?.check()?;
        if self.flags.is_empty() {
            return Err(ConfigError::NoFlags);
        }
        let flags = self
            .flags
            .into_iter()
            .enumerate()
            .map(|(index, flag)| flag.check(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Config { api, flags })
    }
}

impl RawApi {
    fn check(self) -> Result<ApiConfig, ConfigError> {
        let url = non_empty(self.url).ok_or(ConfigError::MissingApiUrl)?;
        let url = Url::parse(&url).map_err(|source| ConfigError::InvalidApiUrl { url, source })?;

        let provided = (
            non_empty(self.token),
            non_empty(self.session),
            non_empty(self.csrf),
        );
        let credentials = match provided {
            (Some(token), None, None) => Credentials::Token { token },
            (Some(_), _, _) => return Err(ConfigError::AmbiguousCredentials),
            (None, Some(session), Some(csrf)) => Credentials::Session { session, csrf },
            (None, Some(_), None) => return Err(ConfigError::MissingCsrf),
            (None, None, Some(_)) => return Err(ConfigError::MissingSession),
            (None, None, None) => return Err(ConfigError::MissingCredentials),
        };

        Ok(ApiConfig { url, credentials })
    }
}

impl RawFlag {
    fn check(self, index: usize) -> Result<Flag, ConfigError> {
        let interval = match self.interval {
            None => Err("missing interval for flag".to_string()),
            Some(RawInterval::Seconds(seconds)) => match u64::try_from(seconds) {
                Ok(seconds) => within_bounds(Duration::from_secs(seconds)),
                Err(_) => Err(NOT_POSITIVE.to_string()),
            },
            Some(RawInterval::Text(text)) => parse_interval(&text),
        }
        .map_err(|reason| ConfigError::InvalidInterval { index, reason })?;

        if self.path.trim().is_empty() {
            return Err(ConfigError::MissingFlagPath { index });
        }

        let award = self.award.ok_or(ConfigError::MissingAward { index })?;
        if award.name.is_empty() {
            return Err(ConfigError::MissingAwardName { index });
        }
        if award.category.is_empty() {
            return Err(ConfigError::MissingAwardCategory { index });
        }

        Ok(Flag {
            interval,
            path: PathBuf::from(self.path),
            award: AwardTemplate {
                name: award.name,
                description: non_empty(award.description),
                value: award.value,
                category: award.category,
                icon: non_empty(award.icon),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parses durations such as `"30s"`, `"1m30s"`, `"250ms"` or `"1.5h"`.
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; a bare
/// number is taken as seconds.
pub fn parse_interval(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("missing interval for flag".to_string());
    }
    if let Ok(seconds) = text.parse::<u64>() {
        return within_bounds(Duration::from_secs(seconds));
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total_nanos: u128 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid interval {text:?}: expected a number"));
        }
        let number = &rest[..number_len];
        let amount: f64 = number
            .parse()
            .map_err(|_| format!("invalid interval {text:?}: bad number {number:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest.find(is_number).unwrap_or(rest.len());
        let unit_nanos: f64 = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("invalid interval {text:?}: missing unit")),
            unit => return Err(format!("invalid interval {text:?}: unknown unit {unit:?}")),
        };
        rest = &rest[unit_len..];

        let component = (amount * unit_nanos).round();
        if !component.is_finite() || component > MAX_INTERVAL.as_nanos() as f64 {
            return Err(too_long(text));
        }
        total_nanos = total_nanos
            .checked_add(component as u128)
            .ok_or_else(|| too_long(text))?;
    }

    let nanos = u64::try_from(total_nanos).map_err(|_| too_long(text))?;
    within_bounds(Duration::from_nanos(nanos))
}

const NOT_POSITIVE: &str = "flag interval should be greater than zero (>0)";

fn too_long(text: &str) -> String {
    format!("invalid interval {text:?}: longer than {}s", MAX_INTERVAL.as_secs())
}

fn within_bounds(interval: Duration) -> Result<Duration, String> {
    if interval.is_zero() {
        Err(NOT_POSITIVE.to_string())
    } else if interval > MAX_INTERVAL {
        Err(format!(
            "flag interval {}s is longer than {}s",
            interval.as_secs(),
            MAX_INTERVAL.as_secs()
        ))
    } else {
        Ok(interval)
    }
}
