//! Application-level configuration loading: roster limits and how dates are displayed.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use time::{
    OffsetDateTime, UtcOffset,
    format_description::{self, OwnedFormatItem},
};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATCHDAY_BACK_CONFIG_PATH";

const DEFAULT_MAX_PLAYERS: u32 = 16;
const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;
const DEFAULT_DATE_FORMAT: &str = "[day]/[month]/[year]";
const DEFAULT_TIME_FORMAT: &str = "[hour]:[minute]";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_max_players: u32,
    max_write_attempts: u32,
    date_format: OwnedFormatItem,
    time_format: OwnedFormatItem,
    display_offset: UtcOffset,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        default_max_players = app_config.default_max_players,
                        max_write_attempts = app_config.max_write_attempts,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Capacity used when a game is created without an explicit one.
    pub fn default_max_players(&self) -> u32 {
        self.default_max_players
    }

    /// How many times a roster write is retried after a version conflict.
    pub fn max_write_attempts(&self) -> u32 {
        self.max_write_attempts
    }

    /// Render the calendar day of `moment` in the display offset.
    pub fn format_date(&self, moment: OffsetDateTime) -> String {
        self.format_with(moment, &self.date_format)
    }

    /// Render the wall-clock time of `moment` in the display offset.
    pub fn format_time(&self, moment: OffsetDateTime) -> String {
        self.format_with(moment, &self.time_format)
    }

    fn format_with(&self, moment: OffsetDateTime, format: &OwnedFormatItem) -> String {
        moment
            .to_offset(self.display_offset)
            .format(format)
            .unwrap_or_else(|_| "invalid-timestamp".into())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_max_players: DEFAULT_MAX_PLAYERS,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            date_format: parse_format(DEFAULT_DATE_FORMAT, DEFAULT_DATE_FORMAT),
            time_format: parse_format(DEFAULT_TIME_FORMAT, DEFAULT_TIME_FORMAT),
            display_offset: UtcOffset::UTC,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_max_players: Option<u32>,
    max_write_attempts: Option<u32>,
    date_format: Option<String>,
    time_format: Option<String>,
    display_utc_offset_minutes: Option<i32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();

        let display_offset = value
            .display_utc_offset_minutes
            .and_then(|minutes| {
                let offset = minutes
                    .checked_mul(60)
                    .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok());
                if offset.is_none() {
                    warn!(minutes, "ignoring out-of-range display offset");
                }
                offset
            })
            .unwrap_or(defaults.display_offset);

        Self {
            default_max_players: value
                .default_max_players
                .filter(|players| *players >= 1)
                .unwrap_or(defaults.default_max_players),
            max_write_attempts: value
                .max_write_attempts
                .filter(|attempts| *attempts >= 1)
                .unwrap_or(defaults.max_write_attempts),
            date_format: value
                .date_format
                .map(|raw| parse_format(&raw, DEFAULT_DATE_FORMAT))
                .unwrap_or(defaults.date_format),
            time_format: value
                .time_format
                .map(|raw| parse_format(&raw, DEFAULT_TIME_FORMAT))
                .unwrap_or(defaults.time_format),
            display_offset,
        }
    }
}

/// Parse a `time` format description, falling back to `fallback` when it is invalid.
fn parse_format(raw: &str, fallback: &str) -> OwnedFormatItem {
    format_description::parse_owned::<2>(raw)
        .or_else(|err| {
            warn!(format = raw, error = %err, "invalid format description; using default");
            format_description::parse_owned::<2>(fallback)
        })
        .unwrap_or_else(|_| OwnedFormatItem::Compound(Box::new([])))
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn from_json(json: &str) -> AppConfig {
        serde_json::from_str::<RawConfig>(json).unwrap().into()
    }

    #[test]
    fn defaults_match_the_admin_form() {
        let config = AppConfig::default();
        assert_eq!(config.default_max_players(), 16);
        assert_eq!(config.max_write_attempts(), 5);
    }

    #[test]
    fn formats_date_and_time_separately() {
        let config = AppConfig::default();
        let kickoff = datetime!(2026-11-03 19:05 UTC);
        assert_eq!(config.format_date(kickoff), "03/11/2026");
        assert_eq!(config.format_time(kickoff), "19:05");
    }

    #[test]
    fn display_offset_shifts_rendered_time() {
        let config = from_json(r#"{"display_utc_offset_minutes": 60}"#);
        let kickoff = datetime!(2026-11-03 23:30 UTC);
        assert_eq!(config.format_date(kickoff), "04/11/2026");
        assert_eq!(config.format_time(kickoff), "00:30");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = from_json(r#"{"default_max_players": 10, "time_format": "[hour]h[minute]"}"#);
        assert_eq!(config.default_max_players(), 10);
        assert_eq!(config.max_write_attempts(), 5);
        assert_eq!(config.format_time(datetime!(2026-01-01 07:45 UTC)), "07h45");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = from_json(
            r#"{"default_max_players": 0, "max_write_attempts": 0, "date_format": "[nope]"}"#,
        );
        assert_eq!(config.default_max_players(), 16);
        assert_eq!(config.max_write_attempts(), 5);
        assert_eq!(config.format_date(datetime!(2026-02-01 00:00 UTC)), "01/02/2026");
    }

    #[test]
    fn huge_display_offset_falls_back_to_utc() {
        let config = from_json(r#"{"display_utc_offset_minutes": 2147483647}"#);
        let kickoff = datetime!(2026-11-03 23:30 UTC);
        assert_eq!(config.format_date(kickoff), "03/11/2026");
        assert_eq!(config.format_time(kickoff), "23:30");
    }
}
