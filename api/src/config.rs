use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use trener_core::plan::PlanParseStrategy;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Moscow;
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 12;
const DEFAULT_PLAN_PARSE_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Process configuration, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub llm: LlmConfig,
    pub timezone: Tz,
    pub plan_parse_strategy: PlanParseStrategy,
    pub turn_timeout: Duration,
    pub plan_parse_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or("PORT", var("PORT"), DEFAULT_PORT)?;

        let timezone = match var("TRENER_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                name: "TRENER_TIMEZONE",
                value: name.clone(),
            })?,
            None => DEFAULT_TIMEZONE,
        };

        let plan_parse_strategy = match var("USE_AI_PARSER").as_deref().map(str::to_lowercase) {
            Some(flag) if matches!(flag.as_str(), "1" | "true" | "yes" | "on") => {
                PlanParseStrategy::Assisted
            }
            _ => PlanParseStrategy::Deterministic,
        };

        Ok(Self {
            database_url,
            port,
            llm: LlmConfig {
                api_key: var("OPENAI_API_KEY"),
                base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            timezone,
            plan_parse_strategy,
            turn_timeout: Duration::from_secs(parse_or(
                "TRENER_TURN_TIMEOUT_SECS",
                var("TRENER_TURN_TIMEOUT_SECS"),
                DEFAULT_TURN_TIMEOUT_SECS,
            )?),
            plan_parse_timeout: Duration::from_secs(parse_or(
                "TRENER_PLAN_PARSE_TIMEOUT_SECS",
                var("TRENER_PLAN_PARSE_TIMEOUT_SECS"),
                DEFAULT_PLAN_PARSE_TIMEOUT_SECS,
            )?),
        })
    }

    /// Calendar date in the deployment timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Local wall clock shown to the generation collaborator.
    pub fn now_label(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.timezone)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/trener")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.llm.base_url, "https://api.deepseek.com");
        assert_eq!(config.llm.model, "deepseek-chat");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.timezone, chrono_tz::Europe::Moscow);
        assert_eq!(config.plan_parse_strategy, PlanParseStrategy::Deterministic);
        assert_eq!(config.turn_timeout, Duration::from_secs(12));
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn invalid_values_are_reported() {
        let result = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "http")]);
        assert!(matches!(result, Err(ConfigError::Invalid { name: "PORT", .. })));

        let result = config_from(&[("DATABASE_URL", "postgres://x"), ("TRENER_TIMEZONE", "Mars/Base")]);
        assert!(matches!(result, Err(ConfigError::Invalid { name: "TRENER_TIMEZONE", .. })));
    }

    #[test]
    fn ai_parser_flag_selects_assisted_strategy() {
        let config = config_from(&[("DATABASE_URL", "postgres://x"), ("USE_AI_PARSER", "True")]).unwrap();
        assert_eq!(config.plan_parse_strategy, PlanParseStrategy::Assisted);
    }

    #[test]
    fn today_follows_the_deployment_timezone() {
        let config = config_from(&[("DATABASE_URL", "postgres://x")]).unwrap();
        let late_utc = Utc.with_ymd_and_hms(2026, 3, 14, 22, 30, 0).unwrap();
        assert_eq!(config.today(late_utc), NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(config.now_label(late_utc), "2026-03-15 01:30");
    }
}
