//! Configuration for the math service.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. The plain `PORT` and `LOGLEVEL` environment variables
//! 2. Environment variables prefixed with `MATH__`
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Prefixed environment variables use double underscores (`__`) to denote nested configuration
//! structures. For example:
//!
//! - `MATH__PORT=8080` sets the HTTP port
//! - `MATH__LOGGING__FORMAT=pretty` switches to human-readable logs
//!
//! For compatibility with common deployment setups, `PORT` and `LOGLEVEL` are honored without a
//! prefix and take precedence over everything else.
//!
//! # YAML Configuration File
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 8080
//!
//! logging:
//!   level: debug
//!   format: pretty
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "MATH__";

/// Unprefixed environment variables and the configuration keys they map to.
const PLAIN_ENV_VARS: &[(&str, &str)] = &[("PORT", "port"), ("LOGLEVEL", "logging.level")];

/// Log output format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line with alphabetically sorted keys.
    ///
    /// ```text
    /// {"a":10.0,"b":5.0,"event":"Received addition request","level":"info","logger":"mathservice_server::endpoints::add","timestamp":"2025-01-01T12:00:00.000000Z"}
    /// ```
    Json,

    /// Multi-line, colored output for local development.
    Pretty,

    /// Compact single-line text output.
    Simplified,
}

/// Error returned when parsing a log level fails.
#[derive(Clone, Debug)]
pub struct LevelParseError(String);

impl fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as level: expected one of "trace", "debug", "info", "warning", "error", "off""#,
            self.0
        )
    }
}

impl std::error::Error for LevelParseError {}

/// Parses a log level name.
///
/// In addition to the names understood by [`LevelFilter`], this accepts the aliases `WARNING` and
/// `CRITICAL`, which are common in `LOGLEVEL` variables shared with other services.
pub fn parse_level(s: &str) -> Result<LevelFilter, LevelParseError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::WARN);
    }
    if s.eq_ignore_ascii_case("critical") || s.eq_ignore_ascii_case("fatal") {
        return Ok(LevelFilter::ERROR);
    }
    s.parse().map_err(|_| LevelParseError(s.into()))
}

mod level_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::level_filters::LevelFilter;

    pub fn serialize<S>(value: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        super::parse_level(&s).map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stdout.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable provides more granular control per module if needed.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `LOGLEVEL` or `MATH__LOGGING__LEVEL`
    #[serde(with = "level_serde")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// # Default
    ///
    /// [`LogFormat::Json`]
    ///
    /// # Environment Variable
    ///
    /// `MATH__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Json,
        }
    }
}

/// Main configuration struct for the math service.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Interface the HTTP server binds to.
    ///
    /// # Default
    ///
    /// `0.0.0.0`
    pub host: IpAddr,

    /// Port the HTTP server listens on.
    ///
    /// # Default
    ///
    /// `8000`
    ///
    /// # Environment Variable
    ///
    /// `PORT` or `MATH__PORT`
    pub port: u16,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally merging in a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML file cannot be read or parsed, or if environment variables
    /// contain invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }

        let plain = Env::raw()
            .only(&PLAIN_ENV_VARS.iter().map(|(var, _)| *var).collect::<Vec<_>>())
            .map(|var| {
                PLAIN_ENV_VARS
                    .iter()
                    .find(|(name, _)| var.as_str().eq_ignore_ascii_case(name))
                    .map_or_else(|| var.as_str().to_owned(), |(_, key)| (*key).to_owned())
                    .into()
            });

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(plain)
            .extract()?;

        Ok(config)
    }

    /// The socket address the HTTP server binds to.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.http_addr(), "0.0.0.0:8000".parse().unwrap());
            assert_eq!(config.logging.level, LevelFilter::INFO);
            assert_eq!(config.logging.format, LogFormat::Json);

            Ok(())
        });
    }

    #[test]
    fn plain_env_vars() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORT", "9001");
            jail.set_env("LOGLEVEL", "WARNING");

            let config = Config::load(None).unwrap();
            assert_eq!(config.port, 9001);
            assert_eq!(config.logging.level, LevelFilter::WARN);

            Ok(())
        });
    }

    #[test]
    fn prefixed_env_vars() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MATH__HOST", "127.0.0.1");
            jail.set_env("MATH__LOGGING__FORMAT", "pretty");

            let config = Config::load(None).unwrap();
            assert_eq!(config.http_addr(), "127.0.0.1:8000".parse().unwrap());
            assert_eq!(config.logging.format, LogFormat::Pretty);

            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            port: 8080
            logging:
                level: debug
                format: simplified
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("PORT", "9002");

            let config = Config::load(Some(tempfile.path())).unwrap();
            // Env should overwrite the yaml config
            assert_eq!(config.port, 9002);
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Simplified);

            Ok(())
        });
    }

    #[test]
    fn invalid_level() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LOGLEVEL", "loud");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }

    #[test]
    fn level_aliases() {
        assert_eq!(parse_level("critical").unwrap(), LevelFilter::ERROR);
        assert_eq!(parse_level("Info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
        assert!(parse_level("verbose").is_err());
    }
}
