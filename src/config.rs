// src/config.rs

use anyhow::{bail, Context, Result};
use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};
use url::Url;

pub const DEFAULT_SOURCE_URL: &str = "https://en.wikipedia.org/wiki/List_of_highest-grossing_films";
pub const DEFAULT_PORT: u16 = 5000;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_BACKOFF_MS: u64 = 500;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub source_url: Url,
    pub fetch_timeout: Duration,
    /// 0 means a failed fetch is final.
    pub fetch_max_retries: u32,
    pub fetch_backoff: Duration,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            source_url: Url::parse(DEFAULT_SOURCE_URL).expect("default source URL should parse"),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_max_retries: 0,
            fetch_backoff: Duration::from_millis(DEFAULT_FETCH_BACKOFF_MS),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = parse_var(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr);
        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let source_url = parse_var(&lookup, "SOURCE_URL")?.unwrap_or(defaults.source_url);
        let fetch_timeout = match parse_var::<u64, _>(&lookup, "FETCH_TIMEOUT_SECS")? {
            Some(0) => bail!("invalid value \"0\" for FETCH_TIMEOUT_SECS: must be at least 1"),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.fetch_timeout,
        };
        let fetch_max_retries =
            parse_var(&lookup, "FETCH_MAX_RETRIES")?.unwrap_or(defaults.fetch_max_retries);
        let fetch_backoff = parse_var::<u64, _>(&lookup, "FETCH_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.fetch_backoff);
        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            bind_addr,
            port,
            source_url,
            fetch_timeout,
            fetch_max_retries,
            fetch_backoff,
            log_level,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value {:?} for {}", raw, key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_original_service() {
        let cfg = Config::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(cfg.source_url.as_str(), DEFAULT_SOURCE_URL);
        assert_eq!(cfg.fetch_max_retries, 0);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", "8080"),
            ("SOURCE_URL", "http://localhost:9000/films"),
            ("FETCH_TIMEOUT_SECS", "5"),
            ("FETCH_MAX_RETRIES", "2"),
        ]))
        .unwrap();
        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.source_url.as_str(), "http://localhost:9000/films");
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(5));
        assert_eq!(cfg.fetch_max_retries, 2);
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("PORT"), "got: {err}");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("FETCH_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("FETCH_TIMEOUT_SECS"), "got: {err}");
    }
}
