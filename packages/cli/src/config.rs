use std::env;
use std::net::IpAddr;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid host address: {0}")]
    InvalidHost(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub host: IpAddr,
    pub cors_origin: String,
    pub database_path: PathBuf,
    /// Acting user for requests without an `X-User-Id` header
    pub dev_user: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port_str = lookup("PORT").unwrap_or_else(|| "4001".to_string());

        let port = port_str.trim().parse::<u16>()?;

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let host_str = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let host = host_str
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host_str.clone()))?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        let database_path = lookup("CAP_DATABASE_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(cap_storage::default_database_path);

        let dev_user = lookup("CAP_DEV_USER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Config {
            port,
            host,
            cors_origin,
            database_path,
            dev_user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 4001);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.cors_origin, "http://localhost:5173");
        assert_eq!(config.database_path, cap_storage::default_database_path());
        assert_eq!(config.dev_user, None);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("HOST", "0.0.0.0"),
            ("CORS_ORIGIN", "https://caps.example.com"),
            ("CAP_DATABASE_PATH", "/var/lib/caps/caps.db"),
            ("CAP_DEV_USER", " dev-user "),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.cors_origin, "https://caps.example.com");
        assert_eq!(config.database_path, PathBuf::from("/var/lib/caps/caps.db"));
        assert_eq!(config.dev_user.as_deref(), Some("dev-user"));
    }

    #[test]
    fn test_blank_dev_user_is_ignored() {
        let config = config_from(&[("CAP_DEV_USER", "   ")]).unwrap();
        assert_eq!(config.dev_user, None);
    }

    #[rstest]
    #[case("0")]
    #[case("65536")]
    #[case("http")]
    fn test_invalid_port(#[case] port: &str) {
        assert!(config_from(&[("PORT", port)]).is_err());
    }

    #[test]
    fn test_zero_port_is_out_of_range() {
        assert!(matches!(
            config_from(&[("PORT", "0")]),
            Err(ConfigError::PortOutOfRange(0))
        ));
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            config_from(&[("HOST", "not-an-ip")]),
            Err(ConfigError::InvalidHost(_))
        ));
    }
}
