//! Connection configuration for the TCP connector.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via AFC_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// TLS configuration for the device connection.
///
/// Devices present certificates issued by their own pairing root, so trust
/// comes from an explicit CA file (the pair record's root certificate) or is
/// disabled outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsClientConfig {
    /// Enable TLS for the connection.
    pub enabled: bool,
    /// Path to PEM-encoded root certificate used to verify the device.
    pub ca_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded host certificate.
    pub client_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded host private key.
    pub client_key_path: Option<PathBuf>,
    /// Skip device certificate verification.
    pub insecure: bool,
    /// Server name for SNI (defaults to the address IP).
    pub server_name: Option<String>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self.enabled = true;
        self
    }

    pub fn with_client_cert(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self.enabled = true;
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.insecure = true;
        self.enabled = true;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("AFC_TLS") {
            self.enabled = parse_flag(&enabled);
        }
        if let Ok(path) = std::env::var("AFC_CA_CERT") {
            self.ca_cert_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("AFC_CLIENT_CERT") {
            self.client_cert_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("AFC_CLIENT_KEY") {
            self.client_key_path = Some(PathBuf::from(path));
        }
        if let Ok(insecure) = std::env::var("AFC_TLS_INSECURE") {
            self.insecure = parse_flag(&insecure);
        }
        if let Ok(name) = std::env::var("AFC_SERVER_NAME") {
            self.server_name = Some(name);
        }
    }

    /// Validates the TLS configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        if !self.insecure && self.ca_cert_path.is_none() {
            return Err(ConfigError::ValidationError(
                "TLS enabled but neither ca_cert_path nor insecure set".to_string(),
            ));
        }
        if self.client_cert_path.is_some() != self.client_key_path.is_some() {
            return Err(ConfigError::ValidationError(
                "client_cert_path and client_key_path must be set together".to_string(),
            ));
        }

        Ok(())
    }
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Address of the AFC service (usually a forwarded port).
    pub addr: SocketAddr,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsClientConfig,
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            tls: TlsClientConfig::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_tls(mut self, tls_config: TlsClientConfig) -> Self {
        self.tls = tls_config;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Loads configuration from file (if AFC_CONFIG is set), then applies
    /// environment variable overrides.
    ///
    /// Without a config file, AFC_ADDR must be set.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("AFC_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => {
                let addr = std::env::var("AFC_ADDR").map_err(|_| {
                    ConfigError::ValidationError("AFC_ADDR not set".to_string())
                })?;
                Self::new(parse_addr(&addr)?)
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ConnectionConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = std::env::var("AFC_ADDR") {
            self.addr = parse_addr(&addr)?;
        }
        if let Ok(timeout) = std::env::var("AFC_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }
        self.tls.apply_env_overrides();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_secs must be positive".to_string(),
            ));
        }
        self.tls.validate()
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse()
        .map_err(|_| ConfigError::ValidationError(format!("invalid address: {}", addr)))
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.to_lowercase() == "true"
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn addr() -> SocketAddr {
        "127.0.0.1:27015".parse().unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::new(addr());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(!config.tls.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connect_timeout_floor() {
        let config = ConnectionConfig::new(addr()).with_connect_timeout(Duration::from_millis(10));
        assert_eq!(config.connect_timeout_secs, 1);
    }

    #[test]
    fn test_tls_requires_trust_source() {
        let config = ConnectionConfig::new(addr()).with_tls(TlsClientConfig {
            enabled: true,
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let config = ConnectionConfig::new(addr()).with_tls(TlsClientConfig::new().with_insecure());
        assert!(config.validate().is_ok());

        let config =
            ConnectionConfig::new(addr()).with_tls(TlsClientConfig::new().with_ca_cert("/ca.pem"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_cert_and_key_together() {
        let tls = TlsClientConfig {
            client_cert_path: Some(PathBuf::from("/host.pem")),
            ..TlsClientConfig::new().with_insecure()
        };
        assert!(tls.validate().is_err());

        let tls = TlsClientConfig::new()
            .with_insecure()
            .with_client_cert("/host.pem", "/host.key");
        assert!(tls.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "addr: \"10.0.0.2:62078\"\ntls:\n  enabled: true\n  insecure: true\n  server_name: device"
        )
        .unwrap();

        let config = ConnectionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.addr, "10.0.0.2:62078".parse::<SocketAddr>().unwrap());
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert!(config.tls.enabled);
        assert!(config.tls.insecure);
        assert_eq!(config.tls.server_name.as_deref(), Some("device"));
    }

    #[test]
    fn test_from_file_missing() {
        let result = ConnectionConfig::from_file("/nonexistent/afc.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connect_timeout_secs: 5").unwrap();

        let result = ConnectionConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(..))));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afc.yaml");

        let config = ConnectionConfig::new(addr())
            .with_tls(TlsClientConfig::new().with_ca_cert("/root.pem"));
        config.save(&path).unwrap();

        let parsed = ConnectionConfig::from_file(&path).unwrap();
        assert_eq!(parsed, config);
    }
}
