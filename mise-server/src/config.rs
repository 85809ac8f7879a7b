//! Server configuration, read from the environment.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use mise_core::MiseError;

use crate::error::ServerResult;

pub const HOST_VAR: &str = "MISE_HOST";
pub const PORT_VAR: &str = "MISE_PORT";
pub const DATA_PATH_VAR: &str = "MISE_DATA_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Corpus directory holding `spaces.json` and the matrices it lists.
    pub data_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_path: PathBuf::from("./mise_data"),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `MISE_HOST`, `MISE_PORT` and `MISE_DATA_PATH` when set.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let mut config = ServerConfig::default();
        if let Some(host) = lookup(HOST_VAR) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_VAR) {
            config.port = port.parse().map_err(|_| {
                MiseError::Configuration(format!("{} must be a port number, got '{}'", PORT_VAR, port))
            })?;
        }
        if let Some(path) = lookup(DATA_PATH_VAR) {
            config.data_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| MiseError::Configuration(format!("{} is not an IP address: '{}'", HOST_VAR, self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            (HOST_VAR, "0.0.0.0"),
            (PORT_VAR, "8080"),
            (DATA_PATH_VAR, "/srv/recipes"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_path, PathBuf::from("/srv/recipes"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_bad_port() {
        let result = ServerConfig::from_lookup(lookup_from(&[(PORT_VAR, "http")]));
        assert!(matches!(result, Err(ServerError::CoreError(MiseError::Configuration(_)))));
    }
}
