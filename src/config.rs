use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

pub const DNS_PORT: u16 = 53;

/// UDP payload every DNS implementation must accept
pub const MIN_UDP_SIZE: u16 = 512;

/// Largest EDNS0 UDP payload answered without fragmentation concerns
pub const DEFAULT_MAX_UDP_SIZE: u16 = 1232;

const DEFAULT_TCP_TIMEOUT: u64 = 10;

/// Server settings
///
/// Every field is optional in a configuration file:
///
/// ```json
/// { "listen": "127.0.0.1:5353", "zones": ["example.com.json"], "tcp": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub listen: SocketAddr,
    /// JSON zone files, loaded in order
    pub zones: Vec<PathBuf>,
    /// Also serve DNS over TCP on the same address
    pub tcp: bool,
    /// Seconds an idle TCP connection stays open
    pub tcp_timeout: u64,
    /// Cap on the EDNS0 payload size a client may ask for
    pub max_udp_size: u16,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), DNS_PORT),
            zones: Vec::new(),
            tcp: true,
            tcp_timeout: DEFAULT_TCP_TIMEOUT,
            max_udp_size: DEFAULT_MAX_UDP_SIZE,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Config, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration file; relative zone paths are taken relative
    /// to the directory holding it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();
        let mut config = Config::from_json_str(&fs::read_to_string(path)?)?;
        if let Some(dir) = path.parent() {
            for zone in config.zones.iter_mut() {
                if zone.is_relative() {
                    *zone = dir.join(&*zone);
                }
            }
        }
        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_timeout)
    }

    /// Payload cap for UDP responses, never below the classic 512 bytes
    pub fn udp_payload_limit(&self) -> u16 {
        self.max_udp_size.max(MIN_UDP_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listen, "0.0.0.0:53".parse().unwrap());
        assert!(config.tcp);
        assert_eq!(config.idle_timeout(), Duration::from_secs(10));
        assert_eq!(config.udp_payload_limit(), 1232);
    }

    #[test]
    fn overrides() {
        let config = Config::from_json_str(
            r#"{ "listen": "[::1]:5353", "tcp": false, "tcp-timeout": 3, "max-udp-size": 100 }"#,
        )
        .unwrap();
        assert_eq!(config.listen, "[::1]:5353".parse().unwrap());
        assert!(!config.tcp);
        assert_eq!(config.tcp_timeout, 3);
        assert_eq!(config.udp_payload_limit(), 512);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            Config::from_json_str(r#"{ "listne": "127.0.0.1:53" }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "listen": "localhost" }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zone_paths_follow_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authdns.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "zones": ["zones/example.com.json", "/etc/zone.json"] }}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.zones[0], dir.path().join("zones/example.com.json"));
        assert_eq!(config.zones[1], PathBuf::from("/etc/zone.json"));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_json_file("/nonexistent/authdns.json"),
            Err(Error::Io(_))
        ));
    }
}
