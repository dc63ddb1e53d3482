use crate::error::Error;
use crate::zone::{parse_zone, Challenge, Snapshot};
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

/// Port the DNS listener binds by default.
pub const DEFAULT_DNS_PORT: u16 = 10053;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_dns_udp_bind_addr")]
    pub dns_udp_bind_addr: SocketAddr,
    /// How long a stopping listener waits for in-flight queries before abandoning them.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_drain_grace_period")]
    pub drain_grace_period: Duration,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    /// Networks allowed to change the zone through the [HTTP API][crate::api].
    #[serde(default = "default_api_acl")]
    pub api_acl: Vec<IpNetwork>,
    /// Require DNS-01 tokens submitted through the API to be [RFC-8555][RFC-8555] challenge
    /// response values (a base64url encoded SHA256 digest).
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    #[serde(default)]
    pub strict_dns01: bool,
    /// Challenge zone served from startup. Without one the zone starts empty.
    #[serde(default)]
    pub initial_challenge: Option<Challenge>,
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
    static ref LOOPBACK_NETWORKS: Vec<IpNetwork> = vec![
        IpNetwork::from_str("127.0.0.0/8").unwrap(),
        IpNetwork::from_str("::1/128").unwrap(),
    ];
}

fn default_dns_udp_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_DNS_PORT)
}

fn default_drain_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_api_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000)
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_api_acl() -> Vec<IpNetwork> {
    LOOPBACK_NETWORKS.clone()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dns_udp_bind_addr: default_dns_udp_bind_addr(),
            drain_grace_period: default_drain_grace_period(),
            api_bind_addr: default_api_bind_addr(),
            api_timeout: default_api_timeout(),
            api_acl: default_api_acl(),
            strict_dns01: false,
            initial_challenge: None,
        }
    }
}

impl Config {
    /// Load a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it isn't a
    /// valid config, and [`Error::InsecureAPIBind`] if the API would listen on a public address.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    pub fn update_permitted(&self, source_ip: IpAddr) -> bool {
        self.api_acl
            .iter()
            .any(|allowed_network| allowed_network.contains(source_ip))
    }

    /// The zone to serve at startup, built from [`Config::initial_challenge`].
    ///
    /// # Errors
    ///
    /// Returns the zone builder's validation errors for an invalid challenge.
    pub fn initial_snapshot(&self) -> Result<Snapshot, Error> {
        match &self.initial_challenge {
            Some(challenge) => parse_zone(&challenge.zone_text()?),
            None => Ok(Snapshot::default()),
        }
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_fill_an_empty_config() {
        let file = write_config("{}");
        let config = Config::try_from_file(file.path()).unwrap();
        assert_eq!(config.dns_udp_bind_addr, "0.0.0.0:10053".parse().unwrap());
        assert_eq!(config.drain_grace_period, Duration::from_secs(5));
        assert_eq!(config.api_bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert!(!config.strict_dns01);
        assert!(config.initial_snapshot().unwrap().is_empty());
    }

    #[test]
    fn loads_durations_acl_and_initial_challenge() {
        let file = write_config(
            r#"{
                "dns_udp_bind_addr": "127.0.0.1:5353",
                "drain_grace_period": 2,
                "api_bind_addr": "10.0.0.1:8080",
                "api_timeout": 30,
                "api_acl": ["10.0.0.0/24"],
                "strict_dns01": true,
                "initial_challenge": {
                    "type": "http01",
                    "domains": ["abc.com", "test.com"],
                    "ip": "1.2.3.4"
                }
            }"#,
        );
        let config = Config::try_from_file(file.path()).unwrap();
        assert_eq!(config.drain_grace_period, Duration::from_secs(2));
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert!(config.strict_dns01);
        assert!(config.update_permitted("10.0.0.42".parse().unwrap()));
        assert!(!config.update_permitted("127.0.0.1".parse().unwrap()));
        assert_eq!(
            config.initial_snapshot().unwrap().to_string(),
            "abc.com. 60 A 1.2.3.4\ntest.com. 60 A 1.2.3.4"
        );
    }

    #[test]
    fn default_acl_is_loopback_only() {
        let config = Config::default();
        assert!(config.update_permitted("127.0.0.1".parse().unwrap()));
        assert!(config.update_permitted("::1".parse().unwrap()));
        assert!(!config.update_permitted("192.168.1.10".parse().unwrap()));
    }

    #[test]
    fn public_api_bind_is_rejected() {
        let file = write_config(r#"{"api_bind_addr": "8.8.8.8:3000"}"#);
        assert!(matches!(
            Config::try_from_file(file.path()),
            Err(Error::InsecureAPIBind(_))
        ));
        let file = write_config(r#"{"api_bind_addr": "[fd00::1]:3000"}"#);
        assert!(Config::try_from_file(file.path()).is_ok());
    }

    #[test]
    fn invalid_initial_challenge_is_reported() {
        let file = write_config(
            r#"{"initial_challenge": {"type": "http01", "domains": ["abc.com"], "ip": "x"}}"#,
        );
        let config = Config::try_from_file(file.path()).unwrap();
        assert!(matches!(config.initial_snapshot(), Err(Error::InvalidIp(_))));
    }
}
