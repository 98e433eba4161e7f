use std::net::{IpAddr, SocketAddr};
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;

use envconfig::Envconfig;
use once_cell::sync::Lazy;

use restrictions_common::gate::{DEFAULT_NETMASK, DEFAULT_NETWORK, DEFAULT_TRUSTED_PROXIES};
use restrictions_common::nonce::DEFAULT_LIFETIME_SECS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Which visitors restrictions apply to while the filter setting is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Visitors from outside the configured subnet.
    Subnet,
    /// Visitors who are not logged in.
    Login,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subnet" => Ok(FilterMode::Subnet),
            "login" => Ok(FilterMode::Login),
            _ => Err(format!("Invalid filter mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpList(pub Vec<IpAddr>);

impl FromStr for IpList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .parse::<IpAddr>()
                    .map_err(|e| format!("Invalid address {}: {}", entry, e))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(IpList)
    }
}

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3310")]
    pub address: SocketAddr,

    /// JSON site seed. An empty site is served when unset.
    pub site_path: Option<PathBuf>,

    #[envconfig(default = "http://localhost:3310/")]
    pub home_url: String,

    pub nonce_secret: String,

    #[envconfig(default = "86400")]
    pub nonce_lifetime_secs: u64,

    #[envconfig(default = "subnet")]
    pub filter_mode: FilterMode,

    #[envconfig(default = "192.168.122.0")]
    pub filter_network: IpAddr,

    #[envconfig(default = "255.255.254.0")]
    pub filter_netmask: IpAddr,

    #[envconfig(default = "127.0.0.1,::1")]
    pub trusted_proxies: IpList,

    pub admin_token: String,

    #[envconfig(default = "wp_")]
    pub table_prefix: String,

    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,
}

impl Config {
    pub fn default_test_config() -> Self {
        Self {
            address: SocketAddr::from_str("127.0.0.1:0").expect("static address is valid"),
            site_path: None,
            home_url: "https://example.com/".to_string(),
            nonce_secret: "test-secret".to_string(),
            nonce_lifetime_secs: DEFAULT_LIFETIME_SECS,
            filter_mode: FilterMode::Subnet,
            filter_network: IpAddr::V4(DEFAULT_NETWORK),
            filter_netmask: IpAddr::V4(DEFAULT_NETMASK),
            trusted_proxies: IpList(DEFAULT_TRUSTED_PROXIES.to_vec()),
            admin_token: "test-admin-token".to_string(),
            table_prefix: "wp_".to_string(),
            debug: FlexBool(false),
        }
    }
}

pub static DEFAULT_TEST_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);
