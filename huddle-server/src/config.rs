use crate::errors::ConfigError;
use huddle_core::IceServerConfig;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Runtime settings for the coordinator and its transport.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub bind_addr: SocketAddr,
    pub ice_servers: Vec<IceServerConfig>,
    pub room_capacity: usize,
    pub negotiation_timeout: Duration,
    /// Connections attempted per remote before giving up until it rejoins.
    pub max_connection_attempts: u32,
    pub room_command_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
            room_capacity: 8,
            negotiation_timeout: Duration::from_secs(20),
            max_connection_attempts: 2,
            room_command_buffer: 100,
        }
    }
}

impl CoordinatorConfig {
    /// Defaults overridden by `HUDDLE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "HUDDLE_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "HUDDLE_ROOM_CAPACITY")? {
            config.room_capacity = non_zero("HUDDLE_ROOM_CAPACITY", capacity)?;
        }
        if let Some(secs) = parse_var(&lookup, "HUDDLE_NEGOTIATION_TIMEOUT_SECS")? {
            config.negotiation_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "HUDDLE_MAX_CONNECTION_ATTEMPTS")? {
            config.max_connection_attempts = non_zero("HUDDLE_MAX_CONNECTION_ATTEMPTS", attempts)?;
        }

        if let Some(urls) = lookup("HUDDLE_STUN_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
                .collect();
            config.ice_servers = vec![IceServerConfig {
                urls,
                username: None,
                credential: None,
            }];
        }
        if let Some(turn_url) = lookup("HUDDLE_TURN_URL") {
            config.ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: lookup("HUDDLE_TURN_USERNAME"),
                credential: lookup("HUDDLE_TURN_CREDENTIAL"),
            });
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

fn non_zero<T>(key: &'static str, value: T) -> Result<T, ConfigError>
where
    T: Default + PartialEq + ToString,
{
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}
