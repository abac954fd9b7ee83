// Server configuration, read from environment variables
//
// LEDSRV_FIFO: control pipe path (default: /tmp/ledsrv)
// LEDSRV_IN_FIFO: request pipe template, {id} = client id (default: /tmp/ledsrv.in.{id})
// LEDSRV_OUT_FIFO: response pipe template (default: /tmp/ledsrv.out.{id})
// LEDSRV_CLIENT_FAILURE: abort | skip - what a failed client session does to the server (default: abort)
// LEDSRV_VIEW: stdout | log (default: stdout)
// LEDSRV_LOG_LEVEL: log level when RUST_LOG is unset (default: info)
use ledsrv_transport::{ConnectionPaths, DEFAULT_CONTROL_PATH};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },

    #[error("pipe templates must both contain {{id}} and differ (in: '{inbound}', out: '{outbound}')")]
    InvalidTemplates { inbound: String, outbound: String },
}

/// What a failed client session (I/O or connection error) does to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientFailurePolicy {
    /// Stop the server, like the reference behavior
    #[default]
    Abort,
    /// Log, drop the client and keep serving
    Skip,
}

impl FromStr for ClientFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ClientFailurePolicy::Abort),
            "skip" => Ok(ClientFailurePolicy::Skip),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Stdout,
    Log,
}

impl FromStr for ViewKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(ViewKind::Stdout),
            "log" => Ok(ViewKind::Log),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub control_path: PathBuf,
    pub paths: ConnectionPaths,
    pub client_failure: ClientFailurePolicy,
    pub view: ViewKind,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            control_path: PathBuf::from(DEFAULT_CONTROL_PATH),
            paths: ConnectionPaths::default(),
            client_failure: ClientFailurePolicy::default(),
            view: ViewKind::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// All pipes placed under `dir`, everything else default
    pub fn in_dir(dir: &Path) -> Self {
        ServerConfig {
            control_path: dir.join("ledsrv"),
            paths: ConnectionPaths::in_dir(dir),
            ..ServerConfig::default()
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let control_path = lookup("LEDSRV_FIFO").map(PathBuf::from).unwrap_or(defaults.control_path);

        let paths = ConnectionPaths::new(
            lookup("LEDSRV_IN_FIFO").unwrap_or(defaults.paths.inbound),
            lookup("LEDSRV_OUT_FIFO").unwrap_or(defaults.paths.outbound),
        );
        if !paths.is_valid() {
            return Err(ConfigError::InvalidTemplates {
                inbound: paths.inbound,
                outbound: paths.outbound,
            });
        }

        let client_failure = parse_var(&lookup, "LEDSRV_CLIENT_FAILURE", defaults.client_failure)?;
        let view = parse_var(&lookup, "LEDSRV_VIEW", defaults.view)?;
        let log_level = lookup("LEDSRV_LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(ServerConfig {
            control_path,
            paths,
            client_failure,
            view,
            log_level,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}
