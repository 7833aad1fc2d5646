use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::warn;

use crate::engine::EngineConfig;
use crate::packer::PackerKind;
use crate::selector::SelectorKind;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineSettings::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "PDP_PACKER_API_HOST";
    const PORT_VAR: &'static str = "PDP_PACKER_API_PORT";

    fn from_env() -> Self {
        Self::from_source(env_string)
    }

    fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (default_ip, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Engine defaults applied to every request that does not override them.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    config: EngineConfig,
}

impl EngineSettings {
    const PACKER_VAR: &'static str = "PDP_PACKER_PACKER";
    const SELECTOR_VAR: &'static str = "PDP_PACKER_SELECTOR";
    const PRUNE_VAR: &'static str = "PDP_PACKER_PRUNE_INCLUDED";
    const AXIS_PRIORITY_VAR: &'static str = "PDP_PACKER_AXIS_PRIORITY";
    const ROTATION_PRIORITY_VAR: &'static str = "PDP_PACKER_ROTATION_PRIORITY";
    const ROTATION_AXES_VAR: &'static str = "PDP_PACKER_ROTATION_AXES";
    const BLOCKING_AXES_VAR: &'static str = "PDP_PACKER_BLOCKING_AXES";

    fn from_env() -> Self {
        Self::from_source(env_string)
    }

    pub(crate) fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = EngineConfig::builder();

        if let Some(raw) = lookup(Self::PACKER_VAR) {
            match PackerKind::from_code(&raw) {
                Some(kind) => builder = builder.packer(kind),
                None => warn!(
                    "Unknown packer in {} ('{}'). Using {}.",
                    Self::PACKER_VAR,
                    raw,
                    PackerKind::default().code()
                ),
            }
        }

        if let Some(raw) = lookup(Self::SELECTOR_VAR) {
            match SelectorKind::from_code(&raw) {
                Some(kind) => builder = builder.selector(kind),
                None => warn!(
                    "Unknown selector in {} ('{}'). Using {}.",
                    Self::SELECTOR_VAR,
                    raw,
                    SelectorKind::default().code()
                ),
            }
        }

        if let Some(prune) =
            lookup(Self::PRUNE_VAR).and_then(|raw| parse_bool(&raw, Self::PRUNE_VAR))
        {
            builder = builder.prune_included_containers(prune);
        }

        if let Some(axes) = lookup(Self::AXIS_PRIORITY_VAR)
            .and_then(|raw| parse_axis_list(&raw, Self::AXIS_PRIORITY_VAR))
        {
            builder = builder.axis_priority(axes);
        }

        if let Some(axes) = lookup(Self::ROTATION_PRIORITY_VAR)
            .and_then(|raw| parse_axis_list(&raw, Self::ROTATION_PRIORITY_VAR))
        {
            builder = builder.rotation_priority(axes);
        }

        if let Some(mask) = lookup(Self::ROTATION_AXES_VAR)
            .and_then(|raw| parse_axis_mask(&raw, Self::ROTATION_AXES_VAR))
        {
            builder = builder.allowed_rotation_axes(mask);
        }

        if let Some(mask) = lookup(Self::BLOCKING_AXES_VAR)
            .and_then(|raw| parse_axis_mask(&raw, Self::BLOCKING_AXES_VAR))
        {
            builder = builder.blocking_axes(mask);
        }

        Self {
            config: builder.build(),
        }
    }

    /// Returns the configured engine defaults.
    pub fn engine_config(&self) -> EngineConfig {
        self.config.clone()
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

/// Parses a comma-separated list of axis indices such as `"2,0,1"`.
fn parse_axis_list(raw: &str, var_name: &str) -> Option<Vec<usize>> {
    let parsed: Result<Vec<usize>, _> = raw
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect();
    match parsed {
        Ok(axes) if !axes.is_empty() => Some(axes),
        Ok(_) => None,
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as axis list: {}. Using default value.",
                var_name, raw, err
            );
            None
        }
    }
}

/// Parses a comma-separated axis mask such as `"1,0,1"` or `"true,false,true"`.
fn parse_axis_mask(raw: &str, var_name: &str) -> Option<Vec<bool>> {
    raw.split(',')
        .map(|part| parse_bool(part, var_name))
        .collect::<Option<Vec<bool>>>()
        .filter(|mask| !mask.is_empty())
}
