// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for the discovery context.
//!
//! ## Core Configuration
//! - `HDDS_LOG_LEVEL`: Logging level (default: "info")
//! - `HDDS_GRAPH_LISTENER_POLL_MS`: How often the `ros_discovery_info`
//!   listener re-checks its shutdown flag (default: 100)
//!
//! ## ROS 2 Security (SROS2)
//! - `ROS_SECURITY_ENABLE`: Enable security ("true" or "1")
//! - `ROS_SECURITY_STRATEGY`: "Enforce" or "Permissive" (default: Permissive)
//! - `ROS_SECURITY_KEYSTORE`: Keystore root directory
//! - `ROS_SECURITY_ENCLAVE`: Enclave name (default: "/")
//!
//! # Example
//!
//! ```bash
//! export ROS_SECURITY_ENABLE=true
//! export ROS_SECURITY_STRATEGY=Enforce
//! export ROS_SECURITY_KEYSTORE=/opt/keystore
//! export ROS_SECURITY_ENCLAVE=/talker_listener/talker
//! ```

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::security::get_security_files;

pub const ENV_LOG_LEVEL: &str = "HDDS_LOG_LEVEL";
pub const ENV_GRAPH_LISTENER_POLL_MS: &str = "HDDS_GRAPH_LISTENER_POLL_MS";

pub const ENV_ROS_SECURITY_ENABLE: &str = "ROS_SECURITY_ENABLE";
pub const ENV_ROS_SECURITY_STRATEGY: &str = "ROS_SECURITY_STRATEGY";
pub const ENV_ROS_SECURITY_KEYSTORE: &str = "ROS_SECURITY_KEYSTORE";
pub const ENV_ROS_SECURITY_ENCLAVE: &str = "ROS_SECURITY_ENCLAVE";

pub const DEFAULT_ENCLAVE: &str = "/";
pub const DEFAULT_LISTENER_POLL: Duration = Duration::from_millis(100);

/// What to do when security is enabled but the enclave is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityStrategy {
    /// Refuse to start.
    Enforce,
    /// Continue without security.
    #[default]
    Permissive,
}

/// Runtime configuration from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Enclave this participant belongs to
    pub enclave: String,

    /// Receive timeout of the graph listener loop
    pub listener_poll: Duration,

    /// Security configuration, present only when enabled
    pub security: Option<SecurityEnvConfig>,
}

/// SROS2 keystore settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEnvConfig {
    pub strategy: SecurityStrategy,
    pub keystore: Option<PathBuf>,
    pub enclave: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enclave: DEFAULT_ENCLAVE.to_string(),
            listener_poll: DEFAULT_LISTENER_POLL,
            security: None,
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl EnvConfig {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let log_level = get(ENV_LOG_LEVEL).unwrap_or_else(|| "info".to_string());

        let listener_poll = get(ENV_GRAPH_LISTENER_POLL_MS)
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_LISTENER_POLL, Duration::from_millis);

        let enclave = get(ENV_ROS_SECURITY_ENCLAVE).unwrap_or_else(|| DEFAULT_ENCLAVE.to_string());

        let security_enabled = get(ENV_ROS_SECURITY_ENABLE).is_some_and(|s| flag(&s));
        let security = security_enabled.then(|| SecurityEnvConfig {
            strategy: match get(ENV_ROS_SECURITY_STRATEGY) {
                Some(s) if s.eq_ignore_ascii_case("enforce") => SecurityStrategy::Enforce,
                _ => SecurityStrategy::Permissive,
            },
            keystore: get(ENV_ROS_SECURITY_KEYSTORE).map(PathBuf::from),
            enclave: enclave.clone(),
        });

        Self {
            log_level,
            enclave,
            listener_poll,
            security,
        }
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        *self != Self::default()
    }

    #[must_use]
    pub fn is_security_enabled(&self) -> bool {
        self.security.is_some()
    }

    /// Apply log level to the logging subsystem
    pub fn apply_log_level(&self) {
        let filter = match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        };
        log::set_max_level(filter);
    }
}

impl SecurityEnvConfig {
    /// `<keystore>/enclaves/<enclave>`, if a keystore is configured.
    #[must_use]
    pub fn enclave_root(&self) -> Option<PathBuf> {
        let keystore = self.keystore.as_ref()?;
        let relative = self.enclave.trim_start_matches('/');
        let mut root = keystore.join("enclaves");
        if !relative.is_empty() {
            root.push(relative);
        }
        Some(root)
    }

    /// Look up the enclave's security files.
    ///
    /// `Ok(None)` means "run without security", which only the permissive
    /// strategy allows.
    pub fn resolve_files(&self, prefix: &str) -> Result<Option<BTreeMap<String, String>>> {
        let lookup = match self.enclave_root() {
            Some(root) => get_security_files(prefix, &root),
            None => Err(Error::InvalidArgument(format!(
                "{} is not set",
                ENV_ROS_SECURITY_KEYSTORE
            ))),
        };
        match (lookup, self.strategy) {
            (Ok(files), _) => Ok(Some(files)),
            (Err(err), SecurityStrategy::Enforce) => Err(err),
            (Err(err), SecurityStrategy::Permissive) => {
                log::warn!(
                    "[security] enclave '{}' unusable ({}), continuing without security",
                    self.enclave,
                    err
                );
                Ok(None)
            }
        }
    }
}
