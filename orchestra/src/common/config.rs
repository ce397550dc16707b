/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Configuration for an Orchestra [`Dispatcher`](super::Dispatcher).
///
/// Every section and field has a default, so a TOML file only needs the values it
/// overrides:
///
/// ```toml
/// [mailbox]
/// capacity = 64          # 0 means unbounded
/// backpressure = "fail"  # or "block"
///
/// [timeouts]
/// grace_period_ms = 2000
/// send_timeout_ms = 250
///
/// [routing]
/// max_hops = 16
/// broadcast_includes_sender = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestraConfig {
    /// Mailbox sizing and backpressure
    pub mailbox: MailboxConfig,
    /// Shutdown and enqueue deadlines
    pub timeouts: TimeoutConfig,
    /// Routing limits and broadcast semantics
    pub routing: RoutingConfig,
}

/// What `send` does when the target's bounded mailbox is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressurePolicy {
    /// Suspend the caller until space frees up (or the enqueue timeout elapses).
    ///
    /// An agent producing a message for its own full mailbox is the exception: that
    /// send fails with `MailboxFull` at once. Agents that send to each other in a
    /// cycle can still block each other forever once both mailboxes are full; set
    /// a send timeout to bound such waits.
    #[default]
    Block,
    /// Fail immediately with `MailboxFull`.
    Fail,
}

/// Mailbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Per-agent mailbox capacity; `0` makes mailboxes unbounded
    pub capacity: usize,
    /// Policy applied when a bounded mailbox is full
    pub backpressure: BackpressurePolicy,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a graceful stop lets delivery flows drain, in milliseconds
    pub grace_period_ms: u64,
    /// Default enqueue deadline for blocking sends, in milliseconds; none when absent
    pub send_timeout_ms: Option<u64>,
}

/// Routing configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum number of agent-produced re-sends in one chain; unlimited when absent
    pub max_hops: Option<u32>,
    /// Whether a broadcast is also delivered to its sender
    pub broadcast_includes_sender: bool,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            backpressure: BackpressurePolicy::Block,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
            send_timeout_ms: None,
        }
    }
}

impl OrchestraConfig {
    /// Mailbox capacity, or `None` for unbounded mailboxes.
    pub const fn mailbox_capacity(&self) -> Option<usize> {
        match self.mailbox.capacity {
            0 => None,
            n => Some(n),
        }
    }

    /// Convert the graceful-stop grace period to a `Duration`.
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.timeouts.grace_period_ms)
    }

    /// Convert the default enqueue timeout to a `Duration`.
    pub fn send_timeout(&self) -> Option<Duration> {
        self.timeouts.send_timeout_ms.map(Duration::from_millis)
    }

    /// Sets the mailbox capacity (`0` for unbounded).
    #[must_use]
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox.capacity = capacity;
        self
    }

    /// Sets the backpressure policy.
    #[must_use]
    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.mailbox.backpressure = policy;
        self
    }

    /// Sets the graceful-stop grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.timeouts.grace_period_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the default enqueue timeout for blocking sends.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.send_timeout_ms =
            Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Caps the length of agent-to-agent re-send chains.
    #[must_use]
    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.routing.max_hops = Some(max_hops);
        self
    }

    /// Chooses whether broadcasts are delivered back to their sender.
    #[must_use]
    pub fn with_broadcast_includes_sender(mut self, include: bool) -> Self {
        self.routing.broadcast_includes_sender = include;
        self
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load configuration from an explicit file.
    ///
    /// A missing or malformed file is logged and yields the default configuration.
    pub fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(config_str) => match Self::from_toml_str(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `orchestra/config.toml` under `$XDG_CONFIG_HOME` (falling back to
    /// `~/.config`) and the XDG system config directories. If no configuration file
    /// is found, or the file is malformed, the default configuration is returned and
    /// the reason is logged.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("orchestra") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            Self::load_from(&path)
        } else {
            info!("No configuration file found, using defaults");
            Self::default()
        }
    }
}
