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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentProfile;
use crate::common::OrchestraConfig;

/// A serializable picture of a dispatcher's membership.
///
/// Holds agent identities, roles and capabilities in registration order together
/// with the configuration in effect. Message payloads and mailbox contents are
/// never included. Agent behaviour cannot be serialized, so restoring a system means
/// building agents from [`SystemSnapshot::agent_profiles`] and registering them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    agents: Vec<AgentProfile>,
    config: OrchestraConfig,
    taken_at: DateTime<Utc>,
}

impl SystemSnapshot {
    pub(crate) fn new(agents: Vec<AgentProfile>, config: OrchestraConfig) -> Self {
        Self {
            agents,
            config,
            taken_at: Utc::now(),
        }
    }

    /// The registered agents' profiles, in registration order.
    pub fn agent_profiles(&self) -> &[AgentProfile] {
        &self.agents
    }

    pub const fn config(&self) -> &OrchestraConfig {
        &self.config
    }

    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Renders the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a snapshot previously produced by [`SystemSnapshot::to_json`].
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}
