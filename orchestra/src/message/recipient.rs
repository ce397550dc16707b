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

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::AgentId;

/// Where a message is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    /// Exactly one registered agent.
    Agent(AgentId),
    /// Every registered agent except the sender.
    Broadcast,
}

impl Recipient {
    /// Returns `true` for the broadcast marker.
    #[inline]
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self, Self::Broadcast)
    }

    /// Returns the addressed agent, or `None` for a broadcast.
    #[inline]
    #[must_use]
    pub const fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Self::Agent(id) => Some(id),
            Self::Broadcast => None,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent(id) => id.fmt(f),
            Self::Broadcast => f.write_str("*"),
        }
    }
}

impl From<AgentId> for Recipient {
    fn from(value: AgentId) -> Self {
        Self::Agent(value)
    }
}

impl From<&AgentId> for Recipient {
    fn from(value: &AgentId) -> Self {
        Self::Agent(value.clone())
    }
}

impl From<&str> for Recipient {
    fn from(value: &str) -> Self {
        Self::Agent(AgentId::from(value))
    }
}

impl From<String> for Recipient {
    fn from(value: String) -> Self {
        Self::Agent(AgentId::from(value))
    }
}
