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

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::common::AgentId;

/// Identity and descriptive attributes of an agent.
///
/// Capabilities are free-form tags for introspection and visualization; routing never
/// looks at them. Profiles are the part of an agent that survives in a
/// [`SystemSnapshot`](crate::common::SystemSnapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    id: AgentId,
    name: String,
    role: String,
    #[serde(default)]
    capabilities: BTreeSet<String>,
}

impl AgentProfile {
    /// Creates a profile with a generated id.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: AgentId::generate(),
            name: name.into(),
            role: role.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Replaces the generated id with a caller-chosen one.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<AgentId>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds one capability tag.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Adds several capability tags.
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    #[inline]
    pub const fn id(&self) -> &AgentId {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[inline]
    pub const fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Returns `true` if the profile carries `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_caller_id_and_dedupes_capabilities() {
        let profile = AgentProfile::new("Collector", "ingest")
            .with_id("collector")
            .with_capabilities(["http", "csv"])
            .with_capability("http");

        assert_eq!(profile.id().as_str(), "collector");
        assert_eq!(profile.capabilities().len(), 2);
        assert!(profile.has_capability("csv"));
    }
}
