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

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::trace;

use crate::agent::{AgentProfile, AgentState};
use crate::common::mailbox::Mailbox;
use crate::common::{AgentId, DispatchError};
use crate::traits::Agent;

/// One registered agent: its behaviour, its mailbox and its runtime state.
pub(crate) struct AgentEntry {
    pub(crate) profile: AgentProfile,
    /// Only the delivery flow locks this, so at most one `process` runs at a time.
    pub(crate) agent: tokio::sync::Mutex<Box<dyn Agent>>,
    pub(crate) mailbox: Mailbox,
    state: Mutex<AgentState>,
}

impl AgentEntry {
    pub(crate) fn new(agent: Box<dyn Agent>, mailbox: Mailbox) -> Self {
        Self {
            profile: agent.profile().clone(),
            agent: tokio::sync::Mutex::new(agent),
            mailbox,
            state: Mutex::new(AgentState::Stopped),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> &AgentId {
        self.profile.id()
    }

    pub(crate) fn state(&self) -> AgentState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, next: AgentState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        if previous != next {
            trace!(agent = %self.id(), from = %previous, to = %next, "Agent state changed");
        }
    }

    pub(crate) fn info(&self) -> AgentInfo {
        AgentInfo {
            profile: self.profile.clone(),
            state: self.state(),
            queued: self.mailbox.depth(),
        }
    }
}

impl fmt::Debug for AgentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEntry")
            .field("profile", &self.profile)
            .field("state", &self.state())
            .field("queued", &self.mailbox.depth())
            .finish_non_exhaustive()
    }
}

/// A read-only view of a registered agent at the moment it was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
    /// Identity and descriptive attributes.
    pub profile: AgentProfile,
    /// Runtime state.
    pub state: AgentState,
    /// Messages waiting in the agent's mailbox.
    pub queued: usize,
}

/// The registered agents, in registration order.
///
/// Produced by [`Dispatcher::list_agents`](super::Dispatcher::list_agents). Membership
/// is fixed when the listing is taken; each call to [`AgentListing::iter`] starts
/// over and reads every agent's state and queue depth afresh.
#[derive(Debug, Clone)]
pub struct AgentListing {
    entries: Vec<Arc<AgentEntry>>,
}

impl AgentListing {
    /// Iterates the agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = AgentInfo> + '_ {
        self.entries.iter().map(|entry| entry.info())
    }

    /// Iterates the agent ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &AgentId> + '_ {
        self.entries.iter().map(|entry| entry.id())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a AgentListing {
    type Item = AgentInfo;
    type IntoIter = Box<dyn Iterator<Item = AgentInfo> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<AgentId, Arc<AgentEntry>>,
    order: Vec<AgentId>,
}

/// Maps agent ids to their entries and remembers registration order.
///
/// Insert, remove and iteration all take the same lock, so a listing or broadcast
/// never observes a half-removed entry.
#[derive(Default)]
pub(crate) struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub(crate) fn insert(&self, entry: AgentEntry) -> Result<Arc<AgentEntry>, DispatchError> {
        let mut inner = self.inner.write();
        if inner.entries.contains_key(entry.id()) {
            return Err(DispatchError::DuplicateIdentifier(entry.id().clone()));
        }
        let entry = Arc::new(entry);
        inner.order.push(entry.id().clone());
        inner.entries.insert(entry.id().clone(), entry.clone());
        Ok(entry)
    }

    pub(crate) fn remove(&self, id: &AgentId) -> Result<Arc<AgentEntry>, DispatchError> {
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .remove(id)
            .ok_or_else(|| DispatchError::UnknownAgent(id.clone()))?;
        inner.order.retain(|registered| registered != id);
        Ok(entry)
    }

    pub(crate) fn lookup(&self, id: &AgentId) -> Result<Arc<AgentEntry>, DispatchError> {
        self.inner
            .read()
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownAgent(id.clone()))
    }

    /// Every entry, in registration order.
    pub(crate) fn entries(&self) -> Vec<Arc<AgentEntry>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    pub(crate) fn listing(&self) -> AgentListing {
        AgentListing {
            entries: self.entries(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().entries.len()
    }
}
