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

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::{AgentId, MessageId};
use crate::message::{Message, MessageKind};

/// What a [`StatEvent`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatEventKind {
    /// A message was accepted for routing to one receiver.
    Sent,
    /// A delivery flow took a message out of its mailbox.
    Delivered,
    /// An agent finished processing a message without failing.
    Processed,
    /// An agent failed (or panicked) while processing a message.
    Error,
    /// A message was discarded before being processed.
    Dropped,
    AgentAdded,
    AgentRemoved,
}

impl fmt::Display for StatEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Processed => "processed",
            Self::Error => "error",
            Self::Dropped => "dropped",
            Self::AgentAdded => "agent_added",
            Self::AgentRemoved => "agent_removed",
        };
        f.write_str(name)
    }
}

/// One entry of the statistics feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: StatEventKind,
    pub sender: Option<AgentId>,
    pub receiver: Option<AgentId>,
    pub message_kind: Option<MessageKind>,
    pub message_id: Option<MessageId>,
    /// Why a message was dropped or why processing failed.
    pub reason: Option<String>,
}

impl StatEvent {
    fn bare(kind: StatEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            sender: None,
            receiver: None,
            message_kind: None,
            message_id: None,
            reason: None,
        }
    }

    /// An event about `message` on its way to `receiver`.
    pub(crate) fn for_message(kind: StatEventKind, message: &Message, receiver: &AgentId) -> Self {
        Self {
            sender: Some(message.sender().clone()),
            receiver: Some(receiver.clone()),
            message_kind: Some(message.kind().clone()),
            message_id: message.id().copied(),
            ..Self::bare(kind)
        }
    }

    /// Attributes the event to the message's own addressee; no receiver for a broadcast.
    pub(crate) fn for_addressee(kind: StatEventKind, message: &Message) -> Self {
        Self {
            sender: Some(message.sender().clone()),
            receiver: message.recipient().agent_id().cloned(),
            message_kind: Some(message.kind().clone()),
            message_id: message.id().copied(),
            ..Self::bare(kind)
        }
    }

    pub(crate) fn for_agent(kind: StatEventKind, agent: &AgentId) -> Self {
        Self {
            receiver: Some(agent.clone()),
            ..Self::bare(kind)
        }
    }

    #[must_use]
    pub(crate) fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Per-agent message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCounters {
    /// Messages this agent sent (or produced) that were accepted for routing.
    pub sent: usize,
    /// Messages delivered to this agent.
    pub received: usize,
    /// Messages this agent failed to process.
    pub errored: usize,
    /// Messages addressed to this agent that were dropped.
    pub dropped: usize,
}

/// The append-only event log behind [`Dispatcher::get_stats`](super::Dispatcher::get_stats).
///
/// Appends hold a short, non-async lock and never wait on dispatch.
#[derive(Debug, Default)]
pub(crate) struct StatsFeed {
    events: Mutex<Vec<StatEvent>>,
}

impl StatsFeed {
    pub(crate) fn record(&self, event: StatEvent) {
        self.events.lock().push(event);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats::from_events(self.events.lock().clone())
    }
}

/// An immutable snapshot of the statistics feed with its aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    events: Vec<StatEvent>,
    by_event: BTreeMap<StatEventKind, usize>,
    by_message_kind: BTreeMap<MessageKind, usize>,
    per_agent: BTreeMap<AgentId, AgentCounters>,
}

impl Stats {
    fn from_events(events: Vec<StatEvent>) -> Self {
        let mut by_event = BTreeMap::new();
        let mut by_message_kind = BTreeMap::new();
        let mut per_agent: BTreeMap<AgentId, AgentCounters> = BTreeMap::new();

        for event in &events {
            *by_event.entry(event.kind).or_insert(0) += 1;
            match event.kind {
                StatEventKind::Sent => {
                    if let Some(kind) = &event.message_kind {
                        *by_message_kind.entry(kind.clone()).or_insert(0) += 1;
                    }
                    if let Some(sender) = &event.sender {
                        per_agent.entry(sender.clone()).or_default().sent += 1;
                    }
                }
                StatEventKind::Delivered => {
                    if let Some(receiver) = &event.receiver {
                        per_agent.entry(receiver.clone()).or_default().received += 1;
                    }
                }
                StatEventKind::Error => {
                    if let Some(receiver) = &event.receiver {
                        per_agent.entry(receiver.clone()).or_default().errored += 1;
                    }
                }
                StatEventKind::Dropped => {
                    if let Some(receiver) = &event.receiver {
                        per_agent.entry(receiver.clone()).or_default().dropped += 1;
                    }
                }
                StatEventKind::Processed
                | StatEventKind::AgentAdded
                | StatEventKind::AgentRemoved => {}
            }
        }

        Self {
            events,
            by_event,
            by_message_kind,
            per_agent,
        }
    }

    /// The raw event sequence, oldest first.
    pub fn events(&self) -> &[StatEvent] {
        &self.events
    }

    /// Number of events of `kind`.
    pub fn count(&self, kind: StatEventKind) -> usize {
        self.by_event.get(&kind).copied().unwrap_or(0)
    }

    /// Number of accepted sends carrying messages of `kind`.
    pub fn messages_of_kind(&self, kind: &MessageKind) -> usize {
        self.by_message_kind.get(kind).copied().unwrap_or(0)
    }

    /// Totals of accepted sends, by message kind.
    pub fn by_message_kind(&self) -> &BTreeMap<MessageKind, usize> {
        &self.by_message_kind
    }

    /// Counters for one agent; all zero if the agent never appears in the feed.
    pub fn agent(&self, id: &AgentId) -> AgentCounters {
        self.per_agent.get(id).copied().unwrap_or_default()
    }

    pub fn per_agent(&self) -> &BTreeMap<AgentId, AgentCounters> {
        &self.per_agent
    }
}
