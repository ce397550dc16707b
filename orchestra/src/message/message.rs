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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::{AgentId, MessageId};
use crate::message::{MessageKind, Priority, Recipient};

/// Metadata key under which error notices reference the message that failed.
pub const IN_REPLY_TO: &str = "in_reply_to";

/// An immutable record exchanged between agents.
///
/// A `Message` is built with [`Message::new`] (or [`Message::broadcast`]) and the
/// `with_*` builders, then handed to
/// [`Dispatcher::send`](crate::common::Dispatcher::send). Its [`id`](Message::id) is
/// `None` until it is sent: the dispatcher stamps every delivered copy with a fresh
/// [`MessageId`], so each clone of a broadcast carries its own id.
///
/// Messages serialize with `serde`; the content payload and metadata values are
/// arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Option<MessageId>,
    sender: AgentId,
    recipient: Recipient,
    kind: MessageKind,
    content: Value,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message from `sender` to `recipient`.
    pub fn new(
        sender: impl Into<AgentId>,
        recipient: impl Into<Recipient>,
        kind: MessageKind,
        content: Value,
    ) -> Self {
        Self {
            id: None,
            sender: sender.into(),
            recipient: recipient.into(),
            kind,
            content,
            priority: Priority::default(),
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a message addressed to every registered agent except `sender`.
    pub fn broadcast(sender: impl Into<AgentId>, kind: MessageKind, content: Value) -> Self {
        Self::new(sender, Recipient::Broadcast, kind, content)
    }

    /// Creates a message from `sender` addressed back to this message's sender.
    #[must_use]
    pub fn reply(&self, sender: impl Into<AgentId>, kind: MessageKind, content: Value) -> Self {
        let mut reply = Self::new(sender, self.sender.clone(), kind, content);
        if let Some(id) = self.id {
            reply.metadata.insert(IN_REPLY_TO.to_string(), json!(id));
        }
        reply
    }

    /// Sets the advisory priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Adds one metadata entry, replacing any previous value under `key`.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The id stamped at send time, or `None` for a message that was never sent.
    #[inline]
    pub const fn id(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }

    /// The sending agent (or external caller) identifier.
    #[inline]
    pub const fn sender(&self) -> &AgentId {
        &self.sender
    }

    /// The addressee.
    #[inline]
    pub const fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    /// The message category.
    #[inline]
    pub const fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// The payload.
    #[inline]
    pub const fn content(&self) -> &Value {
        &self.content
    }

    /// The advisory priority.
    #[inline]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Application metadata.
    #[inline]
    pub const fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// When the message was constructed.
    #[inline]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Crate-internal: a copy of this message carrying a freshly assigned id.
    #[cfg(test)]
    pub(crate) fn stamped(&self) -> Self {
        self.clone().assign_id(MessageId::generate())
    }

    pub(crate) fn assign_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Crate-internal: the ERROR notice sent back to `failed`'s sender when `agent`
    /// could not process it.
    pub(crate) fn error_notice(agent: &AgentId, failed: &Self, reason: &str) -> Self {
        failed
            .reply(
                agent.clone(),
                MessageKind::Error,
                json!({
                    "error": reason,
                    "failed_kind": failed.kind,
                }),
            )
            .with_priority(Priority::High)
    }
}
