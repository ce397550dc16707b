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

/// The category of a [`Message`](super::Message).
///
/// Kinds are informational for agents and statistics; routing never inspects them,
/// with one exception: a failure while processing an [`MessageKind::Error`] message
/// does not produce another error notice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// An instruction for the receiver to act.
    Command,
    /// Informational content with no expected reply.
    Info,
    /// The output of a completed unit of work.
    Result,
    /// A failure report.
    Error,
    /// A request for information.
    Query,
    /// The answer to a [`MessageKind::Query`].
    Response,
    /// Traffic originating from the orchestration layer itself.
    System,
    /// An application-defined kind.
    Custom(String),
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Info => f.write_str("info"),
            Self::Result => f.write_str("result"),
            Self::Error => f.write_str("error"),
            Self::Query => f.write_str("query"),
            Self::Response => f.write_str("response"),
            Self::System => f.write_str("system"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// Advisory importance of a message.
///
/// Carried for agents and visualizers only. Mailboxes are strictly FIFO and never
/// reorder by priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background traffic.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Time-sensitive traffic.
    High,
    /// Traffic an operator should notice.
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}
