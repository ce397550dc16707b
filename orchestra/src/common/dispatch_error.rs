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

use crate::common::AgentId;

/// Errors surfaced by the [`Dispatcher`](super::Dispatcher) public operations.
///
/// Every caller-facing operation reports its specific failure synchronously.
/// [`DispatchError::ProcessingFailure`] is the exception: it is built at the
/// delivery-flow boundary, logged and recorded, and never returned to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// An agent with this id is already registered.
    DuplicateIdentifier(AgentId),
    /// No agent with this id is registered.
    UnknownAgent(AgentId),
    /// The dispatcher is not in a state that accepts the operation.
    NotRunning,
    /// `start` was called while the dispatcher was not stopped.
    AlreadyRunning,
    /// The receiver's bounded mailbox is full and the policy (or enqueue timeout)
    /// forbids waiting.
    MailboxFull(AgentId),
    /// An agent's processing operation failed or panicked.
    ProcessingFailure {
        /// The agent whose processing failed.
        agent: AgentId,
        /// Rendered failure, including the error chain or panic payload.
        reason: String,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIdentifier(id) => write!(f, "Agent id already registered: {id}"),
            Self::UnknownAgent(id) => write!(f, "Unknown agent: {id}"),
            Self::NotRunning => write!(f, "Dispatcher is not running"),
            Self::AlreadyRunning => write!(f, "Dispatcher is already running"),
            Self::MailboxFull(id) => write!(f, "Mailbox of agent {id} is full"),
            Self::ProcessingFailure { agent, reason } => {
                write!(f, "Agent {agent} failed to process message: {reason}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}
