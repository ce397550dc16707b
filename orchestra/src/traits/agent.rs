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

use async_trait::async_trait;

use crate::agent::AgentProfile;
use crate::common::ProcessResult;
use crate::message::Message;

/// The processing contract every participant in an orchestration implements.
///
/// The dispatcher guarantees that `process` is never invoked concurrently for the
/// same agent, and that messages arrive in the order they were enqueued. An
/// implementation therefore needs `Send` but not `Sync`, and may keep plain mutable
/// state behind `&mut self`.
///
/// Returning `Ok(Some(message))` hands `message` to
/// [`Dispatcher::send`](crate::common::Dispatcher::send) exactly as if an external
/// caller had sent it; this is how pipelines chain. Expected domain failures should
/// be expressed in the returned message. An `Err` (or a panic) is caught by the
/// delivery flow, recorded, and answered with an ERROR message to the original sender.
///
/// Processing may be cancelled at any `.await` point when the dispatcher is stopped
/// without grace or the agent is unregistered; partial side effects are the
/// implementation's own responsibility.
///
/// # Example
///
/// ```rust,ignore
/// use orchestra::prelude::*;
///
/// struct Echo {
///     profile: AgentProfile,
/// }
///
/// #[async_trait]
/// impl Agent for Echo {
///     fn profile(&self) -> &AgentProfile {
///         &self.profile
///     }
///
///     async fn process(&mut self, message: Message) -> ProcessResult {
///         let content = message.content().clone();
///         Ok(Some(message.reply(self.profile.id().clone(), MessageKind::Response, content)))
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + 'static {
    /// Identity, display name, role and capabilities of this agent.
    ///
    /// Read once at registration; the id must not change afterwards.
    fn profile(&self) -> &AgentProfile;

    /// Processes one message, optionally producing one outgoing message.
    async fn process(&mut self, message: Message) -> ProcessResult;
}
