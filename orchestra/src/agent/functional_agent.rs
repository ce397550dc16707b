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
use std::future::Future;

use async_trait::async_trait;

use crate::agent::AgentProfile;
use crate::common::{AsyncHandler, ProcessFuture, ProcessResult};
use crate::message::Message;
use crate::traits::Agent;

/// An agent whose behaviour is a user-supplied function.
///
/// The function receives each message by value and returns the optional outgoing
/// message. Anything the function needs across calls must be captured (for example
/// behind an `Arc`); for agent-owned mutable state use
/// [`StatefulAgent`](super::StatefulAgent).
///
/// # Example
///
/// ```rust,ignore
/// let collector = FunctionalAgent::from_fn(
///     AgentProfile::new("Collector", "ingest").with_id("collector"),
///     |message| Ok(Some(Message::new("collector", "analyzer", MessageKind::Info, message.content().clone()))),
/// );
/// ```
pub struct FunctionalAgent {
    profile: AgentProfile,
    handler: Box<AsyncHandler>,
}

impl FunctionalAgent {
    /// Wraps an asynchronous handler.
    pub fn new<F, Fut>(profile: AgentProfile, handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProcessResult> + Send + 'static,
    {
        Self {
            profile,
            handler: Box::new(move |message| -> ProcessFuture { Box::pin(handler(message)) }),
        }
    }

    /// Wraps a synchronous handler.
    pub fn from_fn<F>(profile: AgentProfile, handler: F) -> Self
    where
        F: Fn(Message) -> ProcessResult + Send + Sync + 'static,
    {
        Self::new(profile, move |message| futures::future::ready(handler(message)))
    }
}

impl fmt::Debug for FunctionalAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionalAgent")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for FunctionalAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn process(&mut self, message: Message) -> ProcessResult {
        (self.handler)(message).await
    }
}
