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
use std::fmt::Debug;

use async_trait::async_trait;

use crate::agent::AgentProfile;
use crate::common::{ProcessResult, StatefulHandler};
use crate::message::Message;
use crate::traits::Agent;

/// An agent that owns a piece of state and mutates it on every message.
///
/// Because the dispatcher never runs two `process` calls for the same agent at once,
/// the handler gets `&mut State` without any locking.
///
/// # Example
///
/// ```rust,ignore
/// let counter = StatefulAgent::new(
///     AgentProfile::new("Counter", "metrics").with_id("counter"),
///     0_u64,
///     |seen, _message| {
///         *seen += 1;
///         Ok(None)
///     },
/// );
/// ```
pub struct StatefulAgent<State: Send + 'static> {
    profile: AgentProfile,
    state: State,
    handler: Box<StatefulHandler<State>>,
}

impl<State: Send + 'static> StatefulAgent<State> {
    /// Creates the agent with its initial `state`.
    pub fn new<F>(profile: AgentProfile, state: State, handler: F) -> Self
    where
        F: FnMut(&mut State, Message) -> ProcessResult + Send + 'static,
    {
        Self {
            profile,
            state,
            handler: Box::new(handler),
        }
    }

    /// Read access to the current state.
    #[inline]
    pub const fn state(&self) -> &State {
        &self.state
    }
}

impl<State: Send + Debug + 'static> Debug for StatefulAgent<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulAgent")
            .field("profile", &self.profile)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<State: Send + 'static> Agent for StatefulAgent<State> {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn process(&mut self, message: Message) -> ProcessResult {
        (self.handler)(&mut self.state, message)
    }
}
