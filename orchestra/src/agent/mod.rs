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

//! Agent-side building blocks: identity ([`AgentProfile`]), runtime state
//! ([`AgentState`]) and the two ready-made [`Agent`](crate::traits::Agent) flavours.
//!
//! *   [`FunctionalAgent`] wraps a plain (sync or async) function.
//! *   [`StatefulAgent`] owns state that its handler mutates on every message.
//!
//! Anything else implements [`Agent`](crate::traits::Agent) directly.

pub use agent_profile::AgentProfile;
pub use agent_state::AgentState;
pub use functional_agent::FunctionalAgent;
pub use stateful_agent::StatefulAgent;

mod agent_profile;
mod agent_state;
mod functional_agent;
mod stateful_agent;
