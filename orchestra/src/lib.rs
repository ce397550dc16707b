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

#![forbid(unsafe_code)]

//! # Orchestra
//!
//! A message routing and dispatch core for cooperating agents, built on Tokio.
//!
//! ## Key Concepts
//!
//! - **Agents**: anything implementing [`Agent`](prelude::Agent). Each agent turns
//!   one incoming [`Message`](prelude::Message) into at most one outgoing message.
//!   [`FunctionalAgent`](prelude::FunctionalAgent) wraps a function and
//!   [`StatefulAgent`](prelude::StatefulAgent) owns mutable state.
//! - **Dispatcher**: the caller-owned [`Dispatcher`](prelude::Dispatcher) keeps the
//!   registry, gives every agent a FIFO mailbox and runs one delivery flow per agent.
//!   Produced messages are routed exactly like external sends.
//! - **Failure isolation**: an agent that returns an error or panics is logged,
//!   recorded, and answered with an ERROR message to the sender. Its flow keeps
//!   going and no other agent notices.
//! - **Statistics**: every send, delivery, failure and drop lands in an append-only
//!   feed, read through [`Dispatcher::get_stats`](prelude::Dispatcher::get_stats).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use orchestra::prelude::*;
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::new(OrchestraConfig::default());
//! dispatcher.register(FunctionalAgent::from_fn(
//!     AgentProfile::new("Echo", "demo").with_id("echo"),
//!     |message| Ok(Some(message.reply("echo", MessageKind::Response, message.content().clone()))),
//! ))?;
//! dispatcher.start().await?;
//! dispatcher
//!     .send(Message::new("user", "echo", MessageKind::Query, json!("ping")))
//!     .await?;
//! dispatcher.stop(true).await?;
//! ```

/// The dispatcher, registry, mailboxes, configuration and statistics.
pub(crate) mod common;

/// Agent profiles, runtime states and the ready-made agent types.
pub(crate) mod agent;

/// The message model.
pub(crate) mod message;

/// The `Agent` trait.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Third-party
/// *   [`async_trait::async_trait`]: needed to implement [`Agent`](crate::prelude::Agent).
///
/// ## Core types
/// *   [`Dispatcher`](crate::common::Dispatcher), [`DispatcherState`](crate::common::DispatcherState)
///     and [`DispatchError`](crate::common::DispatchError).
/// *   [`OrchestraConfig`](crate::common::OrchestraConfig) and its sections.
/// *   [`Message`](crate::message::Message), [`MessageKind`](crate::message::MessageKind),
///     [`Priority`](crate::message::Priority) and [`Recipient`](crate::message::Recipient).
/// *   [`AgentProfile`](crate::agent::AgentProfile), [`AgentState`](crate::agent::AgentState),
///     [`FunctionalAgent`](crate::agent::FunctionalAgent) and
///     [`StatefulAgent`](crate::agent::StatefulAgent).
/// *   [`Stats`](crate::common::Stats) and the event types behind it.
pub mod prelude {
    pub use async_trait::async_trait;

    pub use crate::agent::{AgentProfile, AgentState, FunctionalAgent, StatefulAgent};
    pub use crate::common::{
        AgentCounters, AgentId, AgentInfo, AgentListing, AsyncHandler, BackpressurePolicy,
        DispatchError, Dispatcher, DispatcherState, MailboxConfig, MessageId, OrchestraConfig,
        ProcessFuture, ProcessResult, RoutingConfig, StatEvent, StatEventKind, StatefulHandler,
        Stats, SystemSnapshot, TimeoutConfig,
    };
    pub use crate::message::{Message, MessageKind, Priority, Recipient, IN_REPLY_TO};
    pub use crate::traits::Agent;
}
