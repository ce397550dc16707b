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

//! The dispatcher and everything it owns.
//!
//! *   [`Dispatcher`]: registry, mailboxes, delivery flows and the lifecycle.
//! *   [`OrchestraConfig`]: mailbox, timeout and routing settings.
//! *   [`Stats`]: snapshots of the statistics feed.
//! *   [`SystemSnapshot`]: the serializable membership picture.

// --- Public Re-exports ---
pub use config::{BackpressurePolicy, MailboxConfig, OrchestraConfig, RoutingConfig, TimeoutConfig};
pub use dispatch_error::DispatchError;
pub use dispatcher::Dispatcher;
pub use dispatcher_state::DispatcherState;
pub use registry::{AgentInfo, AgentListing};
pub use snapshot::SystemSnapshot;
pub use stats::{AgentCounters, StatEvent, StatEventKind, Stats};
pub use types::*;

// --- Submodules ---

/// Identifier newtypes and processing type aliases.
mod types;

/// Configuration loaded from TOML / XDG locations.
mod config;
/// The per-agent delivery flow.
mod delivery;
mod dispatch_error;
/// The `Dispatcher` handle and its lifecycle.
mod dispatcher;
mod dispatcher_state;
/// Quiescence accounting.
mod in_flight;
/// Per-agent FIFO mailboxes.
mod mailbox;
/// Agent id → entry mapping, in registration order.
mod registry;
mod snapshot;
/// The statistics feed and its aggregates.
mod stats;
