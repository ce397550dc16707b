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

//! The per-agent delivery flow.
//!
//! Each registered agent gets one flow per dispatcher run. The flow owns the
//! consuming half of the agent's mailbox, so messages are processed strictly in
//! arrival order and never concurrently.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, trace, warn};

use crate::agent::AgentState;
use crate::common::in_flight::InFlight;
use crate::common::registry::AgentEntry;
use crate::common::stats::{StatEvent, StatEventKind};
use crate::common::{DispatchError, Dispatcher};
use crate::message::{Envelope, Message, MessageKind};

/// Runs until `cancel` fires (forced stop or unregistration), or until `shutdown`
/// fires and the mailbox has been drained.
///
/// A flow that first gets polled after `shutdown` already fired still drains.
#[instrument(skip_all, fields(agent = %entry.id()))]
pub(crate) async fn run(
    dispatcher: Dispatcher,
    entry: Arc<AgentEntry>,
    shutdown: CancellationToken,
    cancel: CancellationToken,
) {
    if cancel.is_cancelled() {
        return;
    }
    let mut receiver = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        receiver = entry.mailbox.lock_receiver() => receiver,
    };
    entry.set_state(AgentState::Idle);
    trace!("Delivery flow started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                trace!("Delivery flow cancelled");
                break;
            }
            () = shutdown.cancelled() => {
                trace!("Draining mailbox before stop");
                while let Some(envelope) = receiver.try_recv() {
                    if !deliver(&dispatcher, &entry, envelope, &cancel).await {
                        break;
                    }
                }
                break;
            }
            next = receiver.recv() => {
                let Some(envelope) = next else {
                    trace!("Mailbox closed");
                    break;
                };
                if !deliver(&dispatcher, &entry, envelope, &cancel).await {
                    break;
                }
            }
        }
    }

    entry.set_state(AgentState::Stopped);
    trace!("Delivery flow finished");
}

/// Processes one envelope; `false` when processing was cancelled.
async fn deliver(
    dispatcher: &Dispatcher,
    entry: &AgentEntry,
    envelope: Envelope,
    cancel: &CancellationToken,
) -> bool {
    let _in_flight = InFlight::adopt(&dispatcher.0.in_flight);
    entry.mailbox.note_dequeued();
    let Envelope { message, hops } = envelope;
    dispatcher
        .0
        .stats
        .record(StatEvent::for_message(StatEventKind::Delivered, &message, entry.id()));

    let completed = tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = process(dispatcher, entry, &message, hops) => true,
    };
    if !completed {
        trace!(message_id = ?message.id(), "Processing cancelled");
        dispatcher.0.stats.record(
            StatEvent::for_message(StatEventKind::Dropped, &message, entry.id())
                .with_reason("processing cancelled"),
        );
    }
    completed
}

async fn process(dispatcher: &Dispatcher, entry: &AgentEntry, message: &Message, hops: u32) {
    entry.set_state(AgentState::Processing);
    let outcome = {
        let mut agent = entry.agent.lock().await;
        AssertUnwindSafe(agent.process(message.clone()))
            .catch_unwind()
            .await
    };

    match outcome {
        Ok(Ok(reply)) => {
            entry.set_state(AgentState::Idle);
            dispatcher
                .0
                .stats
                .record(StatEvent::for_message(StatEventKind::Processed, message, entry.id()));
            if let Some(reply) = reply {
                forward(dispatcher, entry, reply, hops).await;
            }
        }
        Ok(Err(err)) => fail(dispatcher, entry, message, hops, format!("{err:#}")).await,
        Err(panic) => fail(dispatcher, entry, message, hops, panic_reason(&*panic)).await,
    }
}

/// Routes an agent-produced message exactly as an external send would, except
/// that a full mailbox of the producing agent itself fails fast.
async fn forward(dispatcher: &Dispatcher, entry: &AgentEntry, reply: Message, hops: u32) {
    let hops = hops.saturating_add(1);
    if dispatcher
        .0
        .config
        .routing
        .max_hops
        .is_some_and(|limit| hops > limit)
    {
        warn!(hops, "Dropping produced message: hop limit exceeded");
        dispatcher.0.stats.record(
            StatEvent::for_addressee(StatEventKind::Dropped, &reply)
                .with_reason("hop limit exceeded"),
        );
        return;
    }

    let timeout = dispatcher.0.config.send_timeout();
    if let Err(err) = dispatcher
        .route(reply, hops, timeout, Some(entry.id()))
        .await
    {
        warn!("Could not route produced message: {err}");
    }
}

async fn fail(
    dispatcher: &Dispatcher,
    entry: &AgentEntry,
    message: &Message,
    hops: u32,
    reason: String,
) {
    entry.set_state(AgentState::Errored);
    let failure = DispatchError::ProcessingFailure {
        agent: entry.id().clone(),
        reason: reason.clone(),
    };
    error!(message_id = ?message.id(), kind = %message.kind(), "{failure}");
    dispatcher.0.stats.record(
        StatEvent::for_message(StatEventKind::Error, message, entry.id()).with_reason(&reason),
    );

    // Failed ERROR messages get no notice of their own.
    if *message.kind() != MessageKind::Error {
        let notice = Message::error_notice(entry.id(), message, &reason);
        let timeout = dispatcher.0.config.send_timeout();
        if let Err(err) = dispatcher
            .route(notice, hops.saturating_add(1), timeout, Some(entry.id()))
            .await
        {
            warn!(to = %message.sender(), "Could not deliver error notice: {err}");
        }
    }
    entry.set_state(AgentState::Idle);
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("panicked: {text}")
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("panicked: {text}")
    } else {
        "panicked".to_string()
    }
}
