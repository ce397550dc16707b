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

//! Per-agent FIFO mailboxes built on Tokio MPSC channels.
//!
//! Any number of `send` callers enqueue through the shared sender half; the receiver
//! half sits behind an async mutex that the owning delivery flow holds for its whole
//! lifetime. That lock is what makes "one consumer per mailbox" hold across
//! stop/start cycles and unregistration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::common::BackpressurePolicy;
use crate::message::Envelope;

/// Why an envelope could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnqueueError {
    /// Bounded mailbox full under the failing policy, or the enqueue timeout elapsed.
    Full,
    /// The mailbox was closed because its agent was unregistered.
    Closed,
    /// The dispatcher began stopping while the caller was waiting for space.
    Cancelled,
}

enum MailboxSender {
    Bounded(mpsc::Sender<Envelope>),
    Unbounded(mpsc::UnboundedSender<Envelope>),
}

/// The consuming half of a mailbox.
pub(crate) enum MailboxReceiver {
    Bounded(mpsc::Receiver<Envelope>),
    Unbounded(mpsc::UnboundedReceiver<Envelope>),
}

impl MailboxReceiver {
    /// Waits for the oldest envelope; `None` once the mailbox is closed and empty.
    pub(crate) async fn recv(&mut self) -> Option<Envelope> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Takes the oldest envelope without waiting.
    pub(crate) fn try_recv(&mut self) -> Option<Envelope> {
        let next = match self {
            Self::Bounded(rx) => rx.try_recv(),
            Self::Unbounded(rx) => rx.try_recv(),
        };
        match next {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    fn close(&mut self) {
        match self {
            Self::Bounded(rx) => rx.close(),
            Self::Unbounded(rx) => rx.close(),
        }
    }
}

/// Counts an envelope as queued before it is pushed, so the delivery flow can never
/// observe it before the count does. Released again unless the push succeeded, which
/// also covers an enqueue future dropped mid-wait.
struct DepthReservation<'a> {
    depth: &'a AtomicUsize,
    kept: bool,
}

impl<'a> DepthReservation<'a> {
    fn new(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::AcqRel);
        Self { depth, kept: false }
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for DepthReservation<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.depth.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// An ordered holding area for one agent's inbound messages.
pub(crate) struct Mailbox {
    sender: MailboxSender,
    receiver: Mutex<MailboxReceiver>,
    depth: AtomicUsize,
}

impl Mailbox {
    /// Creates a bounded mailbox for `Some(capacity)` and an unbounded one for `None`.
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                (MailboxSender::Bounded(tx), MailboxReceiver::Bounded(rx))
            }
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (MailboxSender::Unbounded(tx), MailboxReceiver::Unbounded(rx))
            }
        };
        Self {
            sender,
            receiver: Mutex::new(receiver),
            depth: AtomicUsize::new(0),
        }
    }

    /// Number of envelopes currently waiting.
    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Appends `envelope` at the tail.
    ///
    /// Unbounded mailboxes never wait. Bounded mailboxes either fail fast or wait for
    /// space according to `policy`; a blocking wait gives up with
    /// [`EnqueueError::Full`] after `timeout` and with [`EnqueueError::Cancelled`] once
    /// `stopping` fires.
    pub(crate) async fn enqueue(
        &self,
        envelope: Envelope,
        policy: BackpressurePolicy,
        timeout: Option<Duration>,
        stopping: &CancellationToken,
    ) -> Result<(), EnqueueError> {
        let reservation = DepthReservation::new(&self.depth);
        self.push(envelope, policy, timeout, stopping).await?;
        reservation.keep();
        Ok(())
    }

    async fn push(
        &self,
        envelope: Envelope,
        policy: BackpressurePolicy,
        timeout: Option<Duration>,
        stopping: &CancellationToken,
    ) -> Result<(), EnqueueError> {
        let tx = match &self.sender {
            MailboxSender::Unbounded(tx) => {
                return tx.send(envelope).map_err(|_| EnqueueError::Closed);
            }
            MailboxSender::Bounded(tx) => tx,
        };

        // Fast path: there is room right now.
        match tx.try_send(envelope) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(EnqueueError::Closed),
            Err(TrySendError::Full(_)) if policy == BackpressurePolicy::Fail => {
                return Err(EnqueueError::Full);
            }
            Err(TrySendError::Full(envelope)) => {
                trace!("Mailbox full, waiting for capacity");
                let permit = match timeout {
                    Some(limit) => tokio::select! {
                        biased;
                        () = stopping.cancelled() => return Err(EnqueueError::Cancelled),
                        reserved = tokio::time::timeout(limit, tx.reserve()) => match reserved {
                            Ok(Ok(permit)) => permit,
                            Ok(Err(_)) => return Err(EnqueueError::Closed),
                            Err(_) => return Err(EnqueueError::Full),
                        },
                    },
                    None => tokio::select! {
                        biased;
                        () = stopping.cancelled() => return Err(EnqueueError::Cancelled),
                        reserved = tx.reserve() => reserved.map_err(|_| EnqueueError::Closed)?,
                    },
                };
                permit.send(envelope);
                Ok(())
            }
        }
    }

    /// Crate-internal: bookkeeping after the delivery flow took an envelope out.
    pub(crate) fn note_dequeued(&self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }

    /// Locks the consuming half; held by a delivery flow for its lifetime.
    pub(crate) async fn lock_receiver(&self) -> tokio::sync::MutexGuard<'_, MailboxReceiver> {
        self.receiver.lock().await
    }

    /// Removes and returns everything still queued.
    pub(crate) async fn drain(&self) -> Vec<Envelope> {
        let mut receiver = self.receiver.lock().await;
        self.take_all(&mut receiver)
    }

    /// Closes the mailbox to further sends and returns everything still queued.
    pub(crate) async fn close_and_drain(&self) -> Vec<Envelope> {
        let mut receiver = self.receiver.lock().await;
        receiver.close();
        self.take_all(&mut receiver)
    }

    fn take_all(&self, receiver: &mut MailboxReceiver) -> Vec<Envelope> {
        let mut drained = Vec::new();
        while let Some(envelope) = receiver.try_recv() {
            self.note_dequeued();
            drained.push(envelope);
        }
        drained
    }
}
