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
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace, warn};

use crate::agent::{AgentProfile, AgentState};
use crate::common::delivery;
use crate::common::in_flight::InFlight;
use crate::common::mailbox::{EnqueueError, Mailbox};
use crate::common::registry::{AgentEntry, Registry};
use crate::common::stats::{StatEvent, StatEventKind, StatsFeed};
use crate::common::{
    AgentId, AgentInfo, AgentListing, BackpressurePolicy, DispatchError, DispatcherState,
    MessageId, OrchestraConfig, Stats, SystemSnapshot,
};
use crate::message::{Envelope, Message, Recipient};
use crate::traits::Agent;

/// The caller-owned orchestrator: a registry of agents, one mailbox per agent, and
/// one delivery flow per agent while running.
///
/// `Dispatcher` is a cheap handle; clones share the same registry, mailboxes and
/// statistics. There is no global instance: construct one with
/// [`Dispatcher::new`] and pass it (or clones of it) to whatever needs to send.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(OrchestraConfig::default());
/// dispatcher.register(collector)?;
/// dispatcher.start().await?;
/// dispatcher
///     .send(Message::new("user", "collector", MessageKind::Command, json!("go")))
///     .await?;
/// dispatcher.wait_until_quiet(Duration::from_secs(1)).await;
/// dispatcher.stop(true).await?;
/// ```
#[derive(Clone)]
pub struct Dispatcher(pub(crate) Arc<DispatcherInner>);

pub(crate) struct DispatcherInner {
    pub(crate) config: OrchestraConfig,
    pub(crate) registry: Registry,
    pub(crate) stats: StatsFeed,
    /// Queued plus processing messages, across all agents.
    pub(crate) in_flight: watch::Sender<usize>,
    state: watch::Sender<DispatcherState>,
    /// Serializes `start` and `stop`.
    lifecycle: tokio::sync::Mutex<()>,
    /// Present from `start` until `stop` begins.
    run: RwLock<Option<RunContext>>,
    flows: DashMap<AgentId, FlowHandle>,
    runs: AtomicU64,
}

/// Everything one `start`/`stop` cycle shares with its delivery flows.
#[derive(Clone)]
struct RunContext {
    epoch: u64,
    /// Asks flows to drain their mailbox and finish.
    shutdown: CancellationToken,
    /// Cancels in-flight processing; parent of every flow's token.
    abort: CancellationToken,
    tracker: TaskTracker,
    runtime: Handle,
}

struct FlowHandle {
    epoch: u64,
    cancel: CancellationToken,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(OrchestraConfig::default())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state())
            .field("agents", &self.0.registry.len())
            .field("config", &self.0.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a stopped dispatcher with no agents.
    pub fn new(config: OrchestraConfig) -> Self {
        let (state, _) = watch::channel(DispatcherState::Stopped);
        let (in_flight, _) = watch::channel(0);
        Self(Arc::new(DispatcherInner {
            config,
            registry: Registry::default(),
            stats: StatsFeed::default(),
            in_flight,
            state,
            lifecycle: tokio::sync::Mutex::new(()),
            run: RwLock::new(None),
            flows: DashMap::new(),
            runs: AtomicU64::new(0),
        }))
    }

    /// Creates a dispatcher configured from `$XDG_CONFIG_HOME/orchestra/config.toml`.
    ///
    /// See [`OrchestraConfig::load`].
    pub fn from_xdg_config() -> Self {
        Self::new(OrchestraConfig::load())
    }

    #[inline]
    pub fn config(&self) -> &OrchestraConfig {
        &self.0.config
    }

    /// The current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        *self.0.state.borrow()
    }

    fn set_state(&self, next: DispatcherState) {
        let previous = self.0.state.send_replace(next);
        debug!(from = %previous, to = %next, "Dispatcher state changed");
    }

    /// Adds `agent` with an empty mailbox.
    ///
    /// While the dispatcher is starting or running, the agent's delivery flow is
    /// launched immediately.
    ///
    /// # Errors
    ///
    /// [`DispatchError::DuplicateIdentifier`] if an agent with the same id exists.
    pub fn register<A: Agent>(&self, agent: A) -> Result<AgentId, DispatchError> {
        self.register_boxed(Box::new(agent))
    }

    /// Same as [`Dispatcher::register`] for an already boxed agent.
    ///
    /// # Errors
    ///
    /// [`DispatchError::DuplicateIdentifier`] if an agent with the same id exists.
    #[instrument(skip_all, fields(agent = %agent.profile().id()))]
    pub fn register_boxed(&self, agent: Box<dyn Agent>) -> Result<AgentId, DispatchError> {
        let entry = AgentEntry::new(agent, Mailbox::new(self.0.config.mailbox_capacity()));
        let entry = self.0.registry.insert(entry)?;
        let id = entry.id().clone();
        self.0
            .stats
            .record(StatEvent::for_agent(StatEventKind::AgentAdded, &id));
        debug!(name = entry.profile.name(), role = entry.profile.role(), "Agent registered");

        if self.state().accepts_messages() {
            // Held across the spawn; `stop` takes the run under the write lock.
            let run = self.0.run.read();
            if let Some(run) = run.as_ref() {
                self.spawn_flow(run, entry);
            }
        }
        Ok(id)
    }

    /// Removes an agent, cancelling its flow and discarding its queued messages.
    ///
    /// Every discarded message is recorded as dropped. Returns the removed agent's
    /// profile.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownAgent`] if no agent has this id.
    #[instrument(skip(self))]
    pub async fn unregister(&self, id: &AgentId) -> Result<AgentProfile, DispatchError> {
        let entry = self.0.registry.remove(id)?;
        if let Some((_, flow)) = self.0.flows.remove(id) {
            flow.cancel.cancel();
        }

        // Waits for the flow to release the receiving half.
        let discarded = entry.mailbox.close_and_drain().await;
        if !discarded.is_empty() {
            warn!(count = discarded.len(), "Dropping queued messages of unregistered agent");
        }
        self.discard(&entry, discarded, "agent unregistered");

        entry.set_state(AgentState::Stopped);
        self.0
            .stats
            .record(StatEvent::for_agent(StatEventKind::AgentRemoved, id));
        debug!("Agent unregistered");
        Ok(entry.profile.clone())
    }

    /// Describes one registered agent.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownAgent`] if no agent has this id.
    pub fn lookup(&self, id: &AgentId) -> Result<AgentInfo, DispatchError> {
        self.0.registry.lookup(id).map(|entry| entry.info())
    }

    /// The runtime state of one agent.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownAgent`] if no agent has this id.
    pub fn agent_state(&self, id: &AgentId) -> Result<AgentState, DispatchError> {
        self.0.registry.lookup(id).map(|entry| entry.state())
    }

    /// All registered agents in registration order.
    pub fn list_agents(&self) -> AgentListing {
        self.0.registry.listing()
    }

    #[inline]
    pub fn agent_count(&self) -> usize {
        self.0.registry.len()
    }

    /// Launches one delivery flow per registered agent.
    ///
    /// # Errors
    ///
    /// [`DispatchError::AlreadyRunning`] unless the dispatcher is stopped.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), DispatchError> {
        if self.state() != DispatcherState::Stopped {
            return Err(DispatchError::AlreadyRunning);
        }
        let _lifecycle = self.0.lifecycle.lock().await;
        if self.state() != DispatcherState::Stopped {
            return Err(DispatchError::AlreadyRunning);
        }

        let run = RunContext {
            epoch: self.0.runs.fetch_add(1, Ordering::AcqRel) + 1,
            shutdown: CancellationToken::new(),
            abort: CancellationToken::new(),
            tracker: TaskTracker::new(),
            runtime: Handle::current(),
        };
        *self.0.run.write() = Some(run.clone());
        self.set_state(DispatcherState::Starting);

        let entries = self.0.registry.entries();
        trace!(agents = entries.len(), "Launching delivery flows");
        for entry in entries {
            self.spawn_flow(&run, entry);
        }

        self.set_state(DispatcherState::Running);
        Ok(())
    }

    /// Stops every delivery flow.
    ///
    /// A graceful stop lets each flow finish its current message and drain its
    /// mailbox for up to the configured grace period, after which processing is
    /// cancelled. A forced stop cancels in-flight processing immediately. Messages
    /// still queued afterwards are recorded as dropped. Calling `stop` while another
    /// stop is in progress waits for that stop to complete.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotRunning`] unless the dispatcher is running or stopping.
    #[instrument(skip(self))]
    pub async fn stop(&self, graceful: bool) -> Result<(), DispatchError> {
        if self.state() == DispatcherState::Stopping {
            let mut state = self.0.state.subscribe();
            // The sender lives as long as `self`, so this cannot fail.
            let _ = state
                .wait_for(|state| *state == DispatcherState::Stopped)
                .await;
            return Ok(());
        }

        let observed = self.state();
        let _lifecycle = self.0.lifecycle.lock().await;
        if self.state() != DispatcherState::Running {
            // Another stop completed while this one waited for the lock.
            return match (observed, self.state()) {
                (DispatcherState::Running, DispatcherState::Stopped) => Ok(()),
                _ => Err(DispatchError::NotRunning),
            };
        }

        self.set_state(DispatcherState::Stopping);
        let run = self.0.run.write().take();
        let Some(run) = run else {
            self.set_state(DispatcherState::Stopped);
            return Err(DispatchError::NotRunning);
        };
        run.tracker.close();

        let reason = if graceful {
            run.shutdown.cancel();
            let grace = self.0.config.grace_period();
            if tokio::time::timeout(grace, run.tracker.wait()).await.is_ok() {
                "dispatcher stopped"
            } else {
                warn!(?grace, "Grace period elapsed, cancelling in-flight processing");
                run.abort.cancel();
                run.tracker.wait().await;
                "grace period elapsed"
            }
        } else {
            run.abort.cancel();
            run.shutdown.cancel();
            run.tracker.wait().await;
            "dispatcher stopped"
        };

        self.0.flows.retain(|_, flow| flow.epoch != run.epoch);
        for entry in self.0.registry.entries() {
            let leftover = entry.mailbox.drain().await;
            if !leftover.is_empty() {
                warn!(agent = %entry.id(), count = leftover.len(), reason, "Dropping undelivered messages");
            }
            self.discard(&entry, leftover, reason);
            entry.set_state(AgentState::Stopped);
        }

        self.set_state(DispatcherState::Stopped);
        Ok(())
    }

    /// Routes `message` to its receiver, or to every other agent for a broadcast.
    ///
    /// Returns the id assigned to each enqueued copy, in registration order for a
    /// broadcast. Under the blocking backpressure policy this waits for mailbox
    /// space, bounded by the configured send timeout if there is one.
    ///
    /// # Errors
    ///
    /// * [`DispatchError::NotRunning`] unless the dispatcher is starting or running.
    /// * [`DispatchError::UnknownAgent`] if the receiver is not registered.
    /// * [`DispatchError::MailboxFull`] if the receiver's mailbox is full and the
    ///   policy (or timeout) does not allow waiting any longer.
    #[instrument(skip(self, message), fields(sender = %message.sender(), recipient = %message.recipient(), kind = %message.kind()))]
    pub async fn send(&self, message: Message) -> Result<Vec<MessageId>, DispatchError> {
        self.route(message, 0, self.0.config.send_timeout(), None)
            .await
    }

    /// Like [`Dispatcher::send`] with an explicit deadline for waiting on a full
    /// mailbox. Expiry surfaces as [`DispatchError::MailboxFull`].
    ///
    /// # Errors
    ///
    /// As [`Dispatcher::send`].
    #[instrument(skip(self, message), fields(sender = %message.sender(), recipient = %message.recipient(), kind = %message.kind()))]
    pub async fn send_with_timeout(
        &self,
        message: Message,
        timeout: Duration,
    ) -> Result<Vec<MessageId>, DispatchError> {
        self.route(message, 0, Some(timeout), None).await
    }

    /// Routes an external send (`producer` is `None`) or a message produced by an
    /// agent's delivery flow.
    pub(crate) async fn route(
        &self,
        message: Message,
        hops: u32,
        timeout: Option<Duration>,
        producer: Option<&AgentId>,
    ) -> Result<Vec<MessageId>, DispatchError> {
        if !self.state().accepts_messages() {
            return Err(DispatchError::NotRunning);
        }
        let run = self.0.run.read().clone();
        let Some(run) = run else {
            return Err(DispatchError::NotRunning);
        };

        match message.recipient() {
            Recipient::Agent(id) => {
                let entry = self.0.registry.lookup(id)?;
                let message_id = self.enqueue(&run, &entry, &message, hops, timeout, producer).await?;
                Ok(vec![message_id])
            }
            Recipient::Broadcast => {
                let include_sender = self.0.config.routing.broadcast_includes_sender;
                let mut ids = Vec::new();
                for entry in self.0.registry.entries() {
                    if !include_sender && entry.id() == message.sender() {
                        continue;
                    }
                    match self.enqueue(&run, &entry, &message, hops, timeout, producer).await {
                        Ok(message_id) => ids.push(message_id),
                        Err(DispatchError::NotRunning) => return Err(DispatchError::NotRunning),
                        Err(err) => warn!(agent = %entry.id(), "Broadcast copy not delivered: {err}"),
                    }
                }
                trace!(copies = ids.len(), "Broadcast routed");
                Ok(ids)
            }
        }
    }

    /// Stamps a fresh copy of `message` and appends it to `entry`'s mailbox.
    ///
    /// A flow enqueueing into its own agent's mailbox never waits for space: only
    /// that flow could make room.
    async fn enqueue(
        &self,
        run: &RunContext,
        entry: &AgentEntry,
        message: &Message,
        hops: u32,
        timeout: Option<Duration>,
        producer: Option<&AgentId>,
    ) -> Result<MessageId, DispatchError> {
        let message_id = MessageId::generate();
        let message = message.clone().assign_id(message_id);
        let receiver = entry.id();

        let in_flight = InFlight::begin(&self.0.in_flight);
        self.0
            .stats
            .record(StatEvent::for_message(StatEventKind::Sent, &message, receiver));
        let dropped = StatEvent::for_message(StatEventKind::Dropped, &message, receiver);

        let policy = if producer == Some(receiver) {
            BackpressurePolicy::Fail
        } else {
            self.0.config.mailbox.backpressure
        };
        match entry
            .mailbox
            .enqueue(Envelope::new(message, hops), policy, timeout, &run.shutdown)
            .await
        {
            Ok(()) => {
                in_flight.hand_off();
                trace!(agent = %receiver, %message_id, "Message enqueued");
                Ok(message_id)
            }
            Err(failure) => {
                let (reason, err) = match failure {
                    EnqueueError::Full => ("mailbox full", DispatchError::MailboxFull(receiver.clone())),
                    EnqueueError::Closed => {
                        ("agent unregistered", DispatchError::UnknownAgent(receiver.clone()))
                    }
                    EnqueueError::Cancelled => ("dispatcher stopping", DispatchError::NotRunning),
                };
                self.0.stats.record(dropped.with_reason(reason));
                Err(err)
            }
        }
    }

    fn spawn_flow(&self, run: &RunContext, entry: Arc<AgentEntry>) {
        let cancel = run.abort.child_token();
        {
            let mut slot = self
                .0
                .flows
                .entry(entry.id().clone())
                .or_insert_with(|| FlowHandle {
                    epoch: 0,
                    cancel: CancellationToken::new(),
                });
            // Newer runs win; a stale run never replaces a live flow.
            if slot.epoch >= run.epoch {
                return;
            }
            *slot = FlowHandle {
                epoch: run.epoch,
                cancel: cancel.clone(),
            };
        }
        trace!(agent = %entry.id(), epoch = run.epoch, "Spawning delivery flow");
        run.tracker.spawn_on(
            delivery::run(self.clone(), entry, run.shutdown.clone(), cancel),
            &run.runtime,
        );
    }

    /// Records `envelopes` as dropped and releases their in-flight units.
    fn discard(&self, entry: &AgentEntry, envelopes: Vec<Envelope>, reason: &str) {
        for envelope in envelopes {
            let _settled = InFlight::adopt(&self.0.in_flight);
            self.0.stats.record(
                StatEvent::for_message(StatEventKind::Dropped, &envelope.message, entry.id())
                    .with_reason(reason),
            );
        }
    }

    /// An immutable snapshot of the statistics feed.
    pub fn get_stats(&self) -> Stats {
        self.0.stats.snapshot()
    }

    /// Waits until no message is queued or being processed anywhere.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_until_quiet(&self, timeout: Duration) -> bool {
        let mut in_flight = self.0.in_flight.subscribe();
        let quiet = matches!(
            tokio::time::timeout(timeout, in_flight.wait_for(|count| *count == 0)).await,
            Ok(Ok(_))
        );
        quiet
    }

    /// A serializable picture of the registered agents and the configuration.
    pub fn snapshot(&self) -> SystemSnapshot {
        let profiles = self
            .0
            .registry
            .entries()
            .iter()
            .map(|entry| entry.profile.clone())
            .collect();
        SystemSnapshot::new(profiles, self.0.config.clone())
    }
}
