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

//! Start/stop state machine, graceful draining and forced cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use orchestra::prelude::*;
use serde_json::json;

use crate::setup::agents::Recorder;
use crate::setup::{dropped_with, initialize_tracing, QUIET};

mod setup;

/// An agent that takes `delay` per message and counts completions.
fn sleeper(id: &str, delay: Duration, done: Arc<AtomicUsize>) -> FunctionalAgent {
    FunctionalAgent::new(AgentProfile::new(id, "sleeper").with_id(id), move |_message| {
        let done = done.clone();
        async move {
            tokio::time::sleep(delay).await;
            done.fetch_add(1, Ordering::SeqCst);
            ProcessResult::Ok(None)
        }
    })
}

#[tokio::test]
async fn test_state_transitions_and_misuse() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);

    assert_eq!(dispatcher.stop(true).await, Err(DispatchError::NotRunning));

    dispatcher.start().await?;
    assert_eq!(dispatcher.state(), DispatcherState::Running);
    assert_eq!(dispatcher.start().await, Err(DispatchError::AlreadyRunning));

    dispatcher.stop(true).await?;
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    assert_eq!(dispatcher.stop(false).await, Err(DispatchError::NotRunning));
    Ok(())
}

#[tokio::test]
async fn test_send_requires_running_dispatcher() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    let (recorder, _inbox) = Recorder::new("sink");
    dispatcher.register(recorder)?;

    let result = dispatcher
        .send(Message::new("user", "sink", MessageKind::Info, json!(1)))
        .await;
    assert_eq!(result, Err(DispatchError::NotRunning));
    assert_eq!(dispatcher.get_stats().count(StatEventKind::Sent), 0);
    Ok(())
}

#[tokio::test]
async fn test_agents_resume_after_forced_stop_and_restart() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    let (recorder, inbox) = Recorder::new("sink");
    let sink = dispatcher.register(recorder)?;

    dispatcher.start().await?;
    dispatcher
        .send(Message::new("user", sink.clone(), MessageKind::Info, json!(1)))
        .await?;
    assert!(dispatcher.wait_until_quiet(QUIET).await);
    assert_eq!(dispatcher.agent_state(&sink)?, AgentState::Idle);

    dispatcher.stop(false).await?;
    assert_eq!(dispatcher.agent_state(&sink)?, AgentState::Stopped);
    assert_eq!(
        dispatcher
            .send(Message::new("user", sink.clone(), MessageKind::Info, json!(2)))
            .await,
        Err(DispatchError::NotRunning)
    );

    dispatcher.start().await?;
    dispatcher
        .send(Message::new("user", sink.clone(), MessageKind::Info, json!(3)))
        .await?;
    assert!(dispatcher.wait_until_quiet(QUIET).await);

    assert_eq!(inbox.numbers(), vec![1, 3]);
    dispatcher.stop(true).await?;
    Ok(())
}

#[tokio::test]
async fn test_agent_registered_while_running_gets_a_flow() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    dispatcher.start().await?;

    let (recorder, inbox) = Recorder::new("late");
    let late = dispatcher.register(recorder)?;
    dispatcher
        .send(Message::new("user", late, MessageKind::Info, json!(7)))
        .await?;

    assert!(dispatcher.wait_until_quiet(QUIET).await);
    assert_eq!(inbox.numbers(), vec![7]);
    dispatcher.stop(true).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_graceful_stop_drains_mailboxes() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    let done = Arc::new(AtomicUsize::new(0));
    dispatcher.register(sleeper("slow", Duration::from_millis(10), done.clone()))?;

    dispatcher.start().await?;
    for n in 0..5 {
        dispatcher
            .send(Message::new("user", "slow", MessageKind::Command, json!(n)))
            .await?;
    }
    dispatcher.stop(true).await?;

    assert_eq!(done.load(Ordering::SeqCst), 5);
    let stats = dispatcher.get_stats();
    assert_eq!(stats.count(StatEventKind::Processed), 5);
    assert_eq!(stats.count(StatEventKind::Dropped), 0);
    Ok(())
}

/// Flows get their first poll only once `stop` awaits them, after shutdown fired.
#[tokio::test(flavor = "current_thread")]
async fn test_graceful_stop_right_after_start_drains() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    let (recorder, inbox) = Recorder::new("sink");
    dispatcher.register(recorder)?;

    dispatcher.start().await?;
    for n in 0..5 {
        dispatcher
            .send(Message::new("user", "sink", MessageKind::Info, json!(n)))
            .await?;
    }
    dispatcher.stop(true).await?;

    assert_eq!(inbox.numbers(), vec![0, 1, 2, 3, 4]);
    let stats = dispatcher.get_stats();
    assert_eq!(stats.count(StatEventKind::Processed), 5);
    assert_eq!(stats.count(StatEventKind::Dropped), 0);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn test_agent_registered_just_before_stop_is_drained() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    dispatcher.start().await?;

    let (recorder, inbox) = Recorder::new("late");
    dispatcher.register(recorder)?;
    dispatcher
        .send(Message::new("user", "late", MessageKind::Info, json!(3)))
        .await?;
    dispatcher.stop(true).await?;

    assert_eq!(inbox.numbers(), vec![3]);
    assert_eq!(dispatcher.get_stats().count(StatEventKind::Dropped), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_while_stopping_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let config = OrchestraConfig::default().with_grace_period(Duration::from_millis(300));
    let dispatcher = Dispatcher::new(config);
    let done = Arc::new(AtomicUsize::new(0));
    dispatcher.register(sleeper("stuck", Duration::from_secs(30), done))?;
    dispatcher.start().await?;
    dispatcher
        .send(Message::new("user", "stuck", MessageKind::Command, json!(0)))
        .await?;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let stopping = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.stop(true).await })
    };
    while dispatcher.state() != DispatcherState::Stopping {
        tokio::task::yield_now().await;
    }
    assert_eq!(dispatcher.start().await, Err(DispatchError::AlreadyRunning));

    assert_eq!(stopping.await?, Ok(()));
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_grace_period_elapses_and_remainder_is_dropped() -> anyhow::Result<()> {
    initialize_tracing();
    let config = OrchestraConfig::default().with_grace_period(Duration::from_millis(50));
    let dispatcher = Dispatcher::new(config);
    let done = Arc::new(AtomicUsize::new(0));
    dispatcher.register(sleeper("stuck", Duration::from_secs(30), done.clone()))?;

    dispatcher.start().await?;
    for n in 0..3 {
        dispatcher
            .send(Message::new("user", "stuck", MessageKind::Command, json!(n)))
            .await?;
    }
    // Let the flow pick up the first message.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    dispatcher.stop(true).await?;
    assert!(started.elapsed() < Duration::from_secs(5));

    let stats = dispatcher.get_stats();
    assert_eq!(done.load(Ordering::SeqCst), 0);
    assert_eq!(dropped_with(&stats, "processing cancelled"), 1);
    assert_eq!(dropped_with(&stats, "grace period elapsed"), 2);
    assert!(dispatcher.wait_until_quiet(Duration::from_millis(10)).await);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_forced_stop_cancels_in_flight_processing() -> anyhow::Result<()> {
    initialize_tracing();
    let dispatcher = Dispatcher::default();
    let done = Arc::new(AtomicUsize::new(0));
    dispatcher.register(sleeper("stuck", Duration::from_secs(30), done.clone()))?;

    dispatcher.start().await?;
    for n in 0..3 {
        dispatcher
            .send(Message::new("user", "stuck", MessageKind::Command, json!(n)))
            .await?;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    dispatcher.stop(false).await?;
    assert!(started.elapsed() < Duration::from_secs(1));

    let stats = dispatcher.get_stats();
    assert_eq!(dropped_with(&stats, "processing cancelled"), 1);
    assert_eq!(dropped_with(&stats, "dispatcher stopped"), 2);
    assert_eq!(dispatcher.agent_state(&AgentId::from("stuck"))?, AgentState::Stopped);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_stop_waits_for_the_first() -> anyhow::Result<()> {
    initialize_tracing();
    let config = OrchestraConfig::default().with_grace_period(Duration::from_millis(100));
    let dispatcher = Dispatcher::new(config);
    let done = Arc::new(AtomicUsize::new(0));
    dispatcher.register(sleeper("stuck", Duration::from_secs(30), done))?;
    dispatcher.start().await?;
    dispatcher
        .send(Message::new("user", "stuck", MessageKind::Command, json!(0)))
        .await?;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let first = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.stop(true).await })
    };
    while dispatcher.state() != DispatcherState::Stopping {
        tokio::task::yield_now().await;
    }
    assert_eq!(dispatcher.stop(true).await, Ok(()));
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    assert_eq!(first.await?, Ok(()));
    Ok(())
}
