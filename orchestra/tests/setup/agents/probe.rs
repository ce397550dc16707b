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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orchestra::prelude::*;

/// Counts overlapping `process` calls. Each call yields to the runtime while it is
/// "active", so any concurrent invocation would show up in `max_active`.
#[derive(Debug)]
pub struct ReentrancyProbe {
    profile: AgentProfile,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    processed: Arc<AtomicUsize>,
}

/// Read-side handles of a [`ReentrancyProbe`].
#[derive(Debug, Clone)]
pub struct ProbeReadings {
    max_active: Arc<AtomicUsize>,
    processed: Arc<AtomicUsize>,
}

impl ProbeReadings {
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }
}

impl ReentrancyProbe {
    pub fn new(id: &str) -> (Self, ProbeReadings) {
        let max_active = Arc::new(AtomicUsize::new(0));
        let processed = Arc::new(AtomicUsize::new(0));
        let probe = Self {
            profile: AgentProfile::new(id, "probe").with_id(id),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: max_active.clone(),
            processed: processed.clone(),
        };
        (
            probe,
            ProbeReadings {
                max_active,
                processed,
            },
        )
    }
}

#[async_trait]
impl Agent for ReentrancyProbe {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn process(&mut self, _message: Message) -> ProcessResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}
