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

use std::sync::Arc;

use orchestra::prelude::*;
use parking_lot::Mutex;

/// Everything a [`Recorder`] has received, shared with the test body.
#[derive(Debug, Clone, Default)]
pub struct Inbox(Arc<Mutex<Vec<Message>>>);

impl Inbox {
    pub fn messages(&self) -> Vec<Message> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// The `content` of every received message, as integers, in arrival order.
    pub fn numbers(&self) -> Vec<i64> {
        self.0
            .lock()
            .iter()
            .filter_map(|message| message.content().as_i64())
            .collect()
    }
}

/// An agent that keeps every message it receives and never replies.
#[derive(Debug)]
pub struct Recorder {
    profile: AgentProfile,
    inbox: Inbox,
}

impl Recorder {
    pub fn new(id: &str) -> (Self, Inbox) {
        let inbox = Inbox::default();
        let recorder = Self {
            profile: AgentProfile::new(id, "recorder").with_id(id),
            inbox: inbox.clone(),
        };
        (recorder, inbox)
    }
}

#[async_trait]
impl Agent for Recorder {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn process(&mut self, message: Message) -> ProcessResult {
        self.inbox.0.lock().push(message);
        Ok(None)
    }
}
