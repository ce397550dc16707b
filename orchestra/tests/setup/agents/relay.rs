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

use orchestra::prelude::*;

/// An agent that forwards the content of every message to `next` with `kind`.
pub fn relay(id: &str, next: &str, kind: MessageKind) -> FunctionalAgent {
    let me = AgentId::from(id);
    let next = AgentId::from(next);
    FunctionalAgent::from_fn(AgentProfile::new(id, "relay").with_id(id), move |message| {
        Ok(Some(Message::new(
            me.clone(),
            next.clone(),
            kind.clone(),
            message.content().clone(),
        )))
    })
}
