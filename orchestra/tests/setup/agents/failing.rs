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

use anyhow::anyhow;
use orchestra::prelude::*;

/// An agent whose every `process` call returns an error.
pub fn always_failing(id: &str) -> FunctionalAgent {
    FunctionalAgent::from_fn(AgentProfile::new(id, "failing").with_id(id), |message| {
        Err(anyhow!("cannot handle {} message", message.kind()))
    })
}

/// An agent whose every `process` call panics.
pub fn panicking(id: &str) -> FunctionalAgent {
    FunctionalAgent::from_fn(AgentProfile::new(id, "panicking").with_id(id), |_| {
        panic!("Intentional test panic in agent");
    })
}
