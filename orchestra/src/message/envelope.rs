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

use derive_new::new;
use static_assertions::assert_impl_all;

use crate::message::Message;

/// Delivery metadata wrapped around a message while it sits in a mailbox.
///
/// `hops` counts how many agent-produced re-sends separate this message from the
/// external send that started the chain.
#[derive(new, Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) message: Message,
    pub(crate) hops: u32,
}

assert_impl_all!(Envelope: Send, Sync);
