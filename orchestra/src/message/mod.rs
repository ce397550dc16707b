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

//! Message data model: the immutable [`Message`] record, its [`MessageKind`] and
//! [`Priority`], the [`Recipient`] address, and the crate-internal delivery envelope.

pub(crate) use envelope::Envelope;
pub use message::{Message, IN_REPLY_TO};
pub use message_kind::{MessageKind, Priority};
pub use recipient::Recipient;

mod envelope;
#[allow(clippy::module_inception)]
mod message;
mod message_kind;
mod recipient;
