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

use tokio::sync::watch;

/// One unit of outstanding work (a queued or processing message) on the
/// dispatcher-wide quiescence counter.
///
/// The unit is released when the guard drops unless it was handed off to a mailbox,
/// in which case the delivery flow (or the drain that discards the envelope) adopts
/// it again.
pub(crate) struct InFlight<'a> {
    counter: &'a watch::Sender<usize>,
    handed_off: bool,
}

impl<'a> InFlight<'a> {
    /// Counts a new unit.
    pub(crate) fn begin(counter: &'a watch::Sender<usize>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self::adopt(counter)
    }

    /// Takes responsibility for a unit counted earlier.
    pub(crate) const fn adopt(counter: &'a watch::Sender<usize>) -> Self {
        Self {
            counter,
            handed_off: false,
        }
    }

    /// The unit now belongs to an envelope sitting in a mailbox.
    pub(crate) fn hand_off(mut self) {
        self.handed_off = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.handed_off {
            self.counter.send_modify(|n| *n = n.saturating_sub(1));
        }
    }
}
