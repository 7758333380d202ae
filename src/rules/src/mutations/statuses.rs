// Copyright © loreforge 2025-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use data::characters::power_sheet::{PowerSheet, StatusEffect};

/// Ticks status durations on `sheet` at its owner's pointer advance.
///
/// Each remaining duration decrements by one (saturating at 0); statuses
/// that reach 0 are removed. Returns the statuses that expired.
pub fn tick(sheet: &mut PowerSheet) -> Vec<StatusEffect> {
    for status in &mut sheet.statuses {
        status.remaining_turns = status.remaining_turns.saturating_sub(1);
    }
    let (expired, remaining) =
        sheet.statuses.drain(..).partition(|s| s.remaining_turns == 0);
    sheet.statuses = remaining;
    expired
}
