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

use data::characters::character_state::Character;
use data::sessions::session_state::GameSession;
use tracing::debug;
use utils::outcome;
use utils::outcome::Outcome;

use crate::queries::players;

/// Advances the active-player pointer past the current slot.
///
/// Scans the turn order from the next slot for the first participant whose
/// character is alive, keeping the stored index monotonic (it grows by the
/// scan offset rather than wrapping). Halts with game over when the
/// alive-set is empty; the caller completes the session.
pub fn advance_pointer(session: &mut GameSession, characters: &[Character]) -> Outcome {
    let Some(offset) = players::next_alive_offset(session, characters) else {
        debug!(?session.id, "No alive participant remains");
        return outcome::GAME_OVER;
    };
    session.current_turn_index += offset;
    outcome::OK
}
