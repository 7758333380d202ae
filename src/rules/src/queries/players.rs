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
use data::core::primitives::UserId;
use data::sessions::session_state::GameSession;

/// The character a participant plays, if they have linked one.
pub fn character_of<'a>(
    session: &GameSession,
    characters: &'a [Character],
    user_id: UserId,
) -> Option<&'a Character> {
    let participant = session.participant(user_id)?;
    let character_id = participant.character_id?;
    characters.iter().find(|c| c.id == character_id)
}

/// Whether a participant's character is alive.
pub fn is_alive(session: &GameSession, characters: &[Character], user_id: UserId) -> bool {
    character_of(session, characters, user_id).is_some_and(Character::is_alive)
}

/// Number of participants whose character is alive.
pub fn alive_count(session: &GameSession, characters: &[Character]) -> usize {
    session
        .turn_order
        .iter()
        .filter(|&&user_id| is_alive(session, characters, user_id))
        .count()
}

/// Offset to the next alive participant, scanning the turn order from the
/// slot after the current one and wrapping modulo its length.
///
/// Returns `None` when no participant's character is alive. An offset of
/// `len` means the scan wrapped all the way back to the current player,
/// which happens when everyone else is dead.
pub fn next_alive_offset(session: &GameSession, characters: &[Character]) -> Option<u64> {
    let len = session.turn_order.len();
    if len == 0 {
        return None;
    }
    let current = session.current_turn_index as usize;
    (1..=len as u64).find(|&offset| {
        let slot = (current + offset as usize) % len;
        is_alive(session, characters, session.turn_order[slot])
    })
}
