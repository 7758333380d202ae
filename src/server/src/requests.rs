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
use data::core::primitives::{CharacterId, SessionId, UserId};
use data::sessions::participant::Participant;
use data::sessions::session_state::GameSession;
use database::database::{Database, StoreError};
use utils::errors::GameError;

/// Looks up a session by ID in the database.
pub async fn fetch_session(
    database: &impl Database,
    session_id: SessionId,
) -> Result<GameSession, GameError> {
    database
        .fetch_session(session_id)
        .await
        .map_err(map_store)?
        .ok_or(GameError::NotFound("session"))
}

/// Looks up a character by ID within a session.
pub async fn fetch_character(
    database: &impl Database,
    session_id: SessionId,
    character_id: CharacterId,
) -> Result<Character, GameError> {
    database
        .fetch_character(session_id, character_id)
        .await
        .map_err(map_store)?
        .ok_or(GameError::NotFound("character"))
}

/// The caller's membership in the session, or [GameError::Forbidden].
pub fn membership(session: &GameSession, user_id: UserId) -> Result<&Participant, GameError> {
    session
        .participant(user_id)
        .ok_or_else(|| GameError::Forbidden("you are not in this session".into()))
}

/// Folds storage failures outside the turn-claim path into the public
/// taxonomy. Claim conflicts are handled where they carry meaning; one that
/// reaches this far is an inconsistency.
pub fn map_store(error: StoreError) -> GameError {
    match error {
        StoreError::Conflict { turn_index, .. } => {
            GameError::Internal(format!("unexpected claim conflict at turn {turn_index}"))
        }
        other => GameError::Internal(other.to_string()),
    }
}
