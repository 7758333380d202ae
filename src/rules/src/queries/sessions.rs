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

use data::core::primitives::UserId;
use data::sessions::session_state::{GameSession, SessionStatus};
use utils::errors::GameError;

/// Minimum roster size for a session to start.
pub const MIN_PARTICIPANTS: usize = 2;

/// The session must be accepting turns.
pub fn ensure_active(session: &GameSession) -> Result<(), GameError> {
    match session.status {
        SessionStatus::Active => Ok(()),
        SessionStatus::Lobby => Err(GameError::SessionNotActive(
            "the session has not started yet".into(),
        )),
        SessionStatus::Completed => Err(GameError::GameOver),
    }
}

/// The session must still be gathering players.
pub fn ensure_lobby(session: &GameSession) -> Result<(), GameError> {
    match session.status {
        SessionStatus::Lobby => Ok(()),
        _ => Err(GameError::SessionNotActive(
            "the session has already started".into(),
        )),
    }
}

/// Only the host may perform this operation.
pub fn ensure_host(session: &GameSession, user_id: UserId) -> Result<(), GameError> {
    if session.is_host(user_id) {
        Ok(())
    } else {
        Err(GameError::Forbidden("only the host may do that".into()))
    }
}

/// The submitting principal must hold the active turn-order slot.
pub fn ensure_active_player(session: &GameSession, user_id: UserId) -> Result<(), GameError> {
    if session.active_player() == Some(user_id) {
        Ok(())
    } else {
        Err(GameError::NotYourTurn)
    }
}

/// Start preconditions: lobby, enough participants, every participant with
/// a ready character.
pub fn ensure_can_start(session: &GameSession) -> Result<(), GameError> {
    ensure_lobby(session)?;
    if session.participants.len() < MIN_PARTICIPANTS {
        return Err(GameError::ValidationFailed(format!(
            "at least {MIN_PARTICIPANTS} players are needed to start"
        )));
    }
    if session.participants.iter().any(|p| p.character_id.is_none()) {
        return Err(GameError::ValidationFailed(
            "every player needs a character before the game can start".into(),
        ));
    }
    Ok(())
}

/// The turn order fixed at start: the roster in join order.
pub fn form_turn_order(session: &GameSession) -> Vec<UserId> {
    session.participants.iter().map(|p| p.user_id).collect()
}
