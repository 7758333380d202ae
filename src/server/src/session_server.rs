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

use chrono::Utc;
use data::actions::session_action::{
    CharacterSpec, CreateSessionAction, JoinSessionAction, SessionAction,
};
use data::characters::character_state::Character;
use data::characters::power_sheet::PowerSheet;
use data::core::primitives::{CharacterId, SessionId, UserId};
use data::events::session_event::{GameUpdate, SessionEvent};
use data::sessions::participant::{Participant, ParticipantRole};
use data::sessions::session_state::{GameSession, SessionStatus};
use data::turns::turn_state::TurnRecord;
use database::database::Database;
use rules::queries::sessions;
use tracing::info;
use utils::errors::GameError;
use uuid::Uuid;

use crate::event_bus::{EventBus, PresenceEntry};
use crate::rate_limit::{RateLimitKind, RateLimiter};
use crate::requests;
use crate::server_data::{
    ClientData, GameResponse, RosterPlayer, SessionStatusPayload, TurnSummary,
};

/// How many turn records a status view includes.
const RECENT_TURNS_WINDOW: usize = 10;

pub async fn handle(
    database: &impl Database,
    bus: &EventBus,
    limiter: &RateLimiter,
    data: ClientData,
    action: SessionAction,
) -> Result<GameResponse, GameError> {
    match action {
        SessionAction::Create(action) => create(database, limiter, data, action).await,
        SessionAction::Join(action) => join(database, bus, limiter, data, action).await,
        SessionAction::Leave { session_id } => leave(database, bus, data, session_id).await,
        SessionAction::Start { session_id } => start(database, bus, data, session_id).await,
        SessionAction::Delete { session_id } => delete(database, bus, data, session_id).await,
        SessionAction::Status { session_id } => status(database, data, session_id).await,
    }
}

/// Creates a session in the lobby state with the caller as host.
pub async fn create(
    database: &impl Database,
    limiter: &RateLimiter,
    data: ClientData,
    action: CreateSessionAction,
) -> Result<GameResponse, GameError> {
    if action.name.trim().is_empty() {
        return Err(GameError::ValidationFailed("the session needs a name".into()));
    }
    validate_spec(&action.character)?;

    let decision = limiter.check(RateLimitKind::CharacterCreation, data.user_id);
    if !decision.allowed {
        return Err(GameError::RateLimitExceeded(decision.details(Utc::now())));
    }

    let now = Utc::now();
    let session_id = SessionId(Uuid::new_v4());
    let character = build_character(session_id, data.user_id, &action.character);
    let session = GameSession {
        id: session_id,
        name: action.name,
        host: data.user_id,
        status: SessionStatus::Lobby,
        participants: vec![Participant {
            user_id: data.user_id,
            role: ParticipantRole::Host,
            display_name: action.display_name,
            character_id: Some(character.id),
            joined_at: now,
        }],
        turn_order: vec![],
        current_turn_index: 0,
        house_rules: action.house_rules,
        tone_tags: action.tone_tags,
        difficulty: action.difficulty,
        created_at: now,
        completed_at: None,
    };

    database.write_character(&character).await.map_err(requests::map_store)?;
    database.write_session(&session).await.map_err(requests::map_store)?;
    info!(?session_id, host = ?data.user_id, "Created session");

    let payload = status_payload(&session, &[character], vec![]);
    Ok(GameResponse::session(with_session(data, session_id), payload))
}

/// Joins a lobby, creating the caller's in-session character.
pub async fn join(
    database: &impl Database,
    bus: &EventBus,
    limiter: &RateLimiter,
    data: ClientData,
    action: JoinSessionAction,
) -> Result<GameResponse, GameError> {
    let mut session = requests::fetch_session(database, action.session_id).await?;
    sessions::ensure_lobby(&session)?;
    if session.participant(data.user_id).is_some() {
        return Err(GameError::ValidationFailed("you are already in this session".into()));
    }
    validate_spec(&action.character)?;

    let decision = limiter.check(RateLimitKind::CharacterCreation, data.user_id);
    if !decision.allowed {
        return Err(GameError::RateLimitExceeded(decision.details(Utc::now())));
    }

    let now = Utc::now();
    let character = build_character(session.id, data.user_id, &action.character);
    session.participants.push(Participant {
        user_id: data.user_id,
        role: ParticipantRole::Player,
        display_name: action.display_name.clone(),
        character_id: Some(character.id),
        joined_at: now,
    });

    database.write_character(&character).await.map_err(requests::map_store)?;
    database.write_session(&session).await.map_err(requests::map_store)?;
    info!(session_id = ?session.id, user_id = ?data.user_id, "Player joined session");

    bus.announce(session.id, PresenceEntry {
        user_id: data.user_id,
        display_name: action.display_name,
        character_id: Some(character.id),
        joined_at: now,
    });

    let characters =
        database.session_characters(session.id).await.map_err(requests::map_store)?;
    let payload = status_payload(&session, &characters, vec![]);
    Ok(GameResponse::session(with_session(data, session.id), payload))
}

/// Leaves a lobby. The host role transfers to the earliest-joined remaining
/// player; the last player out deletes the session.
pub async fn leave(
    database: &impl Database,
    bus: &EventBus,
    data: ClientData,
    session_id: SessionId,
) -> Result<GameResponse, GameError> {
    let mut session = requests::fetch_session(database, session_id).await?;
    sessions::ensure_lobby(&session)?;
    let leaving = requests::membership(&session, data.user_id)?.clone();

    session.participants.retain(|p| p.user_id != data.user_id);
    if let Some(character_id) = leaving.character_id {
        database
            .delete_character(session_id, character_id)
            .await
            .map_err(requests::map_store)?;
    }

    if session.participants.is_empty() {
        database.delete_session(session_id).await.map_err(requests::map_store)?;
        bus.drop_session(session_id);
        info!(?session_id, "Last player left; session deleted");
        return Ok(GameResponse::ack(data));
    }

    if session.host == data.user_id {
        let next_host = session
            .participants
            .iter_mut()
            .min_by_key(|p| p.joined_at)
            .expect("roster is non-empty");
        next_host.role = ParticipantRole::Host;
        session.host = next_host.user_id;
        info!(?session_id, new_host = ?session.host, "Host left; role transferred");
    }

    database.write_session(&session).await.map_err(requests::map_store)?;
    bus.retire(session_id, data.user_id);
    Ok(GameResponse::ack(data))
}

/// Fixes the turn order and transitions the session to active.
pub async fn start(
    database: &impl Database,
    bus: &EventBus,
    data: ClientData,
    session_id: SessionId,
) -> Result<GameResponse, GameError> {
    let mut session = requests::fetch_session(database, session_id).await?;
    sessions::ensure_host(&session, data.user_id)?;
    sessions::ensure_can_start(&session)?;

    session.turn_order = sessions::form_turn_order(&session);
    session.current_turn_index = 0;
    session.status = SessionStatus::Active;
    database.write_session(&session).await.map_err(requests::map_store)?;
    info!(?session_id, players = session.turn_order.len(), "Session started");

    bus.publish(session_id, SessionEvent::GameUpdated(game_update(&session)));

    let characters =
        database.session_characters(session_id).await.map_err(requests::map_store)?;
    let payload = status_payload(&session, &characters, vec![]);
    Ok(GameResponse::session(with_session(data, session_id), payload))
}

/// Removes a lobby session and everything it owns. Started sessions are
/// not deletable.
pub async fn delete(
    database: &impl Database,
    bus: &EventBus,
    data: ClientData,
    session_id: SessionId,
) -> Result<GameResponse, GameError> {
    let session = requests::fetch_session(database, session_id).await?;
    sessions::ensure_host(&session, data.user_id)?;
    sessions::ensure_lobby(&session)?;

    database.delete_session(session_id).await.map_err(requests::map_store)?;
    bus.drop_session(session_id);
    info!(?session_id, "Session deleted");
    Ok(GameResponse::ack(data))
}

/// Current pointer, roster with hp, and recent turns.
pub async fn status(
    database: &impl Database,
    data: ClientData,
    session_id: SessionId,
) -> Result<GameResponse, GameError> {
    let session = requests::fetch_session(database, session_id).await?;
    requests::membership(&session, data.user_id)?;
    let characters =
        database.session_characters(session_id).await.map_err(requests::map_store)?;
    let recent = database
        .recent_turns(session_id, RECENT_TURNS_WINDOW)
        .await
        .map_err(requests::map_store)?;
    let payload = status_payload(&session, &characters, recent);
    Ok(GameResponse::session(with_session(data, session_id), payload))
}

/// The session fields subscribers re-render after a mutation.
pub fn game_update(session: &GameSession) -> GameUpdate {
    GameUpdate {
        session_id: session.id,
        status: session.status,
        current_turn_index: session.current_turn_index,
        active_player: match session.status {
            SessionStatus::Active => session.active_player(),
            _ => None,
        },
        completed_at: session.completed_at,
    }
}

pub fn status_payload(
    session: &GameSession,
    characters: &[Character],
    recent_turns: Vec<TurnRecord>,
) -> SessionStatusPayload {
    let roster = session
        .participants
        .iter()
        .map(|participant| {
            let character = participant
                .character_id
                .and_then(|id| characters.iter().find(|c| c.id == id));
            RosterPlayer {
                user_id: participant.user_id,
                display_name: participant.display_name.clone(),
                role: participant.role,
                character_id: participant.character_id,
                character_name: character.map(|c| c.name.clone()),
                hp: character.map(|c| c.sheet.hp).unwrap_or(0),
                max_hp: character.map(|c| c.sheet.max_hp).unwrap_or(0),
                level: character.map(|c| c.sheet.level).unwrap_or(1),
                alive: character.is_some_and(|c| c.is_alive()),
            }
        })
        .collect();
    SessionStatusPayload {
        session_id: session.id,
        name: session.name.clone(),
        status: session.status,
        current_turn_index: session.current_turn_index,
        active_player: crate::turn_server::next_active_player(session, characters),
        turn_order: session.turn_order.clone(),
        roster,
        recent_turns: recent_turns
            .into_iter()
            .map(|turn| TurnSummary {
                turn_id: turn.id,
                turn_index: turn.turn_index,
                active_player: turn.active_player,
                phase: turn.phase,
                started_at: turn.started_at,
                completed_at: turn.completed_at,
            })
            .collect(),
    }
}

fn validate_spec(spec: &CharacterSpec) -> Result<(), GameError> {
    if spec.name.trim().is_empty() {
        return Err(GameError::ValidationFailed("the character needs a name".into()));
    }
    if spec.max_hp < 1 {
        return Err(GameError::ValidationFailed("max hp must be at least 1".into()));
    }
    Ok(())
}

fn build_character(session_id: SessionId, owner: UserId, spec: &CharacterSpec) -> Character {
    let mut sheet = PowerSheet::baseline(spec.max_hp);
    sheet.abilities = spec.abilities.clone();
    sheet.weakness = spec.weakness.clone();
    Character {
        id: CharacterId(Uuid::new_v4()),
        session_id,
        owner,
        name: spec.name.clone(),
        image_url: None,
        sheet,
    }
}

fn with_session(data: ClientData, session_id: SessionId) -> ClientData {
    ClientData { user_id: data.user_id, session_id: Some(session_id) }
}
