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

//! The turn coordinator: a single-writer state machine per session.
//!
//! Concurrent submits for the same session are serialized by the uniqueness
//! of `(session_id, turn_index)` in the turn store; whoever claims that row
//! owns the resolution. Once a turn is claimed, every failure path marks it
//! completed before surfacing an error, so a `resolving` row is never left
//! behind.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use data::actions::turn_action::{PlayerAction, SubmitTurnAction};
use data::characters::character_state::Character;
use data::core::config::CoreConfig;
use data::core::numerics::EventSeq;
use data::core::primitives::{TurnId, UserId};
use data::events::game_event::{GameEvent, GameEventKind};
use data::events::session_event::{
    CharacterRef, NextActivePlayer, SessionEvent, StatChangeSummary, TurnResolvedPayload,
};
use data::sessions::session_state::{GameSession, SessionStatus};
use data::snapshots::stats_snapshot::StatsSnapshot;
use data::turns::turn_state::{TurnPhase, TurnRecord};
use database::database::{Database, StoreError, TurnResolution};
use dm::error::DmError;
use dm::orchestrator::DmOrchestrator;
use dm::provider::NarrativeModel;
use dm::types::{DmRequest, DmResponse, RECENT_EVENTS_WINDOW};
use rules::mutations::stats::DerivedEvent;
use rules::mutations::{stats, statuses, turns};
use rules::queries::{players, sessions};
use tracing::{info, warn};
use utils::errors::GameError;
use utils::outcome::StopCondition;
use uuid::Uuid;

use crate::event_bus::EventBus;
use crate::rate_limit::{RateLimitKind, RateLimiter};
use crate::requests;
use crate::server_data::{ClientData, GameResponse};

/// Submits the active player's action for the current turn and resolves it
/// end to end: claim, dungeon master call, delta application, pointer
/// advance, persistence, broadcast.
pub async fn submit(
    database: &impl Database,
    bus: &EventBus,
    orchestrator: &DmOrchestrator<impl NarrativeModel>,
    limiter: &RateLimiter,
    config: &CoreConfig,
    data: ClientData,
    action: SubmitTurnAction,
) -> Result<GameResponse, GameError> {
    let session = requests::fetch_session(database, action.session_id).await?;
    sessions::ensure_active(&session)?;
    let participant = requests::membership(&session, data.user_id)?;

    let decision = limiter.check(RateLimitKind::TurnProcessing, data.user_id);
    if !decision.allowed {
        return Err(GameError::RateLimitExceeded(decision.details(Utc::now())));
    }

    sessions::ensure_active_player(&session, data.user_id)?;

    let character_id =
        participant.character_id.ok_or(GameError::NotFound("character"))?;
    let character = requests::fetch_character(database, session.id, character_id).await?;
    if !character.is_alive() {
        return Err(GameError::CharacterDead);
    }

    let turn = claim_turn_slot(database, &session, data.user_id, config).await?;
    info!(turn_id = ?turn.id, turn_index = turn.turn_index, "Claimed turn");

    match resolve(database, bus, orchestrator, &session, &turn, character, &action.action)
        .await
    {
        Ok(payload) => Ok(GameResponse::turn(data, payload)),
        Err(error) => {
            release_turn(database, turn.id).await;
            Err(error)
        }
    }
}

/// The participant the pointer currently selects, as a response fragment.
pub fn next_active_player(
    session: &GameSession,
    characters: &[Character],
) -> Option<NextActivePlayer> {
    if session.status != SessionStatus::Active {
        return None;
    }
    let user_id = session.active_player()?;
    let participant = session.participant(user_id)?;
    let character = players::character_of(session, characters, user_id)?;
    Some(NextActivePlayer {
        user_id,
        display_name: participant.display_name.clone(),
        character: CharacterRef {
            id: character.id,
            name: character.name.clone(),
            image_url: character.image_url.clone(),
        },
    })
}

/// Claims `(session_id, current_turn_index)`, recovering stuck or stale
/// rows: a young `resolving` row rejects the submit, an old one is deleted
/// and the claim retried once, and a `completed` row means the pointer
/// lagged behind a finished resolution, so it is likewise deleted and
/// retried.
async fn claim_turn_slot(
    database: &impl Database,
    session: &GameSession,
    user_id: UserId,
    config: &CoreConfig,
) -> Result<TurnRecord, GameError> {
    let turn = fresh_turn(session, user_id);
    let existing = match database.create_turn(&turn).await {
        Ok(()) => return Ok(turn),
        Err(StoreError::Conflict { existing, .. }) => existing,
        Err(other) => return Err(requests::map_store(other)),
    };

    let stuck_after = Duration::milliseconds(config.turn_stuck_threshold_ms as i64);
    match existing.phase {
        TurnPhase::Resolving if existing.age(Utc::now()) < stuck_after => {
            Err(GameError::TurnAlreadyProcessing)
        }
        TurnPhase::Resolving => {
            warn!(
                turn_id = ?existing.id,
                age_ms = existing.age(Utc::now()).num_milliseconds(),
                "Reclaiming stuck turn"
            );
            database.delete_turn(existing.id).await.map_err(requests::map_store)?;
            retry_claim(database, session, user_id).await
        }
        TurnPhase::Completed => {
            warn!(
                turn_id = ?existing.id,
                turn_index = existing.turn_index,
                "Completed turn ahead of the pointer; removing and retrying"
            );
            database.delete_turn(existing.id).await.map_err(requests::map_store)?;
            retry_claim(database, session, user_id).await
        }
    }
}

/// The single retry after a recovery delete. A second conflict means
/// another submitter won the race.
async fn retry_claim(
    database: &impl Database,
    session: &GameSession,
    user_id: UserId,
) -> Result<TurnRecord, GameError> {
    let turn = fresh_turn(session, user_id);
    match database.create_turn(&turn).await {
        Ok(()) => Ok(turn),
        Err(StoreError::Conflict { .. }) => Err(GameError::TurnAlreadyProcessing),
        Err(other) => Err(requests::map_store(other)),
    }
}

fn fresh_turn(session: &GameSession, user_id: UserId) -> TurnRecord {
    TurnRecord {
        id: TurnId(Uuid::new_v4()),
        session_id: session.id,
        turn_index: session.current_turn_index,
        active_player: user_id,
        phase: TurnPhase::Resolving,
        started_at: Utc::now(),
        completed_at: None,
    }
}

/// Marks a claimed turn completed after a failed resolution. Best effort;
/// an already-completed turn is left alone.
async fn release_turn(database: &impl Database, turn_id: TurnId) {
    let resolving = matches!(
        database.fetch_turn_by_id(turn_id).await,
        Ok(Some(turn)) if turn.phase == TurnPhase::Resolving
    );
    if resolving {
        if let Err(error) = database.complete_turn(turn_id, Utc::now()).await {
            warn!(?turn_id, %error, "Failed to release claimed turn");
        }
    }
}

/// Steps 6 through 12 of the submit protocol, with the turn already
/// claimed. Returns the payload the caller both broadcasts and responds
/// with. Persistence of events, sheets, snapshots, pointer and turn
/// completion is one transactional unit; nothing partial survives an error.
async fn resolve(
    database: &impl Database,
    bus: &EventBus,
    orchestrator: &DmOrchestrator<impl NarrativeModel>,
    session: &GameSession,
    turn: &TurnRecord,
    active_character: Character,
    action: &PlayerAction,
) -> Result<TurnResolvedPayload, GameError> {
    let characters =
        database.session_characters(session.id).await.map_err(requests::map_store)?;
    let recent_events = database
        .recent_events(session.id, RECENT_EVENTS_WINDOW)
        .await
        .map_err(requests::map_store)?;

    // The dungeon master only sees the alive roster; the dead are out of
    // play and may not receive further deltas.
    let alive_roster: Vec<Character> =
        characters.iter().filter(|c| c.is_alive()).cloned().collect();
    let request = DmRequest {
        session_id: session.id,
        difficulty: session.difficulty,
        tone_tags: session.tone_tags.clone(),
        house_rules: session.house_rules.clone(),
        active_character: active_character.clone(),
        roster: alive_roster,
        recent_events,
        action: action.clone(),
    };
    let response = orchestrator.run(&request).await.map_err(map_dm)?;

    apply_and_commit(database, bus, session, turn, &characters, active_character, action, response)
        .await
}

/// Applies stat updates, derives events, advances the pointer, commits and
/// broadcasts.
#[allow(clippy::too_many_arguments)]
async fn apply_and_commit(
    database: &impl Database,
    bus: &EventBus,
    session: &GameSession,
    turn: &TurnRecord,
    characters: &[Character],
    active_character: Character,
    action: &PlayerAction,
    response: DmResponse,
) -> Result<TurnResolvedPayload, GameError> {
    let now = Utc::now();
    let mut seq: EventSeq = 0;
    let mut next_seq = || {
        let current = seq;
        seq += 1;
        current
    };
    let mut events = vec![];
    let event = |seq: EventSeq, character, kind| GameEvent {
        session_id: session.id,
        turn_index: turn.turn_index,
        seq,
        character_id: character,
        at: now,
        kind,
    };

    events.push(event(
        next_seq(),
        Some(active_character.id),
        GameEventKind::Action {
            player: turn.active_player,
            text: action.recorded_text(),
        },
    ));
    events.push(event(
        next_seq(),
        None,
        GameEventKind::Narrative {
            text: response.narrative.clone(),
            choices: response.choices.clone(),
        },
    ));

    // Deltas apply sequentially; a later update to the same character sees
    // the sheet the earlier one produced.
    let mut updated: BTreeMap<_, Character> = BTreeMap::new();
    let mut summaries = vec![];
    for update in &response.stat_updates {
        let current = updated
            .get(&update.character_id)
            .or_else(|| characters.iter().find(|c| c.id == update.character_id))
            .cloned()
            .ok_or_else(|| {
                GameError::Internal(format!(
                    "validated stat update for unknown character {:?}",
                    update.character_id
                ))
            })?;
        let applied = stats::apply(&current.sheet, &update.delta)
            .map_err(|error| GameError::DmGenerationFailed(error.to_string()))?;

        events.push(event(
            next_seq(),
            Some(current.id),
            GameEventKind::StatChange {
                delta: update.delta.clone(),
                hp_before: current.sheet.hp,
                hp_after: applied.sheet.hp,
            },
        ));
        let mut summary = StatChangeSummary {
            character_id: current.id,
            hp_before: current.sheet.hp,
            hp_after: applied.sheet.hp,
            died: false,
            leveled_to: None,
        };
        for derived in &applied.derived {
            match derived {
                DerivedEvent::Death => {
                    summary.died = true;
                    events.push(event(next_seq(), Some(current.id), GameEventKind::Death));
                }
                DerivedEvent::LevelUp { new_level, perks } => {
                    summary.leveled_to = Some(*new_level);
                    events.push(event(
                        next_seq(),
                        Some(current.id),
                        GameEventKind::LevelUp {
                            new_level: *new_level,
                            perks: perks.clone(),
                        },
                    ));
                }
            }
        }
        summaries.push(summary);

        let mut next = current;
        next.sheet = applied.sheet;
        updated.insert(next.id, next);
    }

    // The acting character's status durations tick at their pointer
    // advance; expired statuses drop off here.
    let mut acting = updated
        .get(&active_character.id)
        .cloned()
        .unwrap_or(active_character);
    if !acting.sheet.statuses.is_empty() {
        statuses::tick(&mut acting.sheet);
        updated.insert(acting.id, acting);
    }

    let merged: Vec<Character> = characters
        .iter()
        .map(|c| updated.get(&c.id).cloned().unwrap_or_else(|| c.clone()))
        .collect();

    let mut advanced = session.clone();
    let game_over = match turns::advance_pointer(&mut advanced, &merged) {
        Ok(()) => false,
        Err(StopCondition::GameOver) => {
            advanced.status = SessionStatus::Completed;
            advanced.completed_at = Some(now);
            info!(session_id = ?session.id, "No alive players remain; game over");
            true
        }
        Err(StopCondition::Error(error)) => return Err(error),
    };

    let snapshots: Vec<StatsSnapshot> = updated
        .values()
        .map(|character| StatsSnapshot {
            session_id: session.id,
            character_id: character.id,
            turn_id: turn.id,
            turn_index: turn.turn_index,
            sheet: character.sheet.clone(),
            at: now,
        })
        .collect();

    let resolution = TurnResolution {
        session: advanced.clone(),
        characters: updated.values().cloned().collect(),
        events,
        snapshots,
        turn_id: turn.id,
        completed_at: now,
    };
    database.commit_turn_resolution(&resolution).await.map_err(requests::map_store)?;

    let payload = TurnResolvedPayload {
        turn_id: turn.id,
        narrative: response.narrative,
        choices: response.choices,
        stat_updates: summaries,
        next_active_player: next_active_player(&advanced, &merged),
    };

    for character in updated.values() {
        bus.publish(session.id, SessionEvent::CharacterUpdated {
            character_id: character.id,
            name: character.name.clone(),
            image_url: character.image_url.clone(),
        });
        bus.publish(session.id, SessionEvent::StatsUpdated {
            character_id: character.id,
            sheet: character.sheet.clone(),
        });
    }
    bus.publish(
        session.id,
        SessionEvent::GameUpdated(crate::session_server::game_update(&advanced)),
    );
    bus.publish(session.id, SessionEvent::TurnResolved(payload.clone()));

    if game_over {
        return Err(GameError::GameOver);
    }
    Ok(payload)
}

/// Folds dungeon master failures into the public taxonomy.
fn map_dm(error: DmError) -> GameError {
    match error {
        DmError::ValidationRejected(message) => GameError::InvalidAction(message),
        DmError::UpstreamTimeout => {
            GameError::DmGenerationFailed("the dungeon master timed out".into())
        }
        DmError::Upstream(message) | DmError::MalformedResponse(message) => {
            GameError::DmGenerationFailed(message)
        }
    }
}
