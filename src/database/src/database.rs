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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data::characters::character_state::Character;
use data::core::numerics::TurnIndex;
use data::core::primitives::{CharacterId, SessionId, TurnId};
use data::events::game_event::GameEvent;
use data::sessions::session_state::GameSession;
use data::snapshots::stats_snapshot::StatsSnapshot;
use data::turns::turn_state::TurnRecord;
use thiserror::Error;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `(session_id, turn_index)` is already claimed. Carries the existing
    /// record so the coordinator can inspect it without a second read.
    #[error("turn slot {turn_index} of session {session_id:?} already claimed")]
    Conflict {
        session_id: SessionId,
        turn_index: TurnIndex,
        existing: Box<TurnRecord>,
    },

    /// A record this operation requires does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("encoding record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("storage: {0}")]
    Storage(#[from] sled::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything a resolved turn writes, committed as one logical transaction.
///
/// No partial narrative or partial deltas are ever persisted: either the
/// whole resolution lands (events, sheets, snapshots, advanced session,
/// completed turn) or none of it does.
#[derive(Debug)]
pub struct TurnResolution {
    pub session: GameSession,
    pub characters: Vec<Character>,
    pub events: Vec<GameEvent>,
    pub snapshots: Vec<StatsSnapshot>,
    pub turn_id: TurnId,
    pub completed_at: DateTime<Utc>,
}

/// Persistence contract for the game core.
///
/// Any storage engine may implement this; the invariants it must uphold are
/// the uniqueness of `(session_id, turn_index)` in [Database::create_turn]
/// and the per-session `(turn_index, seq)` ordering of the event log.
#[async_trait]
pub trait Database: Send + Sync {
    async fn fetch_session(&self, id: SessionId) -> StoreResult<Option<GameSession>>;

    async fn write_session(&self, session: &GameSession) -> StoreResult<()>;

    /// Removes the session and every record it owns: characters, turns,
    /// events, snapshots.
    async fn delete_session(&self, id: SessionId) -> StoreResult<()>;

    async fn fetch_character(
        &self,
        session_id: SessionId,
        id: CharacterId,
    ) -> StoreResult<Option<Character>>;

    async fn write_character(&self, character: &Character) -> StoreResult<()>;

    /// Removes one character. Lobby-only roster changes use this; a started
    /// session never loses characters.
    async fn delete_character(&self, session_id: SessionId, id: CharacterId) -> StoreResult<()>;

    /// All characters of a session, in id order.
    async fn session_characters(&self, session_id: SessionId) -> StoreResult<Vec<Character>>;

    /// Claims a turn slot. Fails with [StoreError::Conflict] if a record
    /// with the same `(session_id, turn_index)` exists. This is the single
    /// serialization point for concurrent submitters.
    async fn create_turn(&self, turn: &TurnRecord) -> StoreResult<()>;

    async fn fetch_turn(
        &self,
        session_id: SessionId,
        turn_index: TurnIndex,
    ) -> StoreResult<Option<TurnRecord>>;

    async fn fetch_turn_by_id(&self, id: TurnId) -> StoreResult<Option<TurnRecord>>;

    /// Marks the turn completed. Used both at the end of a successful
    /// resolution and as cleanup when resolution fails after the claim.
    async fn complete_turn(&self, id: TurnId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Removes a turn record. Recovery only: reclaiming a stuck turn or a
    /// completed row the pointer lagged behind.
    async fn delete_turn(&self, id: TurnId) -> StoreResult<()>;

    /// The most recent turn records of a session, newest first.
    async fn recent_turns(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> StoreResult<Vec<TurnRecord>>;

    /// Appends events to the session log. Callers assign `(turn_index, seq)`
    /// so that log order is creation order.
    async fn append_events(&self, events: &[GameEvent]) -> StoreResult<()>;

    /// The full event log of a session in `(turn_index, seq)` order.
    async fn session_events(&self, session_id: SessionId) -> StoreResult<Vec<GameEvent>>;

    /// The last `limit` events of a session in log order.
    async fn recent_events(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> StoreResult<Vec<GameEvent>>;

    async fn write_snapshot(&self, snapshot: &StatsSnapshot) -> StoreResult<()>;

    /// Progression history for one character, oldest first.
    async fn character_snapshots(
        &self,
        session_id: SessionId,
        character_id: CharacterId,
    ) -> StoreResult<Vec<StatsSnapshot>>;

    /// Commits an entire turn resolution, including marking the turn
    /// completed, as one logical transaction.
    async fn commit_turn_resolution(&self, resolution: &TurnResolution) -> StoreResult<()>;
}
