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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::numerics::TurnIndex;
use crate::core::primitives::{SessionId, UserId};
use crate::sessions::participant::Participant;

/// This is the state of a single multiplayer game session.
///
/// A session exclusively owns its participants (embedded here), its
/// characters, its turn records, its event log, and its stat snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    /// Unique ID for this session
    pub id: SessionId,

    /// Display name chosen by the host.
    pub name: String,

    /// The user who created the session.
    pub host: UserId,

    /// Lifecycle state. Transitions are one-way: lobby to active to
    /// completed.
    pub status: SessionStatus,

    /// Roster, in join order. The host is always present.
    pub participants: Vec<Participant>,

    /// Ordered list of participant user ids, fixed when the session starts.
    /// Empty while the session is in the lobby.
    pub turn_order: Vec<UserId>,

    /// Monotonic 0-based turn counter.
    ///
    /// Only its value modulo `turn_order.len()` selects the active player;
    /// the raw value keeps increasing for the whole session.
    pub current_turn_index: TurnIndex,

    /// Free-text table rules the dungeon master honors.
    pub house_rules: Option<String>,

    /// Tone descriptors passed through to the dungeon master.
    pub tone_tags: Vec<String>,

    pub difficulty: DifficultyTier,

    pub created_at: DateTime<Utc>,

    /// Set when the session transitions to [SessionStatus::Completed].
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Gathering players; roster and characters may still change.
    Lobby,
    /// Turns are being played. Roster and turn order are fixed.
    Active,
    /// No participant is alive, or the session was administratively closed.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyTier {
    Relaxed,
    Standard,
    Punishing,
}

impl GameSession {
    /// Looks up a participant by user id.
    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn participant_mut(&mut self, user_id: UserId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host == user_id
    }

    /// The turn-order slot the current turn index selects, or None before
    /// the session has started.
    pub fn active_slot(&self) -> Option<usize> {
        if self.turn_order.is_empty() {
            return None;
        }
        Some(self.current_turn_index as usize % self.turn_order.len())
    }

    /// The participant whose turn it currently is.
    pub fn active_player(&self) -> Option<UserId> {
        self.active_slot().map(|slot| self.turn_order[slot])
    }
}
