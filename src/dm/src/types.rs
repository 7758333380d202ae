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

use data::actions::turn_action::{NarrativeChoice, PlayerAction};
use data::characters::character_state::Character;
use data::characters::stat_delta::StatDelta;
use data::core::primitives::{CharacterId, SessionId};
use data::events::game_event::GameEvent;
use data::sessions::session_state::DifficultyTier;
use serde::{Deserialize, Serialize};

/// How many trailing log events accompany a dungeon master call.
pub const RECENT_EVENTS_WINDOW: usize = 5;

/// Everything the dungeon master sees when resolving one turn.
#[derive(Debug, Clone)]
pub struct DmRequest {
    pub session_id: SessionId,
    pub difficulty: DifficultyTier,
    pub tone_tags: Vec<String>,
    pub house_rules: Option<String>,
    /// The character whose action is being resolved.
    pub active_character: Character,
    /// The alive characters of the session. Stat updates in the reply may
    /// reference any of them; updates naming anyone else are dropped.
    pub roster: Vec<Character>,
    /// At most [RECENT_EVENTS_WINDOW] events, oldest first.
    pub recent_events: Vec<GameEvent>,
    pub action: PlayerAction,
}

impl DmRequest {
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.roster.iter().find(|c| c.id == id)
    }
}

/// A validated dungeon master reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmResponse {
    pub narrative: String,
    /// Exactly four options labeled A through D, in label order.
    pub choices: Vec<NarrativeChoice>,
    /// Deltas against session characters, in reply order. Updates naming
    /// characters outside the session have already been dropped.
    pub stat_updates: Vec<StatUpdate>,
}

/// One character delta from the dungeon master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatUpdate {
    pub character_id: CharacterId,
    pub delta: StatDelta,
}
