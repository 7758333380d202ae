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

use crate::actions::turn_action::NarrativeChoice;
use crate::characters::stat_delta::StatDelta;
use crate::core::numerics::{EventSeq, Health, Level, TurnIndex};
use crate::core::primitives::{CharacterId, SessionId, UserId};

/// One entry in a session's append-only event log.
///
/// The log is causally ordered by `(turn_index, seq)`. A completed turn
/// contributes exactly one `Action` and one `Narrative` event plus zero or
/// more stat-change, death and level-up events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub session_id: SessionId,
    pub turn_index: TurnIndex,
    pub seq: EventSeq,
    /// The character this event is about, when there is one.
    pub character_id: Option<CharacterId>,
    pub at: DateTime<Utc>,
    pub kind: GameEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    /// What the active player chose to do.
    Action { player: UserId, text: String },

    /// The dungeon master's prose plus the four options for the next turn.
    Narrative { text: String, choices: Vec<NarrativeChoice> },

    /// A resolved delta against one character's sheet.
    StatChange {
        delta: StatDelta,
        hp_before: Health,
        hp_after: Health,
    },

    /// The character's hp reached 0 this turn.
    Death,

    /// The character's level increased this turn.
    LevelUp { new_level: Level, perks: Vec<String> },
}

impl GameEvent {
    pub fn is_action(&self) -> bool {
        matches!(self.kind, GameEventKind::Action { .. })
    }

    pub fn is_narrative(&self) -> bool {
        matches!(self.kind, GameEventKind::Narrative { .. })
    }
}
