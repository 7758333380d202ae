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
use crate::characters::power_sheet::PowerSheet;
use crate::core::numerics::{Health, Level, TurnIndex};
use crate::core::primitives::{CharacterId, SessionId, TurnId, UserId};
use crate::sessions::session_state::SessionStatus;

/// Events fanned out to live subscribers of a session.
///
/// State-mutating variants are published only by the turn coordinator and
/// session lifecycle, in a fixed order per resolution; typing status is
/// independent and unordered with respect to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    PlayerJoined {
        user_id: UserId,
        display_name: String,
        character_id: Option<CharacterId>,
    },
    PlayerLeft {
        user_id: UserId,
    },
    /// Session snapshot fields that changed.
    GameUpdated(GameUpdate),
    /// A turn finished resolving; mirrors the submit response payload.
    TurnResolved(TurnResolvedPayload),
    /// A character's power sheet changed.
    StatsUpdated {
        character_id: CharacterId,
        sheet: PowerSheet,
    },
    /// Non-stat character fields changed.
    CharacterUpdated {
        character_id: CharacterId,
        name: String,
        image_url: Option<String>,
    },
    TypingStatus {
        user_id: UserId,
        typing: bool,
    },
}

/// The session fields subscribers need to re-render after a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameUpdate {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_turn_index: TurnIndex,
    pub active_player: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Broadcast and response payload for a resolved turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResolvedPayload {
    pub turn_id: TurnId,
    pub narrative: String,
    pub choices: Vec<NarrativeChoice>,
    pub stat_updates: Vec<StatChangeSummary>,
    /// Absent when the game ended on this turn.
    pub next_active_player: Option<NextActivePlayer>,
}

/// Compact summary of one character's resolved delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatChangeSummary {
    pub character_id: CharacterId,
    pub hp_before: Health,
    pub hp_after: Health,
    pub died: bool,
    pub leveled_to: Option<Level>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextActivePlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub character: CharacterRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRef {
    pub id: CharacterId,
    pub name: String,
    pub image_url: Option<String>,
}
