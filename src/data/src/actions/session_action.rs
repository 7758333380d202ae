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

use serde::{Deserialize, Serialize};

use crate::characters::power_sheet::Ability;
use crate::core::numerics::Health;
use crate::core::primitives::SessionId;
use crate::sessions::session_state::DifficultyTier;

/// Session lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionAction {
    Create(CreateSessionAction),

    Join(JoinSessionAction),

    /// Leave a lobby. The last participant leaving deletes the session; a
    /// leaving host hands the role to the earliest-joined remaining player.
    Leave { session_id: SessionId },

    /// Host-only. Fixes the turn order and transitions the session to
    /// active. Requires at least two participants, each with a character.
    Start { session_id: SessionId },

    /// Host-only, lobby-only. Removes the session and everything it owns.
    Delete { session_id: SessionId },

    /// Current pointer, roster with hp, and recent turns.
    Status { session_id: SessionId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionAction {
    pub name: String,
    pub display_name: String,
    pub house_rules: Option<String>,
    pub tone_tags: Vec<String>,
    pub difficulty: DifficultyTier,
    pub character: CharacterSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSessionAction {
    pub session_id: SessionId,
    pub display_name: String,
    pub character: CharacterSpec,
}

/// The in-session character a joining player brings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub max_hp: Health,
    pub abilities: Vec<Ability>,
    pub weakness: String,
}
