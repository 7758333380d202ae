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

use std::fmt;

use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

use crate::core::primitives::SessionId;

/// Upper bound on custom action text, in characters.
pub const MAX_CUSTOM_ACTION_LEN: usize = 500;

/// Submit the active player's action for the current turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTurnAction {
    pub session_id: SessionId,
    pub action: PlayerAction,
}

/// What the active player chose to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// One of the four options the dungeon master offered last turn.
    Standard(ChoiceLabel),
    /// Free-text action, bounded by [MAX_CUSTOM_ACTION_LEN].
    Custom(String),
}

impl PlayerAction {
    /// The text recorded in the durable `action` event.
    pub fn recorded_text(&self) -> String {
        match self {
            PlayerAction::Standard(label) => format!("chose {label}"),
            PlayerAction::Custom(text) => text.clone(),
        }
    }
}

/// Label of one of the four standard options.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence,
)]
pub enum ChoiceLabel {
    A,
    B,
    C,
    D,
}

impl fmt::Display for ChoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChoiceLabel::A => "A",
            ChoiceLabel::B => "B",
            ChoiceLabel::C => "C",
            ChoiceLabel::D => "D",
        };
        write!(f, "{label}")
    }
}

/// How dangerous the dungeon master considers an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// One of the four options offered for the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeChoice {
    pub label: ChoiceLabel,
    pub text: String,
    pub risk: RiskTier,
}

/// Ephemeral typing-presence signal for a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TypingAction {
    pub session_id: SessionId,
    pub typing: bool,
}
