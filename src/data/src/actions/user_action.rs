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

use crate::actions::session_action::SessionAction;
use crate::actions::turn_action::{SubmitTurnAction, TypingAction};

/// Every request a client can make of the game core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserAction {
    /// Session lifecycle operation.
    SessionAction(SessionAction),

    /// Submit the active player's action for the current turn.
    SubmitTurn(SubmitTurnAction),

    /// Ephemeral typing-presence signal.
    TypingStatus(TypingAction),
}

impl From<SessionAction> for UserAction {
    fn from(value: SessionAction) -> Self {
        UserAction::SessionAction(value)
    }
}

impl From<SubmitTurnAction> for UserAction {
    fn from(value: SubmitTurnAction) -> Self {
        UserAction::SubmitTurn(value)
    }
}

impl From<TypingAction> for UserAction {
    fn from(value: TypingAction) -> Self {
        UserAction::TypingStatus(value)
    }
}
