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

use crate::characters::power_sheet::PowerSheet;
use crate::core::primitives::{CharacterId, SessionId, UserId};

/// A character inside one session, unique per (session, user).
///
/// The character's lifetime is the lifetime of the session it belongs to.
/// Its power sheet is mutated only by the turn coordinator while resolving
/// the active turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub session_id: SessionId,
    pub owner: UserId,
    pub name: String,
    pub image_url: Option<String>,
    pub sheet: PowerSheet,
}

impl Character {
    pub fn is_alive(&self) -> bool {
        self.sheet.is_alive()
    }
}
