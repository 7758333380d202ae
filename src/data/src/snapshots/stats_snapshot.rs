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

use crate::characters::power_sheet::PowerSheet;
use crate::core::numerics::TurnIndex;
use crate::core::primitives::{CharacterId, SessionId, TurnId};

/// A character's full power sheet at the end of one turn.
///
/// Append-only; the progression history of a character is the ordered list
/// of its snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub session_id: SessionId,
    pub character_id: CharacterId,
    pub turn_id: TurnId,
    pub turn_index: TurnIndex,
    pub sheet: PowerSheet,
    pub at: DateTime<Utc>,
}
