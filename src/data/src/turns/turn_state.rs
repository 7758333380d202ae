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

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::numerics::TurnIndex;
use crate::core::primitives::{SessionId, TurnId, UserId};

/// One durable turn record.
///
/// `(session_id, turn_index)` is unique across all turn records; claiming
/// that slot is what grants exclusive right to resolve the current turn.
/// A session has at most one non-completed turn at any instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: TurnId,
    pub session_id: SessionId,
    pub turn_index: TurnIndex,
    pub active_player: UserId,
    pub phase: TurnPhase,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Claimed; resolution is in flight.
    Resolving,
    Completed,
}

impl TurnRecord {
    /// How long ago this turn was claimed.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }
}
