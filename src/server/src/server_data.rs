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
use data::core::numerics::{Health, Level, TurnIndex};
use data::core::primitives::{CharacterId, SessionId, TurnId, UserId};
use data::events::session_event::{NextActivePlayer, TurnResolvedPayload};
use data::sessions::participant::ParticipantRole;
use data::sessions::session_state::SessionStatus;
use data::turns::turn_state::TurnPhase;
use serde::{Deserialize, Serialize};
use utils::errors::{GameError, RateLimitDetails};

/// Standard parameters for a client request.
#[derive(Debug, Clone, Copy)]
pub struct ClientData {
    pub user_id: UserId,
    pub session_id: Option<SessionId>,
}

/// A response to a user request.
#[derive(Debug, Clone)]
pub struct GameResponse {
    pub context: ClientData,
    pub body: ResponseBody,
}

impl GameResponse {
    pub fn ack(context: ClientData) -> Self {
        Self { context, body: ResponseBody::Ack }
    }

    pub fn session(context: ClientData, payload: SessionStatusPayload) -> Self {
        Self { context, body: ResponseBody::Session(payload) }
    }

    pub fn turn(context: ClientData, payload: TurnResolvedPayload) -> Self {
        Self { context, body: ResponseBody::TurnResolved(payload) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseBody {
    /// The operation succeeded and has no payload.
    Ack,
    Session(SessionStatusPayload),
    TurnResolved(TurnResolvedPayload),
}

/// Current pointer, roster and recent turns of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusPayload {
    pub session_id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub current_turn_index: TurnIndex,
    pub active_player: Option<NextActivePlayer>,
    pub turn_order: Vec<UserId>,
    pub roster: Vec<RosterPlayer>,
    pub recent_turns: Vec<TurnSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub role: ParticipantRole,
    pub character_id: Option<CharacterId>,
    pub character_name: Option<String>,
    pub hp: Health,
    pub max_hp: Health,
    pub level: Level,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSummary {
    pub turn_id: TurnId,
    pub turn_index: TurnIndex,
    pub active_player: UserId,
    pub phase: TurnPhase,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The stable failure shape every surface returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&GameError> for ErrorEnvelope {
    fn from(error: &GameError) -> Self {
        let details = error
            .rate_limit_details()
            .and_then(|d| serde_json::to_value(d).ok());
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: error.retryable(),
            details,
        }
    }
}

/// Header-shaped rate metadata: limit, remaining, reset as epoch millis,
/// and retry-after seconds for denied requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitMeta {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
    pub retry_after_secs: u64,
}

impl From<&RateLimitDetails> for RateLimitMeta {
    fn from(details: &RateLimitDetails) -> Self {
        Self {
            limit: details.limit,
            remaining: details.remaining,
            reset_at_ms: details.reset_at.timestamp_millis(),
            retry_after_secs: details.retry_after_secs,
        }
    }
}
