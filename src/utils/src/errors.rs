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
use thiserror::Error;

/// Transport-agnostic error kinds surfaced by the game core.
///
/// Every failure a caller can observe maps to exactly one of these kinds.
/// Collaborators (the store, the dungeon master) have their own error enums
/// which the server folds into this taxonomy before responding.
#[derive(Debug, Clone, Error)]
pub enum GameError {
    /// No authenticated principal on the request.
    #[error("authentication required")]
    Unauthorized,

    /// Principal is not permitted to act on this resource.
    #[error("{0}")]
    Forbidden(String),

    /// The referenced session or character does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Input shape was invalid before any game rule was consulted.
    #[error("{0}")]
    ValidationFailed(String),

    /// Principal exceeded a rate window. See [RateLimitDetails].
    #[error("rate limit exceeded, retry after {}", .0.reset_at)]
    RateLimitExceeded(RateLimitDetails),

    /// The session is not in the lifecycle state this operation requires.
    #[error("{0}")]
    SessionNotActive(String),

    /// The submitting principal is not the active player.
    #[error("it is not your turn to act")]
    NotYourTurn,

    /// The active character has 0 hp and may not act.
    #[error("your character is dead and cannot act")]
    CharacterDead,

    /// A concurrent submit holds the current turn slot.
    #[error("the current turn is already being resolved")]
    TurnAlreadyProcessing,

    /// The action was rejected by the pre-validator or the dungeon master.
    #[error("{0}")]
    InvalidAction(String),

    /// The upstream narrative model failed.
    #[error("the dungeon master could not resolve this turn: {0}")]
    DmGenerationFailed(String),

    /// No character in the session is alive; the game has ended.
    #[error("the game is over")]
    GameOver,

    /// Unclassified internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Payload attached to [GameError::RateLimitExceeded].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitDetails {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub retry_after_secs: u64,
}

impl GameError {
    /// Stable wire code for this kind, independent of the display message.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Unauthorized => "unauthorized",
            GameError::Forbidden(_) => "forbidden",
            GameError::NotFound(_) => "not-found",
            GameError::ValidationFailed(_) => "validation-failed",
            GameError::RateLimitExceeded(_) => "rate-limit-exceeded",
            GameError::SessionNotActive(_) => "session-not-active",
            GameError::NotYourTurn => "not-your-turn",
            GameError::CharacterDead => "character-dead",
            GameError::TurnAlreadyProcessing => "turn-already-processing",
            GameError::InvalidAction(_) => "invalid-action",
            GameError::DmGenerationFailed(_) => "dm-generation-failed",
            GameError::GameOver => "game-over",
            GameError::Internal(_) => "internal",
        }
    }

    /// Whether retrying the same request (possibly after a delay or with a
    /// different action) can succeed.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            GameError::RateLimitExceeded(_)
                | GameError::TurnAlreadyProcessing
                | GameError::InvalidAction(_)
                | GameError::DmGenerationFailed(_)
        )
    }

    /// Rate-limit metadata, present only on [GameError::RateLimitExceeded].
    pub fn rate_limit_details(&self) -> Option<&RateLimitDetails> {
        match self {
            GameError::RateLimitExceeded(details) => Some(details),
            _ => None,
        }
    }
}
