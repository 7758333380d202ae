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
use dashmap::DashMap;
use data::core::config::RateLimits;
use data::core::primitives::UserId;
use utils::errors::RateLimitDetails;

/// Throttled request families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitKind {
    CharacterCreation,
    /// Shared by scene generation and image regeneration.
    ImageGeneration,
    TurnProcessing,
}

/// Outcome of one [RateLimiter::check].
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Absolute wall-clock instant the window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateDecision {
    /// Payload for [utils::errors::GameError::RateLimitExceeded].
    pub fn details(&self, now: DateTime<Utc>) -> RateLimitDetails {
        RateLimitDetails {
            limit: self.limit,
            remaining: self.remaining,
            reset_at: self.reset_at,
            retry_after_secs: (self.reset_at - now).num_seconds().max(0) as u64,
        }
    }
}

struct Bucket {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Per-(kind, principal) token buckets with absolute wall-clock reset.
///
/// Process-local and non-durable; restarting the process clears all state.
/// Does not enforce global fairness across principals.
pub struct RateLimiter {
    buckets: DashMap<(RateLimitKind, UserId), Bucket>,
    limits: RateLimits,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self { buckets: DashMap::new(), limits }
    }

    /// Checks and consumes one token. Allowed calls increment the bucket;
    /// an expired window resets to a fresh bucket with one token consumed.
    pub fn check(&self, kind: RateLimitKind, principal: UserId) -> RateDecision {
        self.check_at(kind, principal, Utc::now())
    }

    /// Clock-injected form of [RateLimiter::check]; the window logic is
    /// tested through this.
    pub fn check_at(
        &self,
        kind: RateLimitKind,
        principal: UserId,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let max = self.max_for(kind);
        let window = Duration::seconds(self.limits.window_secs as i64);
        let mut bucket = self.buckets.entry((kind, principal)).or_insert_with(|| Bucket {
            count: 0,
            reset_at: now + window,
        });

        if now >= bucket.reset_at {
            bucket.count = 1;
            bucket.reset_at = now + window;
        } else if bucket.count < max {
            bucket.count += 1;
        } else {
            return RateDecision {
                allowed: false,
                limit: max,
                remaining: 0,
                reset_at: bucket.reset_at,
            };
        }
        RateDecision {
            allowed: true,
            limit: max,
            remaining: max - bucket.count,
            reset_at: bucket.reset_at,
        }
    }

    /// Drops every bucket. Test use only.
    pub fn clear_all(&self) {
        self.buckets.clear();
    }

    fn max_for(&self, kind: RateLimitKind) -> u32 {
        match kind {
            RateLimitKind::CharacterCreation => self.limits.character_creation_max,
            RateLimitKind::ImageGeneration => self.limits.image_generation_max,
            RateLimitKind::TurnProcessing => self.limits.turn_processing_max,
        }
    }
}
