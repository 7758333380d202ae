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

/// Configuration recognized by the game core.
///
/// [Default] carries the documented defaults; deployments deserialize
/// overrides from whatever configuration source the host process uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub rate: RateLimits,

    /// Upper bound on a single dungeon master call, end to end.
    pub dm_timeout_ms: u64,

    /// Age past which a `resolving` turn is treated as stuck and reclaimed.
    pub turn_stuck_threshold_ms: u64,

    /// Bounded per-subscriber event queue. A subscriber that falls further
    /// behind than this is dropped and must resubscribe.
    pub subscriber_queue_max: usize,
}

/// Per-kind request ceilings, all over a shared absolute window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimits {
    pub character_creation_max: u32,
    pub image_generation_max: u32,
    pub turn_processing_max: u32,
    pub window_secs: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rate: RateLimits::default(),
            dm_timeout_ms: 30_000,
            turn_stuck_threshold_ms: 30_000,
            subscriber_queue_max: 64,
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            character_creation_max: 10,
            image_generation_max: 3,
            turn_processing_max: 60,
            window_secs: 3600,
        }
    }
}
