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

use async_trait::async_trait;
use thiserror::Error;

use crate::types::DmRequest;

/// The external narrative model behind the dungeon master.
///
/// Implementations own the vendor client and its prompt engineering; the
/// orchestrator only sees the raw reply text, which it parses and validates
/// against the wire format in [crate::mapping].
#[async_trait]
pub trait NarrativeModel: Send + Sync {
    /// Produces the raw reply for one turn. The orchestrator bounds this
    /// call with its configured deadline.
    async fn narrate(&self, request: &DmRequest) -> Result<String, ModelError>;
}

/// Transport-level failures a model implementation can surface.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("upstream status {status}: {message}")]
    Upstream { status: u16, message: String },
}
