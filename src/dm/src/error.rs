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

use thiserror::Error;

use crate::provider::ModelError;

/// Failure taxonomy of a dungeon master call.
#[derive(Debug, Clone, Error)]
pub enum DmError {
    /// The model call exceeded the configured deadline. Retryable.
    #[error("the dungeon master timed out")]
    UpstreamTimeout,

    /// The model call failed upstream. Surfaces once and fails the turn
    /// without mutation.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The reply could not be parsed or failed structural validation.
    #[error("malformed reply: {0}")]
    MalformedResponse(String),

    /// The action was rejected as out-of-character or out-of-world, either
    /// by local pre-validation or by the model itself. No state changes
    /// follow.
    #[error("{0}")]
    ValidationRejected(String),
}

impl DmError {
    /// Whether retrying the call might succeed.
    pub fn retryable(&self) -> bool {
        matches!(self, DmError::UpstreamTimeout)
    }
}

impl From<ModelError> for DmError {
    fn from(value: ModelError) -> Self {
        DmError::Upstream(value.to_string())
    }
}
