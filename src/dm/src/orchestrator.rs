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

use std::time::Duration;

use data::actions::turn_action::{PlayerAction, MAX_CUSTOM_ACTION_LEN};
use tokio::time;
use tracing::debug;

use crate::error::DmError;
use crate::mapping;
use crate::provider::NarrativeModel;
use crate::types::{DmRequest, DmResponse};

/// Default upper bound on one dungeon master call, end to end.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Wraps the narrative model behind validation and a deadline.
pub struct DmOrchestrator<M> {
    model: M,
    timeout: Duration,
}

impl<M: NarrativeModel> DmOrchestrator<M> {
    pub fn new(model: M) -> Self {
        Self { model, timeout: DEFAULT_TIMEOUT }
    }

    /// Override the call deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves one turn with the dungeon master.
    ///
    /// Custom actions are pre-validated locally first; a rejection there
    /// short-circuits the model call entirely. The model call is bounded by
    /// the configured deadline, and its reply is validated before anything
    /// reaches the caller.
    pub async fn run(&self, request: &DmRequest) -> Result<DmResponse, DmError> {
        pre_validate(request)?;
        debug!(session_id = ?request.session_id, "Calling the dungeon master");
        let raw = time::timeout(self.timeout, self.model.narrate(request))
            .await
            .map_err(|_| DmError::UpstreamTimeout)??;
        mapping::parse_reply(request, &raw)
    }
}

/// Local checks that catch obviously invalid custom actions before paying
/// for a model call. Standard options always pass.
fn pre_validate(request: &DmRequest) -> Result<(), DmError> {
    let PlayerAction::Custom(text) = &request.action else {
        return Ok(());
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DmError::ValidationRejected(
            "describe what your character does".into(),
        ));
    }
    if trimmed.chars().count() > MAX_CUSTOM_ACTION_LEN {
        return Err(DmError::ValidationRejected(format!(
            "actions are limited to {MAX_CUSTOM_ACTION_LEN} characters"
        )));
    }
    // "use <ability> ..." must open with an ability the character has.
    if let Some(rest) = strip_prefix_ignore_case(trimmed, "use ") {
        let clause = rest.split([',', '.', ';']).next().unwrap_or(rest).trim();
        let sheet = &request.active_character.sheet;
        let known = sheet.abilities.iter().any(|ability| {
            starts_with_ignore_case(clause, ability.name.trim())
        });
        if !clause.is_empty() && !known {
            return Err(DmError::ValidationRejected(format!(
                "{} does not know \"{clause}\"",
                request.active_character.name
            )));
        }
    }
    Ok(())
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    !prefix.is_empty() && strip_prefix_ignore_case(text, prefix).is_some()
}
