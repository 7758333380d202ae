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

//! Deterministic [NarrativeModel] double for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use data::characters::stat_delta::StatDelta;
use data::core::primitives::CharacterId;
use serde_json::json;

use crate::provider::{ModelError, NarrativeModel};
use crate::types::DmRequest;

/// Replays a queue of scripted replies in order.
///
/// Clones share the same queue, so a test can keep a handle after moving
/// the model into the orchestrator.
#[derive(Clone)]
pub struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<Result<String, ModelError>>>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self { replies: Arc::new(Mutex::new(VecDeque::new())), delay: None }
    }

    /// A model that answers every call with the same reply.
    pub fn replying(reply: impl Into<String>) -> Self {
        let model = Self::new();
        model.push_reply(reply);
        model
    }

    /// Sleep this long before answering; combine with a short orchestrator
    /// deadline to exercise the timeout path.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: ModelError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NarrativeModel for ScriptedModel {
    async fn narrate(&self, _request: &DmRequest) -> Result<String, ModelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Transport("scripted model exhausted".into())))
    }
}

/// Builds a well-formed reply with four generic choices and the given
/// stat updates.
pub fn canned_reply(narrative: &str, stat_updates: &[(CharacterId, StatDelta)]) -> String {
    let updates: Vec<_> = stat_updates
        .iter()
        .map(|(character_id, delta)| {
            let mut value = serde_json::to_value(delta).expect("delta serializes");
            value["character_id"] = json!(character_id);
            value
        })
        .collect();
    json!({
        "success": true,
        "narrative": narrative,
        "choices": [
            { "label": "A", "text": "Press on", "risk": "low" },
            { "label": "B", "text": "Scout ahead", "risk": "medium" },
            { "label": "C", "text": "Set a trap", "risk": "medium" },
            { "label": "D", "text": "Charge in", "risk": "high" },
        ],
        "stat_updates": updates,
        "validation_error": null,
    })
    .to_string()
}

/// Builds a reply in which the dungeon master rejects the action.
pub fn rejection_reply(message: &str) -> String {
    json!({
        "success": false,
        "narrative": "",
        "choices": [],
        "stat_updates": [],
        "validation_error": message,
    })
    .to_string()
}
