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

//! Parses and validates raw model replies into [DmResponse].

use std::collections::HashMap;

use data::actions::turn_action::{ChoiceLabel, NarrativeChoice, RiskTier};
use data::characters::power_sheet::{Attribute, StatusEffect};
use data::characters::stat_delta::{PerkGrant, StatDelta};
use data::core::numerics::AttributeValue;
use data::core::primitives::CharacterId;
use enum_iterator::all;
use serde::Deserialize;
use tracing::warn;

use crate::error::DmError;
use crate::types::{DmRequest, DmResponse, StatUpdate};

/// The reply shape the model is prompted to produce.
#[derive(Debug, Deserialize)]
struct WireReply {
    success: bool,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    stat_updates: Vec<WireStatUpdate>,
    #[serde(default)]
    validation_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    label: ChoiceLabel,
    text: String,
    risk: RiskTier,
}

#[derive(Debug, Deserialize)]
struct WireStatUpdate {
    character_id: CharacterId,
    #[serde(default)]
    hp: i64,
    #[serde(default)]
    max_hp: i64,
    #[serde(default)]
    level: i64,
    #[serde(default)]
    attributes: HashMap<Attribute, AttributeValue>,
    #[serde(default)]
    add_statuses: Vec<StatusEffect>,
    #[serde(default)]
    add_perks: Vec<PerkGrant>,
}

/// Validates `raw` against the wire format, in the context of `request`.
///
/// Stat updates naming characters outside the session are dropped with a
/// warning rather than failing the turn.
pub fn parse_reply(request: &DmRequest, raw: &str) -> Result<DmResponse, DmError> {
    let reply: WireReply = serde_json::from_str(raw)
        .map_err(|e| DmError::MalformedResponse(e.to_string()))?;

    if let Some(message) = reply.validation_error.filter(|m| !m.trim().is_empty()) {
        return Err(DmError::ValidationRejected(message));
    }
    if !reply.success {
        return Err(DmError::Upstream("the model reported failure".into()));
    }
    if reply.narrative.trim().is_empty() {
        return Err(DmError::MalformedResponse("empty narrative".into()));
    }

    let choices = validate_choices(reply.choices)?;

    let mut stat_updates = vec![];
    for update in reply.stat_updates {
        if request.character(update.character_id).is_none() {
            warn!(
                character_id = ?update.character_id,
                session_id = ?request.session_id,
                "Dropping stat update for character outside the session"
            );
            continue;
        }
        stat_updates.push(StatUpdate {
            character_id: update.character_id,
            delta: into_delta(update),
        });
    }

    Ok(DmResponse { narrative: reply.narrative, choices, stat_updates })
}

/// Exactly four options, one per label A through D, returned in label order.
fn validate_choices(wire: Vec<WireChoice>) -> Result<Vec<NarrativeChoice>, DmError> {
    if wire.len() != 4 {
        return Err(DmError::MalformedResponse(format!(
            "expected 4 choices, got {}",
            wire.len()
        )));
    }
    let mut ordered = vec![];
    for label in all::<ChoiceLabel>() {
        let found = wire
            .iter()
            .find(|c| c.label == label)
            .ok_or_else(|| DmError::MalformedResponse(format!("missing choice {label}")))?;
        if found.text.trim().is_empty() {
            return Err(DmError::MalformedResponse(format!("empty text for choice {label}")));
        }
        ordered.push(NarrativeChoice {
            label,
            text: found.text.clone(),
            risk: found.risk,
        });
    }
    Ok(ordered)
}

fn into_delta(update: WireStatUpdate) -> StatDelta {
    let mut delta = StatDelta {
        hp: update.hp,
        max_hp: update.max_hp,
        level: update.level,
        add_statuses: update.add_statuses,
        add_perks: update.add_perks,
        ..StatDelta::default()
    };
    for (attribute, value) in update.attributes {
        delta.attributes[attribute] = value;
    }
    delta
}
