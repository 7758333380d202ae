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

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};

use crate::characters::power_sheet::{Attribute, StatusEffect};
use crate::core::numerics::{AttributeValue, Health};

/// A partial, additive description of changes to a power sheet.
///
/// Every field defaults to "no change". Deltas come from the dungeon master
/// and are applied by the rules engine, which owns all clamping and edge
/// behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatDelta {
    /// Signed hp change, applied after any max-hp scaling.
    pub hp: Health,
    /// Signed max-hp change.
    pub max_hp: Health,
    /// Signed level change; the resulting level is clamped to 1 or greater.
    pub level: i64,
    /// Signed per-attribute changes.
    pub attributes: EnumMap<Attribute, AttributeValue>,
    /// Statuses to add. An existing status with the same name is replaced.
    pub add_statuses: Vec<StatusEffect>,
    /// Perks to append. `unlocked_at` is assigned at apply time.
    pub add_perks: Vec<PerkGrant>,
}

/// A perk the dungeon master grants, before its unlock level is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerkGrant {
    pub name: String,
    pub description: String,
}

impl StatDelta {
    /// A delta that changes a single scalar: hp.
    pub fn hp(amount: Health) -> Self {
        Self { hp: amount, ..Self::default() }
    }

    /// True when applying this delta cannot change any sheet.
    pub fn is_noop(&self) -> bool {
        self.hp == 0
            && self.max_hp == 0
            && self.level == 0
            && self.attributes.values().all(|v| *v == 0)
            && self.add_statuses.is_empty()
            && self.add_perks.is_empty()
    }

    /// Structural merge: scalar fields add, list fields concatenate with
    /// `other` taking precedence. Applying `a.merged(b)` is equivalent to
    /// applying `a` then `b` for non-conflicting fields.
    pub fn merged(&self, other: &StatDelta) -> StatDelta {
        let mut attributes = self.attributes.clone();
        for (attribute, value) in other.attributes.iter() {
            attributes[attribute] += *value;
        }
        let mut add_statuses = self.add_statuses.clone();
        add_statuses.extend(other.add_statuses.iter().cloned());
        let mut add_perks = self.add_perks.clone();
        add_perks.extend(other.add_perks.iter().cloned());
        StatDelta {
            hp: self.hp + other.hp,
            max_hp: self.max_hp + other.max_hp,
            level: self.level + other.level,
            attributes,
            add_statuses,
            add_perks,
        }
    }
}
