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

use data::characters::power_sheet::{Perk, PowerSheet};
use data::characters::stat_delta::StatDelta;
use data::core::numerics::{Health, Level};
use thiserror::Error;

/// Result of applying a delta: the new sheet plus the events it derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub sheet: PowerSheet,
    pub derived: Vec<DerivedEvent>,
}

/// Events a delta application derives beyond the stat change itself.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedEvent {
    /// hp crossed from above 0 to 0.
    Death,
    /// Level increased. `perks` names the perks whose unlock level equals
    /// the new level.
    LevelUp { new_level: Level, perks: Vec<String> },
}

/// A structurally malformed delta.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatError {
    #[error("status effect with an empty name")]
    EmptyStatusName,

    #[error("perk grant with an empty name")]
    EmptyPerkName,

    #[error("delta would leave max hp at {0}, below 1")]
    MaxHpOutOfRange(Health),
}

/// Applies `delta` to `sheet`, producing the new sheet and derived events.
///
/// Pure and deterministic. Edge behavior:
/// - hp is clamped to `[0, max_hp]` after addition
/// - raising max hp scales current hp proportionally, but never revives a
///   dead character; only an explicit positive hp delta does that
/// - hp crossing to 0 derives [DerivedEvent::Death], normalized to exactly 0
/// - the resulting level is clamped to 1 or greater; an increase derives
///   [DerivedEvent::LevelUp] naming the perks unlocked at the new level
/// - added statuses replace an existing status with the same name
/// - perks are appended with `unlocked_at` set to the new level
pub fn apply(sheet: &PowerSheet, delta: &StatDelta) -> Result<Applied, StatError> {
    if delta.add_statuses.iter().any(|s| s.name.trim().is_empty()) {
        return Err(StatError::EmptyStatusName);
    }
    if delta.add_perks.iter().any(|p| p.name.trim().is_empty()) {
        return Err(StatError::EmptyPerkName);
    }

    let old_max = sheet.max_hp;
    let new_max = old_max + delta.max_hp;
    if new_max < 1 {
        return Err(StatError::MaxHpOutOfRange(new_max));
    }

    let mut hp = sheet.hp;
    if delta.max_hp > 0 && sheet.hp > 0 {
        hp = scale_hp(sheet.hp, old_max, new_max);
    }
    hp = (hp + delta.hp).clamp(0, new_max);

    let new_level = (sheet.level as i64 + delta.level).max(1) as Level;

    let mut next = sheet.clone();
    next.hp = hp;
    next.max_hp = new_max;
    next.level = new_level;
    for (attribute, value) in delta.attributes.iter() {
        next.attributes[attribute] += *value;
    }
    for status in &delta.add_statuses {
        match next.statuses.iter_mut().find(|s| s.name == status.name) {
            Some(existing) => *existing = status.clone(),
            None => next.statuses.push(status.clone()),
        }
    }
    for grant in &delta.add_perks {
        next.perks.push(Perk {
            name: grant.name.clone(),
            description: grant.description.clone(),
            unlocked_at: new_level,
        });
    }

    let mut derived = vec![];
    if sheet.hp > 0 && next.hp == 0 {
        derived.push(DerivedEvent::Death);
    }
    if new_level > sheet.level {
        let perks = next
            .perks
            .iter()
            .filter(|p| p.unlocked_at == new_level)
            .map(|p| p.name.clone())
            .collect();
        derived.push(DerivedEvent::LevelUp { new_level, perks });
    }

    Ok(Applied { sheet: next, derived })
}

fn scale_hp(hp: Health, old_max: Health, new_max: Health) -> Health {
    (hp as i128 * new_max as i128 / old_max as i128) as Health
}
