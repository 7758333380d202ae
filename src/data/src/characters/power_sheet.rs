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

use enum_iterator::Sequence;
use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};

use crate::core::numerics::{AttributeValue, Health, Level};

/// The fixed set of named attributes on every power sheet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum, Sequence,
)]
pub enum Attribute {
    Strength,
    Agility,
    Intelligence,
    Charisma,
    Endurance,
}

/// The complete mutable stat record of a character.
///
/// Invariants maintained by the rules engine:
/// - `0 <= hp <= max_hp`; `hp == 0` means the character is dead.
/// - `level >= 1`.
/// - `statuses` are unique by name.
/// - `perks` are append-only within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSheet {
    pub level: Level,
    pub hp: Health,
    pub max_hp: Health,
    pub attributes: EnumMap<Attribute, AttributeValue>,
    pub abilities: Vec<Ability>,
    pub weakness: String,
    pub statuses: Vec<StatusEffect>,
    pub perks: Vec<Perk>,
}

impl PowerSheet {
    /// A fresh level-1 sheet at full health with no abilities or statuses.
    pub fn baseline(max_hp: Health) -> Self {
        Self {
            level: 1,
            hp: max_hp,
            max_hp,
            attributes: EnumMap::default(),
            abilities: vec![],
            weakness: String::new(),
            statuses: vec![],
            perks: vec![],
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Looks up an ability by case-insensitive name.
    pub fn ability(&self, name: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// A named move a character can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub description: String,
    /// Turns before the ability can be used again, if it has a cooldown.
    pub cooldown: Option<u32>,
}

/// A temporary condition on a character.
///
/// `remaining_turns` counts down at each pointer advance past the owning
/// character; a status at 0 is removed at that advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: String,
    pub description: String,
    pub remaining_turns: u32,
    pub effect: String,
}

/// A permanent unlock. Perks never leave a sheet once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perk {
    pub name: String,
    pub description: String,
    /// The character level at which this perk was appended.
    pub unlocked_at: Level,
}
