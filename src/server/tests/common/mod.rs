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

#![allow(dead_code)]

use chrono::Utc;
use data::actions::turn_action::{ChoiceLabel, PlayerAction, SubmitTurnAction};
use data::characters::character_state::Character;
use data::characters::power_sheet::{Ability, PowerSheet};
use data::core::config::CoreConfig;
use data::core::numerics::Health;
use data::core::primitives::{CharacterId, SessionId, UserId};
use data::sessions::participant::{Participant, ParticipantRole};
use data::sessions::session_state::{DifficultyTier, GameSession, SessionStatus};
use database::database::Database;
use database::sled_database::SledDatabase;
use dm::testing::ScriptedModel;
use server::server::CoreServices;
use server::server_data::ClientData;

/// An in-play session seeded straight into storage.
pub struct Seeded {
    pub session: GameSession,
    pub characters: Vec<Character>,
    pub users: Vec<UserId>,
}

impl Seeded {
    pub fn user(&self, index: usize) -> UserId {
        self.users[index]
    }

    pub fn character(&self, index: usize) -> &Character {
        &self.characters[index]
    }
}

/// Writes an active session with one character per entry of `hps`; an entry
/// of 0 seeds that character dead.
pub async fn seed_active_session(db: &SledDatabase, hps: &[Health]) -> Seeded {
    let session_id = SessionId(uuid::Uuid::new_v4());
    let now = Utc::now();
    let mut participants = vec![];
    let mut characters = vec![];
    for (index, &hp) in hps.iter().enumerate() {
        let user_id = UserId(uuid::Uuid::new_v4());
        let mut sheet = PowerSheet::baseline(100);
        sheet.hp = hp;
        sheet.abilities = vec![Ability {
            name: "Fireball".into(),
            description: "A burst of flame".into(),
            cooldown: None,
        }];
        let character = Character {
            id: CharacterId(uuid::Uuid::new_v4()),
            session_id,
            owner: user_id,
            name: format!("hero-{index}"),
            image_url: None,
            sheet,
        };
        participants.push(Participant {
            user_id,
            role: if index == 0 { ParticipantRole::Host } else { ParticipantRole::Player },
            display_name: format!("player-{index}"),
            character_id: Some(character.id),
            joined_at: now,
        });
        characters.push(character);
    }
    let users: Vec<_> = participants.iter().map(|p| p.user_id).collect();
    let session = GameSession {
        id: session_id,
        name: "the long dark".into(),
        host: users[0],
        status: SessionStatus::Active,
        participants,
        turn_order: users.clone(),
        current_turn_index: 0,
        house_rules: None,
        tone_tags: vec!["grim".into()],
        difficulty: DifficultyTier::Standard,
        created_at: now,
        completed_at: None,
    };

    for character in &characters {
        db.write_character(character).await.unwrap();
    }
    db.write_session(&session).await.unwrap();
    Seeded { session, characters, users }
}

/// A service bundle plus a handle onto its scripted model.
pub fn services_with(config: CoreConfig) -> (CoreServices<ScriptedModel>, ScriptedModel) {
    let model = ScriptedModel::new();
    (CoreServices::new(config, model.clone()), model)
}

pub fn services_from(
    config: CoreConfig,
    model: ScriptedModel,
) -> CoreServices<ScriptedModel> {
    CoreServices::new(config, model)
}

pub fn client(user_id: UserId, session_id: SessionId) -> ClientData {
    ClientData { user_id, session_id: Some(session_id) }
}

pub fn choose(session_id: SessionId, label: ChoiceLabel) -> SubmitTurnAction {
    SubmitTurnAction { session_id, action: PlayerAction::Standard(label) }
}

pub fn custom(session_id: SessionId, text: &str) -> SubmitTurnAction {
    SubmitTurnAction { session_id, action: PlayerAction::Custom(text.into()) }
}
