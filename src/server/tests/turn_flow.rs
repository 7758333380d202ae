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

mod common;

use chrono::{Duration, Utc};
use common::{choose, client, custom, seed_active_session, services_from, services_with};
use data::actions::turn_action::ChoiceLabel;
use data::characters::stat_delta::StatDelta;
use data::core::config::CoreConfig;
use data::core::primitives::TurnId;
use data::events::game_event::GameEventKind;
use data::events::session_event::{SessionEvent, TurnResolvedPayload};
use data::sessions::session_state::SessionStatus;
use data::turns::turn_state::{TurnPhase, TurnRecord};
use database::database::Database;
use database::sled_database::SledDatabase;
use dm::provider::ModelError;
use dm::testing::{canned_reply, rejection_reply, ScriptedModel};
use server::server_data::ResponseBody;
use server::turn_server;
use utils::errors::GameError;
use uuid::Uuid;

fn turn_payload(body: ResponseBody) -> TurnResolvedPayload {
    match body {
        ResponseBody::TurnResolved(payload) => payload,
        other => panic!("expected a resolved turn, got {other:?}"),
    }
}

// S1: a standard choice resolves, logs one action and one narrative event,
// and hands the turn to the next player.
#[tokio::test]
async fn happy_turn_advances_the_pointer() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("You strike.", &[]));
    let mut subscriber = services.bus.subscribe(seeded.session.id);

    let response = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap();

    let payload = turn_payload(response.body);
    assert_eq!(payload.narrative, "You strike.");
    assert_eq!(payload.choices.len(), 4);
    assert!(payload.stat_updates.is_empty());
    assert_eq!(
        payload.next_active_player.as_ref().map(|p| p.user_id),
        Some(seeded.user(1))
    );

    let session = db.fetch_session(seeded.session.id).await.unwrap().unwrap();
    assert_eq!(session.current_turn_index, 1);
    assert_eq!(session.active_player(), Some(seeded.user(1)));

    let turn = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(turn.phase, TurnPhase::Completed);
    assert!(turn.completed_at.is_some());

    let events = db.session_events(seeded.session.id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0].kind,
        GameEventKind::Action { text, .. } if text == "chose A"
    ));
    assert!(events[1].is_narrative());

    // No sheets changed, so the first broadcasts are the session update and
    // the resolved turn.
    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::GameUpdated(update) if update.current_turn_index == 1
    ));
    assert!(matches!(subscriber.recv().await.unwrap(), SessionEvent::TurnResolved(_)));
}

// S2: a delta kills another character; the log gains stat-change and death
// events and the pointer advance skips the corpse.
#[tokio::test]
async fn death_removes_a_player_from_rotation() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100, 100]).await;
    let victim = seeded.character(1).id;
    model.push_reply(canned_reply("A bolt lances out.", &[(victim, StatDelta::hp(-100))]));

    let response = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::B),
    )
    .await
    .unwrap();

    let payload = turn_payload(response.body);
    assert_eq!(payload.stat_updates.len(), 1);
    assert_eq!(payload.stat_updates[0].hp_before, 100);
    assert_eq!(payload.stat_updates[0].hp_after, 0);
    assert!(payload.stat_updates[0].died);
    assert_eq!(
        payload.next_active_player.as_ref().map(|p| p.user_id),
        Some(seeded.user(2))
    );

    let session = db.fetch_session(seeded.session.id).await.unwrap().unwrap();
    assert_eq!(session.current_turn_index, 2);
    assert_eq!(session.active_player(), Some(seeded.user(2)));

    let events = db.session_events(seeded.session.id).await.unwrap();
    let kinds: Vec<_> = events
        .iter()
        .map(|e| match &e.kind {
            GameEventKind::Action { .. } => "action",
            GameEventKind::Narrative { .. } => "narrative",
            GameEventKind::StatChange { .. } => "stat_change",
            GameEventKind::Death => "death",
            GameEventKind::LevelUp { .. } => "level_up",
        })
        .collect();
    assert_eq!(kinds, vec!["action", "narrative", "stat_change", "death"]);
    assert_eq!(events[3].character_id, Some(victim));

    let dead = db.fetch_character(seeded.session.id, victim).await.unwrap().unwrap();
    assert_eq!(dead.sheet.hp, 0);

    let snapshots = db.character_snapshots(seeded.session.id, victim).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].sheet.hp, 0);
}

// S3: only the active player may act; nothing is written for anyone else.
#[tokio::test]
async fn submitting_out_of_turn_changes_nothing() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("unreachable", &[]));

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(1), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::NotYourTurn));
    assert!(!error.retryable());
    assert!(db.fetch_turn(seeded.session.id, 0).await.unwrap().is_none());
    assert!(db.session_events(seeded.session.id).await.unwrap().is_empty());
}

// S4: a resolving row past the stuck threshold is reclaimed in place.
#[tokio::test]
async fn stuck_turn_is_reclaimed() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("You press on.", &[]));

    let stuck = TurnRecord {
        id: TurnId(Uuid::new_v4()),
        session_id: seeded.session.id,
        turn_index: 0,
        active_player: seeded.user(0),
        phase: TurnPhase::Resolving,
        started_at: Utc::now() - Duration::seconds(45),
        completed_at: None,
    };
    db.create_turn(&stuck).await.unwrap();

    let response = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap();

    let payload = turn_payload(response.body);
    assert_ne!(payload.turn_id, stuck.id);
    assert!(db.fetch_turn_by_id(stuck.id).await.unwrap().is_none());
    let replacement = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(replacement.id, payload.turn_id);
    assert_eq!(replacement.phase, TurnPhase::Completed);
}

// A fresh resolving row is someone else's in-flight turn; hands off.
#[tokio::test]
async fn young_resolving_turn_rejects_concurrent_submit() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("unreachable", &[]));

    let in_flight = TurnRecord {
        id: TurnId(Uuid::new_v4()),
        session_id: seeded.session.id,
        turn_index: 0,
        active_player: seeded.user(0),
        phase: TurnPhase::Resolving,
        started_at: Utc::now(),
        completed_at: None,
    };
    db.create_turn(&in_flight).await.unwrap();

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::TurnAlreadyProcessing));
    assert!(error.retryable());
    // The in-flight row is untouched.
    let row = db.fetch_turn_by_id(in_flight.id).await.unwrap().unwrap();
    assert_eq!(row.phase, TurnPhase::Resolving);
}

// A completed row at the current index means the pointer lagged; it is
// replaced and resolution proceeds.
#[tokio::test]
async fn completed_row_ahead_of_pointer_is_recovered() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("Onward.", &[]));

    let stale = TurnRecord {
        id: TurnId(Uuid::new_v4()),
        session_id: seeded.session.id,
        turn_index: 0,
        active_player: seeded.user(0),
        phase: TurnPhase::Completed,
        started_at: Utc::now() - Duration::seconds(5),
        completed_at: Some(Utc::now() - Duration::seconds(4)),
    };
    db.create_turn(&stale).await.unwrap();

    let response = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap();

    assert!(db.fetch_turn_by_id(stale.id).await.unwrap().is_none());
    let payload = turn_payload(response.body);
    let replacement = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(replacement.id, payload.turn_id);
}

// S5: the fourth submit inside the window is throttled before any turn row
// is created.
#[tokio::test]
async fn turn_rate_limit_denies_the_fourth_submit() {
    let db = SledDatabase::temporary().unwrap();
    let mut config = CoreConfig::default();
    config.rate.turn_processing_max = 3;
    let (services, model) = services_with(config);
    let seeded = seed_active_session(&db, &[100]).await;

    for _ in 0..3 {
        model.push_reply(canned_reply("Again.", &[]));
        turn_server::submit(
            &db,
            &services.bus,
            &services.dm,
            &services.limiter,
            &services.config,
            client(seeded.user(0), seeded.session.id),
            choose(seeded.session.id, ChoiceLabel::A),
        )
        .await
        .unwrap();
    }

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();

    let details = error.rate_limit_details().expect("rate limit details").clone();
    assert_eq!(details.remaining, 0);
    assert_eq!(details.limit, 3);
    assert!(details.reset_at > Utc::now());
    assert!(error.retryable());

    let session = db.fetch_session(seeded.session.id).await.unwrap().unwrap();
    assert_eq!(session.current_turn_index, 3);
    assert!(db.fetch_turn(seeded.session.id, 3).await.unwrap().is_none());
}

// S6: the last death ends the game; the session completes and the submit
// surfaces game over.
#[tokio::test]
async fn killing_the_last_survivor_completes_the_session() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 0]).await;
    let own = seeded.character(0).id;
    model.push_reply(canned_reply("The ground gives way.", &[(own, StatDelta::hp(-999))]));

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::C),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::GameOver));

    let session = db.fetch_session(seeded.session.id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.completed_at.is_some());

    let events = db.session_events(seeded.session.id).await.unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, GameEventKind::Death) && e.character_id == Some(own)));
    let turn = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(turn.phase, TurnPhase::Completed);

    // No further turns are accepted.
    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();
    assert!(matches!(error, GameError::GameOver));
}

// The dungeon master never sees dead characters; deltas it invents for
// them are dropped instead of reviving the corpse's stat stream.
#[tokio::test]
async fn updates_for_dead_characters_are_dropped() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 0, 100]).await;
    let corpse = seeded.character(1).id;
    let bystander = seeded.character(2).id;
    model.push_reply(canned_reply(
        "The fallen do not stir.",
        &[(corpse, StatDelta::hp(-10)), (bystander, StatDelta::hp(-10))],
    ));

    let response = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap();

    let payload = turn_payload(response.body);
    assert_eq!(payload.stat_updates.len(), 1);
    assert_eq!(payload.stat_updates[0].character_id, bystander);

    let events = db.session_events(seeded.session.id).await.unwrap();
    let touched: Vec<_> = events
        .iter()
        .filter(|e| matches!(e.kind, GameEventKind::StatChange { .. }))
        .filter_map(|e| e.character_id)
        .collect();
    assert_eq!(touched, vec![bystander]);

    let dead = db.fetch_character(seeded.session.id, corpse).await.unwrap().unwrap();
    assert_eq!(dead.sheet.hp, 0);
    assert!(db.character_snapshots(seeded.session.id, corpse).await.unwrap().is_empty());
}

#[tokio::test]
async fn dead_character_cannot_act() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[0, 100]).await;
    model.push_reply(canned_reply("unreachable", &[]));

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::CharacterDead));
    assert!(db.fetch_turn(seeded.session.id, 0).await.unwrap().is_none());
}

// Upstream failures complete the claimed turn and persist nothing else.
#[tokio::test]
async fn dm_failure_releases_the_turn_without_mutation() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_error(ModelError::Transport("connection reset".into()));

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::DmGenerationFailed(_)));
    assert!(error.retryable());
    let turn = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(turn.phase, TurnPhase::Completed);
    assert!(db.session_events(seeded.session.id).await.unwrap().is_empty());
    let session = db.fetch_session(seeded.session.id).await.unwrap().unwrap();
    assert_eq!(session.current_turn_index, 0);
}

#[tokio::test]
async fn dm_timeout_surfaces_as_retryable_failure() {
    let db = SledDatabase::temporary().unwrap();
    let mut config = CoreConfig::default();
    config.dm_timeout_ms = 20;
    let model = ScriptedModel::new().with_delay(std::time::Duration::from_millis(200));
    model.push_reply(canned_reply("too late", &[]));
    let services = services_from(config, model);
    let seeded = seed_active_session(&db, &[100, 100]).await;

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::DmGenerationFailed(_)));
    let turn = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(turn.phase, TurnPhase::Completed);
}

// Local pre-validation runs after the claim and rejects without a model
// call; the dungeon master's own rejection lands the same way.
#[tokio::test]
async fn invalid_custom_actions_complete_the_turn_and_reject() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("unreachable", &[]));

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        custom(seeded.session.id, "use Chrono Shift"),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, GameError::InvalidAction(_)));
    assert!(error.retryable());
    let turn = db.fetch_turn(seeded.session.id, 0).await.unwrap().unwrap();
    assert_eq!(turn.phase, TurnPhase::Completed);
    assert!(db.session_events(seeded.session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn dm_rejection_surfaces_the_refusal_message() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(rejection_reply("your character cannot fly"));

    let error = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        custom(seeded.session.id, "leap across the chasm"),
    )
    .await
    .unwrap_err();

    match error {
        GameError::InvalidAction(message) => {
            assert_eq!(message, "your character cannot fly")
        }
        other => panic!("expected an invalid action, got {other:?}"),
    }
}

// A custom action naming a known ability passes pre-validation and
// resolves normally.
#[tokio::test]
async fn custom_action_with_known_ability_resolves() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    model.push_reply(canned_reply("Flames roar.", &[]));

    let response = turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        custom(seeded.session.id, "use Fireball, aiming at the bridge"),
    )
    .await
    .unwrap();

    let payload = turn_payload(response.body);
    assert_eq!(payload.narrative, "Flames roar.");
    let events = db.session_events(seeded.session.id).await.unwrap();
    assert!(matches!(
        &events[0].kind,
        GameEventKind::Action { text, .. } if text == "use Fireball, aiming at the bridge"
    ));
}

// Broadcast order within one resolution: character updates, then stats,
// then the session, then the resolved turn.
#[tokio::test]
async fn broadcasts_follow_the_documented_order() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    let victim = seeded.character(1).id;
    model.push_reply(canned_reply("A blade flashes.", &[(victim, StatDelta::hp(-40))]));
    let mut subscriber = services.bus.subscribe(seeded.session.id);

    turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::D),
    )
    .await
    .unwrap();

    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::CharacterUpdated { character_id, .. } if character_id == victim
    ));
    match subscriber.recv().await.unwrap() {
        SessionEvent::StatsUpdated { character_id, sheet } => {
            assert_eq!(character_id, victim);
            assert_eq!(sheet.hp, 60);
        }
        other => panic!("expected stats, got {other:?}"),
    }
    assert!(matches!(subscriber.recv().await.unwrap(), SessionEvent::GameUpdated(_)));
    assert!(matches!(subscriber.recv().await.unwrap(), SessionEvent::TurnResolved(_)));
}

// Two resolutions in a row reach a subscriber in log order.
#[tokio::test]
async fn subscribers_observe_turns_in_log_order() {
    let db = SledDatabase::temporary().unwrap();
    let (services, model) = services_with(CoreConfig::default());
    let seeded = seed_active_session(&db, &[100, 100]).await;
    let mut subscriber = services.bus.subscribe(seeded.session.id);

    model.push_reply(canned_reply("First blood.", &[]));
    turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(0), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::A),
    )
    .await
    .unwrap();
    model.push_reply(canned_reply("Second wind.", &[]));
    turn_server::submit(
        &db,
        &services.bus,
        &services.dm,
        &services.limiter,
        &services.config,
        client(seeded.user(1), seeded.session.id),
        choose(seeded.session.id, ChoiceLabel::B),
    )
    .await
    .unwrap();

    let mut narratives = vec![];
    while let Ok(event) = subscriber.try_recv() {
        if let SessionEvent::TurnResolved(payload) = event {
            narratives.push(payload.narrative);
        }
    }
    assert_eq!(narratives, vec!["First blood.", "Second wind."]);

    let logged: Vec<_> = db
        .session_events(seeded.session.id)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|e| match e.kind {
            GameEventKind::Narrative { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(logged, narratives);
}
