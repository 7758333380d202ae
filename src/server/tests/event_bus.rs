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

use chrono::Utc;
use data::core::primitives::{SessionId, UserId};
use data::events::session_event::{GameUpdate, SessionEvent};
use data::sessions::session_state::SessionStatus;
use server::event_bus::{EventBus, PresenceEntry};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

fn update(session_id: SessionId, current_turn_index: u64) -> SessionEvent {
    SessionEvent::GameUpdated(GameUpdate {
        session_id,
        status: SessionStatus::Active,
        current_turn_index,
        active_player: None,
        completed_at: None,
    })
}

fn index_of(event: SessionEvent) -> u64 {
    match event {
        SessionEvent::GameUpdated(update) => update.current_turn_index,
        other => panic!("expected a game update, got {other:?}"),
    }
}

#[tokio::test]
async fn delivery_is_fifo_per_publisher() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let mut subscriber = bus.subscribe(session_id);

    for index in 0..5 {
        bus.publish(session_id, update(session_id, index));
    }
    for expected in 0..5 {
        assert_eq!(index_of(subscriber.recv().await.unwrap()), expected);
    }
}

#[tokio::test]
async fn every_subscriber_sees_every_event() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let mut first = bus.subscribe(session_id);
    let mut second = bus.subscribe(session_id);

    bus.publish(session_id, update(session_id, 7));
    assert_eq!(index_of(first.recv().await.unwrap()), 7);
    assert_eq!(index_of(second.recv().await.unwrap()), 7);
}

#[tokio::test]
async fn sessions_do_not_leak_into_each_other() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let other_id = SessionId(Uuid::new_v4());
    let mut other = bus.subscribe(other_id);

    bus.publish(session_id, update(session_id, 1));
    assert!(timeout(Duration::from_millis(20), other.recv()).await.is_err());
}

#[tokio::test]
async fn slow_subscribers_lag_out_past_the_queue_bound() {
    let bus = EventBus::new(4);
    let session_id = SessionId(Uuid::new_v4());
    let mut subscriber = bus.subscribe(session_id);

    for index in 0..10 {
        bus.publish(session_id, update(session_id, index));
    }

    // The oldest events are gone; the receiver reports the lag once and
    // then resumes from what is still buffered.
    assert!(matches!(subscriber.recv().await, Err(RecvError::Lagged(_))));
    assert_eq!(index_of(subscriber.recv().await.unwrap()), 6);
}

#[tokio::test]
async fn presence_tracks_announce_and_retire() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let user_id = UserId(Uuid::new_v4());
    let mut subscriber = bus.subscribe(session_id);

    bus.announce(session_id, PresenceEntry {
        user_id,
        display_name: "watcher".into(),
        character_id: None,
        joined_at: Utc::now(),
    });
    assert_eq!(bus.presence(session_id).len(), 1);
    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::PlayerJoined { user_id: joined, .. } if joined == user_id
    ));

    bus.retire(session_id, user_id);
    assert!(bus.presence(session_id).is_empty());
    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::PlayerLeft { user_id: left } if left == user_id
    ));
}

#[tokio::test(start_paused = true)]
async fn typing_auto_stops_after_the_debounce_delay() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let user_id = UserId(Uuid::new_v4());
    let mut subscriber = bus.subscribe(session_id);

    bus.typing_started(session_id, user_id);
    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::TypingStatus { typing: true, .. }
    ));
    // Virtual time runs forward while we wait; the debounce timer fires.
    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::TypingStatus { typing: false, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_cancels_the_pending_auto_stop() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let user_id = UserId(Uuid::new_v4());
    let mut subscriber = bus.subscribe(session_id);

    bus.typing_started(session_id, user_id);
    bus.typing_stopped(session_id, user_id);

    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::TypingStatus { typing: true, .. }
    ));
    assert!(matches!(
        subscriber.recv().await.unwrap(),
        SessionEvent::TypingStatus { typing: false, .. }
    ));
    // Nothing further arrives once the timer is cancelled.
    assert!(timeout(Duration::from_secs(5), subscriber.recv()).await.is_err());
}

#[tokio::test]
async fn dropping_a_session_disconnects_its_subscribers() {
    let bus = EventBus::new(16);
    let session_id = SessionId(Uuid::new_v4());
    let mut subscriber = bus.subscribe(session_id);

    bus.drop_session(session_id);
    assert!(matches!(subscriber.recv().await, Err(RecvError::Closed)));
}
