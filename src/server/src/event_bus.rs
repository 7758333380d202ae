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

//! Session-scoped event fan-out.
//!
//! Each session has one bounded tokio broadcast channel. Publishing never
//! blocks the caller; a subscriber that falls further behind than the queue
//! bound observes a lag error on its receiver and must resubscribe. Nothing
//! is persisted for absent or dropped subscribers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use data::core::primitives::{CharacterId, SessionId, UserId};
use data::events::session_event::SessionEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::trace;

/// How long after the last typing start an automatic stop is emitted.
pub const TYPING_STOP_DELAY: Duration = Duration::from_secs(2);

/// A subscriber's announced identity, shared with peers on join and leave.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub character_id: Option<CharacterId>,
    pub joined_at: DateTime<Utc>,
}

/// Ordered best-effort broadcast of [SessionEvent]s per session.
pub struct EventBus {
    channels: DashMap<SessionId, broadcast::Sender<SessionEvent>>,
    presence: DashMap<SessionId, Vec<PresenceEntry>>,
    typing: DashMap<(SessionId, UserId), JoinHandle<()>>,
    queue_max: usize,
}

impl EventBus {
    pub fn new(queue_max: usize) -> Self {
        Self {
            channels: DashMap::new(),
            presence: DashMap::new(),
            typing: DashMap::new(),
            queue_max,
        }
    }

    /// Opens a stream of this session's events from now on.
    pub fn subscribe(&self, session_id: SessionId) -> broadcast::Receiver<SessionEvent> {
        self.sender(session_id).subscribe()
    }

    /// Delivers `event` to all current subscribers in publish order.
    pub fn publish(&self, session_id: SessionId, event: SessionEvent) {
        if let Some(sender) = self.channels.get(&session_id) {
            if sender.send(event).is_err() {
                trace!(?session_id, "Published with no live subscribers");
            }
        }
    }

    /// Records presence and tells peers a player joined.
    pub fn announce(&self, session_id: SessionId, entry: PresenceEntry) {
        let event = SessionEvent::PlayerJoined {
            user_id: entry.user_id,
            display_name: entry.display_name.clone(),
            character_id: entry.character_id,
        };
        let mut present = self.presence.entry(session_id).or_default();
        present.retain(|p| p.user_id != entry.user_id);
        present.push(entry);
        drop(present);
        self.publish(session_id, event);
    }

    /// Retires presence and tells peers a player left.
    pub fn retire(&self, session_id: SessionId, user_id: UserId) {
        if let Some(mut present) = self.presence.get_mut(&session_id) {
            present.retain(|p| p.user_id != user_id);
        }
        self.publish(session_id, SessionEvent::PlayerLeft { user_id });
    }

    /// Current announced subscribers of a session.
    pub fn presence(&self, session_id: SessionId) -> Vec<PresenceEntry> {
        self.presence.get(&session_id).map(|p| p.value().clone()).unwrap_or_default()
    }

    /// Publishes a typing start and schedules an automatic stop unless the
    /// start is renewed within [TYPING_STOP_DELAY].
    pub fn typing_started(&self, session_id: SessionId, user_id: UserId) {
        self.publish(session_id, SessionEvent::TypingStatus { user_id, typing: true });
        let sender = self.sender(session_id);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(TYPING_STOP_DELAY).await;
            let _ = sender.send(SessionEvent::TypingStatus { user_id, typing: false });
        });
        if let Some(previous) = self.typing.insert((session_id, user_id), handle) {
            previous.abort();
        }
    }

    /// Publishes an explicit typing stop and cancels any pending auto-stop.
    pub fn typing_stopped(&self, session_id: SessionId, user_id: UserId) {
        if let Some((_, pending)) = self.typing.remove(&(session_id, user_id)) {
            pending.abort();
        }
        self.publish(session_id, SessionEvent::TypingStatus { user_id, typing: false });
    }

    /// Forgets a session entirely: channel, presence and typing timers.
    pub fn drop_session(&self, session_id: SessionId) {
        self.channels.remove(&session_id);
        self.presence.remove(&session_id);
        self.typing.retain(|(session, _), handle| {
            if *session == session_id {
                handle.abort();
                false
            } else {
                true
            }
        });
    }

    fn sender(&self, session_id: SessionId) -> broadcast::Sender<SessionEvent> {
        self.channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(self.queue_max).0)
            .clone()
    }
}
