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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data::characters::character_state::Character;
use data::core::numerics::TurnIndex;
use data::core::primitives::{CharacterId, SessionId, TurnId};
use data::events::game_event::GameEvent;
use data::sessions::session_state::GameSession;
use data::snapshots::stats_snapshot::StatsSnapshot;
use data::turns::turn_state::{TurnPhase, TurnRecord};
use serde_json::{de, ser};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};
use sled::{Batch, Db, IVec, Tree};

use crate::database::{Database, StoreError, StoreResult, TurnResolution};

/// Sled-backed [Database].
///
/// One tree per record family. Keys are big-endian composites so that
/// prefix scans come back in `(turn_index, seq)` order. The turn-claim
/// uniqueness invariant is enforced inside a serializable transaction that
/// writes the `(session, index)` row and its id-index entry together; the
/// same mechanism commits a whole turn resolution across trees, so a
/// partial resolution can never become durable.
pub struct SledDatabase {
    db: Db,
}

impl SledDatabase {
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        Ok(Self { db: sled::open(path.into())? })
    }

    /// An in-memory database that is discarded on drop. Test use only.
    pub fn temporary() -> StoreResult<Self> {
        Ok(Self { db: sled::Config::new().temporary(true).open()? })
    }

    fn sessions(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree("sessions")?)
    }

    fn characters(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree("characters")?)
    }

    fn turns(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree("turns")?)
    }

    /// Secondary index: turn id to composite `(session, index)` key.
    fn turn_ids(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree("turn_ids")?)
    }

    fn events(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree("events")?)
    }

    fn snapshots(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree("snapshots")?)
    }

    fn turn_record_by_id(&self, id: TurnId) -> StoreResult<Option<(Vec<u8>, TurnRecord)>> {
        let Some(key) = self.turn_ids()?.get(turn_id_key(id))? else {
            return Ok(None);
        };
        let Some(slice) = self.turns()?.get(&key)? else {
            return Ok(None);
        };
        Ok(Some((key.to_vec(), de::from_slice(&slice)?)))
    }

    fn remove_prefix(&self, tree: &Tree, prefix: &[u8]) -> StoreResult<()> {
        for entry in tree.scan_prefix(prefix) {
            let (key, _) = entry?;
            tree.remove(key)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Database for SledDatabase {
    async fn fetch_session(&self, id: SessionId) -> StoreResult<Option<GameSession>> {
        self.sessions()?
            .get(session_key(id))?
            .map(|slice| Ok(de::from_slice(&slice)?))
            .transpose()
    }

    async fn write_session(&self, session: &GameSession) -> StoreResult<()> {
        self.sessions()?.insert(session_key(session.id), ser::to_vec(session)?)?;
        self.db.flush()?;
        Ok(())
    }

    async fn delete_session(&self, id: SessionId) -> StoreResult<()> {
        let prefix = session_key(id);
        self.sessions()?.remove(prefix)?;
        self.remove_prefix(&self.characters()?, &prefix)?;
        let turns = self.turns()?;
        let turn_ids = self.turn_ids()?;
        for entry in turns.scan_prefix(prefix) {
            let (key, slice) = entry?;
            let turn: TurnRecord = de::from_slice(&slice)?;
            turn_ids.remove(turn_id_key(turn.id))?;
            turns.remove(key)?;
        }
        self.remove_prefix(&self.events()?, &prefix)?;
        self.remove_prefix(&self.snapshots()?, &prefix)?;
        self.db.flush()?;
        Ok(())
    }

    async fn fetch_character(
        &self,
        session_id: SessionId,
        id: CharacterId,
    ) -> StoreResult<Option<Character>> {
        self.characters()?
            .get(character_key(session_id, id))?
            .map(|slice| Ok(de::from_slice(&slice)?))
            .transpose()
    }

    async fn write_character(&self, character: &Character) -> StoreResult<()> {
        self.characters()?.insert(
            character_key(character.session_id, character.id),
            ser::to_vec(character)?,
        )?;
        self.db.flush()?;
        Ok(())
    }

    async fn delete_character(&self, session_id: SessionId, id: CharacterId) -> StoreResult<()> {
        self.characters()?.remove(character_key(session_id, id))?;
        self.db.flush()?;
        Ok(())
    }

    async fn session_characters(&self, session_id: SessionId) -> StoreResult<Vec<Character>> {
        self.characters()?
            .scan_prefix(session_key(session_id))
            .map(|entry| {
                let (_, slice) = entry?;
                Ok(de::from_slice(&slice)?)
            })
            .collect()
    }

    async fn create_turn(&self, turn: &TurnRecord) -> StoreResult<()> {
        let key = turn_key(turn.session_id, turn.turn_index);
        let id_key = turn_id_key(turn.id);
        let encoded = IVec::from(ser::to_vec(turn)?);
        let turns_tree = self.turns()?;
        let turn_ids_tree = self.turn_ids()?;

        // The row and its id-index entry land together or not at all; a
        // claim of an occupied slot returns the occupant.
        let claim = (&turns_tree, &turn_ids_tree).transaction(
            |(turns, turn_ids)| -> ConflictableTransactionResult<Option<TurnRecord>, StoreError> {
                if let Some(current) = turns.get(&key)? {
                    let existing = de::from_slice(&current)
                        .map_err(|e| ConflictableTransactionError::Abort(StoreError::Codec(e)))?;
                    return Ok(Some(existing));
                }
                turns.insert(&key[..], encoded.clone())?;
                turn_ids.insert(&id_key[..], key.to_vec())?;
                Ok(None)
            },
        );
        match claim {
            Ok(None) => {
                self.db.flush()?;
                Ok(())
            }
            Ok(Some(existing)) => Err(StoreError::Conflict {
                session_id: turn.session_id,
                turn_index: turn.turn_index,
                existing: Box::new(existing),
            }),
            Err(error) => Err(commit_error(error)),
        }
    }

    async fn fetch_turn(
        &self,
        session_id: SessionId,
        turn_index: TurnIndex,
    ) -> StoreResult<Option<TurnRecord>> {
        self.turns()?
            .get(turn_key(session_id, turn_index))?
            .map(|slice| Ok(de::from_slice(&slice)?))
            .transpose()
    }

    async fn fetch_turn_by_id(&self, id: TurnId) -> StoreResult<Option<TurnRecord>> {
        Ok(self.turn_record_by_id(id)?.map(|(_, turn)| turn))
    }

    async fn complete_turn(&self, id: TurnId, at: DateTime<Utc>) -> StoreResult<()> {
        let (key, mut turn) =
            self.turn_record_by_id(id)?.ok_or(StoreError::NotFound("turn"))?;
        turn.phase = TurnPhase::Completed;
        turn.completed_at = Some(at);
        self.turns()?.insert(key, ser::to_vec(&turn)?)?;
        self.db.flush()?;
        Ok(())
    }

    async fn delete_turn(&self, id: TurnId) -> StoreResult<()> {
        let Some((key, _)) = self.turn_record_by_id(id)? else {
            return Ok(());
        };
        self.turns()?.remove(key)?;
        self.turn_ids()?.remove(turn_id_key(id))?;
        self.db.flush()?;
        Ok(())
    }

    async fn recent_turns(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> StoreResult<Vec<TurnRecord>> {
        self.turns()?
            .scan_prefix(session_key(session_id))
            .rev()
            .take(limit)
            .map(|entry| {
                let (_, slice) = entry?;
                Ok(de::from_slice(&slice)?)
            })
            .collect()
    }

    async fn append_events(&self, events: &[GameEvent]) -> StoreResult<()> {
        let tree = self.events()?;
        let mut batch = Batch::default();
        for event in events {
            batch.insert(
                IVec::from(&event_key(event.session_id, event.turn_index, event.seq)[..]),
                ser::to_vec(event)?,
            );
        }
        tree.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }

    async fn session_events(&self, session_id: SessionId) -> StoreResult<Vec<GameEvent>> {
        self.events()?
            .scan_prefix(session_key(session_id))
            .map(|entry| {
                let (_, slice) = entry?;
                Ok(de::from_slice(&slice)?)
            })
            .collect()
    }

    async fn recent_events(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> StoreResult<Vec<GameEvent>> {
        let mut events: Vec<GameEvent> = self
            .events()?
            .scan_prefix(session_key(session_id))
            .rev()
            .take(limit)
            .map(|entry| {
                let (_, slice) = entry?;
                Ok::<GameEvent, StoreError>(de::from_slice(&slice)?)
            })
            .collect::<StoreResult<_>>()?;
        events.reverse();
        Ok(events)
    }

    async fn write_snapshot(&self, snapshot: &StatsSnapshot) -> StoreResult<()> {
        self.snapshots()?.insert(
            snapshot_key(snapshot.session_id, snapshot.character_id, snapshot.turn_index),
            ser::to_vec(snapshot)?,
        )?;
        self.db.flush()?;
        Ok(())
    }

    async fn character_snapshots(
        &self,
        session_id: SessionId,
        character_id: CharacterId,
    ) -> StoreResult<Vec<StatsSnapshot>> {
        let mut prefix = session_key(session_id).to_vec();
        prefix.extend_from_slice(&character_id.0.as_u128().to_be_bytes());
        self.snapshots()?
            .scan_prefix(prefix)
            .map(|entry| {
                let (_, slice) = entry?;
                Ok(de::from_slice(&slice)?)
            })
            .collect()
    }

    async fn commit_turn_resolution(&self, resolution: &TurnResolution) -> StoreResult<()> {
        let mut event_rows = vec![];
        for event in &resolution.events {
            event_rows.push((
                IVec::from(&event_key(event.session_id, event.turn_index, event.seq)[..]),
                IVec::from(ser::to_vec(event)?),
            ));
        }
        let mut character_rows = vec![];
        for character in &resolution.characters {
            character_rows.push((
                IVec::from(&character_key(character.session_id, character.id)[..]),
                IVec::from(ser::to_vec(character)?),
            ));
        }
        let mut snapshot_rows = vec![];
        for snapshot in &resolution.snapshots {
            snapshot_rows.push((
                IVec::from(
                    &snapshot_key(
                        snapshot.session_id,
                        snapshot.character_id,
                        snapshot.turn_index,
                    )[..],
                ),
                IVec::from(ser::to_vec(snapshot)?),
            ));
        }
        let session_row = (
            IVec::from(&session_key(resolution.session.id)[..]),
            IVec::from(ser::to_vec(&resolution.session)?),
        );
        let (key, mut turn) = self
            .turn_record_by_id(resolution.turn_id)?
            .ok_or(StoreError::NotFound("turn"))?;
        turn.phase = TurnPhase::Completed;
        turn.completed_at = Some(resolution.completed_at);
        let turn_row = (IVec::from(key), IVec::from(ser::to_vec(&turn)?));

        let events_tree = self.events()?;
        let characters_tree = self.characters()?;
        let snapshots_tree = self.snapshots()?;
        let sessions_tree = self.sessions()?;
        let turns_tree = self.turns()?;

        // One serializable commit across all five trees; a failure partway
        // leaves nothing of the resolution behind.
        (&events_tree, &characters_tree, &snapshots_tree, &sessions_tree, &turns_tree)
            .transaction(
                |(events, characters, snapshots, sessions, turns)| -> ConflictableTransactionResult<(), StoreError> {
                    for (key, value) in &event_rows {
                        events.insert(key.clone(), value.clone())?;
                    }
                    for (key, value) in &character_rows {
                        characters.insert(key.clone(), value.clone())?;
                    }
                    for (key, value) in &snapshot_rows {
                        snapshots.insert(key.clone(), value.clone())?;
                    }
                    sessions.insert(session_row.0.clone(), session_row.1.clone())?;
                    turns.insert(turn_row.0.clone(), turn_row.1.clone())?;
                    Ok(())
                },
            )
            .map_err(commit_error)?;
        self.db.flush()?;
        Ok(())
    }
}

fn commit_error(error: TransactionError<StoreError>) -> StoreError {
    match error {
        TransactionError::Abort(error) => error,
        TransactionError::Storage(error) => StoreError::Storage(error),
    }
}

fn session_key(id: SessionId) -> [u8; 16] {
    id.0.as_u128().to_be_bytes()
}

fn turn_id_key(id: TurnId) -> [u8; 16] {
    id.0.as_u128().to_be_bytes()
}

fn character_key(session_id: SessionId, id: CharacterId) -> [u8; 32] {
    let mut key = [0; 32];
    key[..16].copy_from_slice(&session_id.0.as_u128().to_be_bytes());
    key[16..].copy_from_slice(&id.0.as_u128().to_be_bytes());
    key
}

fn turn_key(session_id: SessionId, turn_index: TurnIndex) -> [u8; 24] {
    let mut key = [0; 24];
    key[..16].copy_from_slice(&session_id.0.as_u128().to_be_bytes());
    key[16..].copy_from_slice(&turn_index.to_be_bytes());
    key
}

fn event_key(session_id: SessionId, turn_index: TurnIndex, seq: u32) -> [u8; 28] {
    let mut key = [0; 28];
    key[..16].copy_from_slice(&session_id.0.as_u128().to_be_bytes());
    key[16..24].copy_from_slice(&turn_index.to_be_bytes());
    key[24..].copy_from_slice(&seq.to_be_bytes());
    key
}

fn snapshot_key(
    session_id: SessionId,
    character_id: CharacterId,
    turn_index: TurnIndex,
) -> [u8; 40] {
    let mut key = [0; 40];
    key[..16].copy_from_slice(&session_id.0.as_u128().to_be_bytes());
    key[16..32].copy_from_slice(&character_id.0.as_u128().to_be_bytes());
    key[32..].copy_from_slice(&turn_index.to_be_bytes());
    key
}
