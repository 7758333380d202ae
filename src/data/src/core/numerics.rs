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

/// Hit points. Always within `0..=max_hp` on a stored sheet; deltas are
/// signed and unbounded.
pub type Health = i64;

/// Character level, 1 or greater.
pub type Level = u32;

/// Value of one named attribute on a power sheet.
pub type AttributeValue = i64;

/// Monotonic 0-based turn counter for a session. Only its value modulo the
/// turn-order length selects the active player.
pub type TurnIndex = u64;

/// Creation order of an event within its turn.
pub type EventSeq = u32;
