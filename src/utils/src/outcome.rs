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

use crate::errors::GameError;

/// Possible reasons why turn resolution should halt
#[derive(Debug)]
#[must_use]
pub enum StopCondition {
    /// No participant's character is alive; the session is over.
    GameOver,
    /// A traditional error; resolution stops and the error is surfaced.
    Error(GameError),
}

/// Represents the result of some game mutation.
///
/// The "outcome" system is a wrapper around [Result] that adds an additional
/// case where the rules engine should halt, but which is not necessarily a
/// traditional error: the alive-set becoming empty during a pointer advance.
pub type Outcome = Result<(), StopCondition>;

/// Equivalent alias to [Outcome] which wraps a returned value
pub type Value<T> = Result<T, StopCondition>;

/// Mutation completed successfully, execution can continue
pub const OK: Outcome = Ok(());

/// Mutation found no alive participant, the session must complete.
pub const GAME_OVER: Outcome = Err(StopCondition::GameOver);

impl From<GameError> for StopCondition {
    fn from(value: GameError) -> Self {
        StopCondition::Error(value)
    }
}
