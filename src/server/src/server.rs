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

use std::time::Duration;

use data::actions::turn_action::TypingAction;
use data::actions::user_action::UserAction;
use data::core::config::CoreConfig;
use database::database::Database;
use dm::orchestrator::DmOrchestrator;
use dm::provider::NarrativeModel;
use tracing::info_span;
use utils::errors::GameError;

use crate::event_bus::EventBus;
use crate::rate_limit::RateLimiter;
use crate::requests;
use crate::server_data::{ClientData, GameResponse};
use crate::{session_server, turn_server};

/// The process-wide components every request handler shares.
pub struct CoreServices<M> {
    pub bus: EventBus,
    pub dm: DmOrchestrator<M>,
    pub limiter: RateLimiter,
    pub config: CoreConfig,
}

impl<M: NarrativeModel> CoreServices<M> {
    pub fn new(config: CoreConfig, model: M) -> Self {
        Self {
            bus: EventBus::new(config.subscriber_queue_max),
            dm: DmOrchestrator::new(model)
                .timeout(Duration::from_millis(config.dm_timeout_ms)),
            limiter: RateLimiter::new(config.rate.clone()),
            config,
        }
    }
}

/// Handles a [UserAction] from the client.
pub async fn handle_action<M: NarrativeModel>(
    database: &impl Database,
    services: &CoreServices<M>,
    data: ClientData,
    action: UserAction,
) -> Result<GameResponse, GameError> {
    let _span = info_span!("handle_action", ?data.user_id, ?data.session_id);
    match action {
        UserAction::SessionAction(action) => {
            session_server::handle(database, &services.bus, &services.limiter, data, action)
                .await
        }
        UserAction::SubmitTurn(action) => {
            turn_server::submit(
                database,
                &services.bus,
                &services.dm,
                &services.limiter,
                &services.config,
                data,
                action,
            )
            .await
        }
        UserAction::TypingStatus(action) => typing(database, services, data, action).await,
    }
}

/// Connects to the caller's current session, returning its status view.
///
/// It's expected that this will be invoked on application start and on
/// reconnect, before subscribing to the session's event stream.
pub async fn connect<M: NarrativeModel>(
    database: &impl Database,
    _services: &CoreServices<M>,
    data: ClientData,
) -> Result<GameResponse, GameError> {
    match data.session_id {
        Some(session_id) => session_server::status(database, data, session_id).await,
        None => Ok(GameResponse::ack(data)),
    }
}

async fn typing<M: NarrativeModel>(
    database: &impl Database,
    services: &CoreServices<M>,
    data: ClientData,
    action: TypingAction,
) -> Result<GameResponse, GameError> {
    let session = requests::fetch_session(database, action.session_id).await?;
    requests::membership(&session, data.user_id)?;
    if action.typing {
        services.bus.typing_started(session.id, data.user_id);
    } else {
        services.bus.typing_stopped(session.id, data.user_id);
    }
    Ok(GameResponse::ack(data))
}
