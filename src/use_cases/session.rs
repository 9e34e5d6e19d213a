// Game action facade: typed entry points over the coordinator and sole owner of SessionState.

use crate::domain::account::{validate_bet_amount, validate_private_key};
use crate::domain::{
    CardsState, ChipsState, ConnectionStatus, EventSink, GameState, KeyValueStore, LogLevel,
    Network, SessionState,
};
use crate::use_cases::coordinator::{Coordinator, WorkerStatus};
use crate::use_cases::types::{
    ActionKind, ActionRequest, ActionResult, ClientError, CreatedGame, JoinedGame, PlacedBet,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

const CONTEXT: &str = "session";

/// Durable store key holding the account's private key.
pub const PRIVATE_KEY_STORAGE_KEY: &str = "poker_client.private_key";

pub struct GameSession {
    coordinator: Arc<Coordinator>,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn EventSink>,
    state_tx: watch::Sender<SessionState>,
    // Serializes network switches so the last call wins locally and in the worker.
    network_switch: tokio::sync::Mutex<()>,
    // Issue order of game-state producing calls; only the newest may replace lastGameState.
    next_query: AtomicU64,
    last_applied_query: AtomicU64,
    // Bumped by every network switch; results issued under an older value leave the state alone.
    network_epoch: AtomicU64,
}

impl GameSession {
    pub fn new(
        coordinator: Arc<Coordinator>,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let private_key = load_private_key(store.as_ref(), sink.as_ref());
        let (state_tx, _state_rx) =
            watch::channel(SessionState::new(private_key, coordinator.network()));

        Self {
            coordinator,
            store,
            sink,
            state_tx,
            network_switch: tokio::sync::Mutex::new(()),
            next_query: AtomicU64::new(0),
            last_applied_query: AtomicU64::new(0),
            network_epoch: AtomicU64::new(0),
        }
    }

    /// Resets the ephemeral state, reloads the stored key and starts the worker.
    pub async fn initialize(&self) -> Result<(), ClientError> {
        let private_key = load_private_key(self.store.as_ref(), self.sink.as_ref());
        let network = self.coordinator.network();
        self.state_tx
            .send_replace(SessionState::new(private_key, network));

        if let Err(err) = self.coordinator.start().await {
            let message = err.to_string();
            self.sink.log(
                LogLevel::Error,
                CONTEXT,
                "session failed to initialize",
                &[("error", message.clone())],
            );
            self.state_tx.send_modify(|state| state.error = Some(message));
            return Err(err);
        }
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn lifecycle(&self) -> watch::Receiver<WorkerStatus> {
        self.coordinator.status()
    }

    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }

    /// Asks the worker for a fresh key and persists it.
    pub async fn generate_account(&self) -> Result<String, ClientError> {
        let action = ActionKind::GetKey;
        self.begin_action();

        let key = match self.coordinator.send(ActionRequest::GetKey).await {
            Ok(ActionResult::Key(key)) => key,
            Ok(other) => return Err(self.fail(action, unexpected(action, &other))),
            Err(err) => return Err(self.fail(action, err)),
        };

        self.state_tx.send_modify(|state| {
            state.private_key = Some(key.clone());
        });

        // The key stays usable for this session even if it could not be persisted.
        if let Err(reason) = self.store.set(PRIVATE_KEY_STORAGE_KEY, &key) {
            return Err(self.fail(action, ClientError::Storage(reason)));
        }

        self.sink.log(LogLevel::Info, CONTEXT, "account generated", &[]);
        Ok(key)
    }

    pub async fn create_game(&self, game_id: u64) -> Result<CreatedGame, ClientError> {
        let action = ActionKind::CreateGame;
        self.begin_action();
        let private_key = self.require_key(action)?;
        let ticket = self.issue_query();
        let epoch = self.current_epoch();

        match self
            .coordinator
            .send(ActionRequest::CreateGame {
                game_id,
                private_key,
            })
            .await
        {
            Ok(ActionResult::GameCreated(created)) => {
                if let Some(state) = &created.state {
                    self.apply_game_state(ticket, epoch, state.clone());
                }
                Ok(created)
            }
            Ok(other) => Err(self.fail(action, unexpected(action, &other))),
            Err(err) => Err(self.fail(action, err)),
        }
    }

    pub async fn join_game(&self, game_id: u64) -> Result<JoinedGame, ClientError> {
        let action = ActionKind::JoinGame;
        self.begin_action();
        let private_key = self.require_key(action)?;
        let ticket = self.issue_query();
        let epoch = self.current_epoch();

        match self
            .coordinator
            .send(ActionRequest::JoinGame {
                game_id,
                private_key,
            })
            .await
        {
            Ok(ActionResult::GameJoined(joined)) => {
                if let Some(state) = &joined.state {
                    self.apply_game_state(ticket, epoch, state.clone());
                }
                Ok(joined)
            }
            Ok(other) => Err(self.fail(action, unexpected(action, &other))),
            Err(err) => Err(self.fail(action, err)),
        }
    }

    /// Key and amount are validated here; nothing is sent when either is rejected.
    pub async fn place_bet(&self, game_id: u64, amount: f64) -> Result<PlacedBet, ClientError> {
        let action = ActionKind::PlaceBet;
        self.begin_action();
        let private_key = self.require_key(action)?;
        if let Err(err) = validate_bet_amount(amount) {
            return Err(self.fail(action, err.into()));
        }
        let ticket = self.issue_query();
        let epoch = self.current_epoch();

        match self
            .coordinator
            .send(ActionRequest::PlaceBet {
                game_id,
                amount,
                private_key,
            })
            .await
        {
            Ok(ActionResult::BetPlaced(bet)) => {
                if let Some(state) = &bet.state {
                    self.apply_game_state(ticket, epoch, state.clone());
                }
                Ok(bet)
            }
            Ok(other) => Err(self.fail(action, unexpected(action, &other))),
            Err(err) => Err(self.fail(action, err)),
        }
    }

    pub async fn set_network(&self, next: Network) -> Result<(), ClientError> {
        let action = ActionKind::SetNetwork;
        let _switch = self.network_switch.lock().await;
        self.begin_action();

        let previous = self.state_tx.borrow().network;
        let mut epoch = 0;
        self.state_tx.send_modify(|state| {
            epoch = self.network_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            state.network = next;
            state.connection_status = ConnectionStatus::Connecting;
        });
        self.sink.log(
            LogLevel::Info,
            CONTEXT,
            "switching network",
            &[("from", previous.to_string()), ("to", next.to_string())],
        );

        match self
            .coordinator
            .send(ActionRequest::SetNetwork { network: next })
            .await
        {
            Ok(ActionResult::NetworkSet(_)) => Ok(()),
            Ok(other) => Err(self.fail(action, unexpected(action, &other))),
            Err(err) => Err(self.query_failed(action, epoch, err)),
        }
    }

    pub async fn fetch_game_state(&self, game_id: u64) -> Result<GameState, ClientError> {
        let action = ActionKind::GetGameState;
        self.begin_action();
        let ticket = self.issue_query();
        let epoch = self.current_epoch();

        match self
            .coordinator
            .send(ActionRequest::GetGameState { game_id })
            .await
        {
            Ok(ActionResult::GameState(state)) => {
                self.mark_connection(epoch, ConnectionStatus::Connected);
                self.apply_game_state(ticket, epoch, state.clone());
                Ok(state)
            }
            Ok(other) => Err(self.query_failed(action, epoch, unexpected(action, &other))),
            Err(err) => Err(self.query_failed(action, epoch, err)),
        }
    }

    pub async fn fetch_chips_state(&self, game_id: u64) -> Result<ChipsState, ClientError> {
        let action = ActionKind::GetChipsState;
        self.begin_action();
        let epoch = self.current_epoch();

        match self
            .coordinator
            .send(ActionRequest::GetChipsState { game_id })
            .await
        {
            Ok(ActionResult::ChipsState(chips)) => {
                self.mark_connection(epoch, ConnectionStatus::Connected);
                Ok(chips)
            }
            Ok(other) => Err(self.query_failed(action, epoch, unexpected(action, &other))),
            Err(err) => Err(self.query_failed(action, epoch, err)),
        }
    }

    pub async fn fetch_cards_state(&self, game_id: u64) -> Result<CardsState, ClientError> {
        let action = ActionKind::GetCardsState;
        self.begin_action();
        let private_key = self.require_key(action)?;
        let epoch = self.current_epoch();

        match self
            .coordinator
            .send(ActionRequest::GetCardsState {
                game_id,
                private_key,
            })
            .await
        {
            Ok(ActionResult::CardsState(cards)) => {
                self.mark_connection(epoch, ConnectionStatus::Connected);
                Ok(cards)
            }
            Ok(other) => Err(self.query_failed(action, epoch, unexpected(action, &other))),
            Err(err) => Err(self.query_failed(action, epoch, err)),
        }
    }

    fn begin_action(&self) {
        self.state_tx.send_if_modified(|state| state.error.take().is_some());
    }

    fn fail(&self, action: ActionKind, err: ClientError) -> ClientError {
        let message = err.to_string();
        self.sink.log(
            LogLevel::Warn,
            CONTEXT,
            "action failed",
            &[("action", action.to_string()), ("error", message.clone())],
        );
        self.state_tx.send_modify(|state| state.error = Some(message));
        err
    }

    fn query_failed(&self, action: ActionKind, epoch: u64, err: ClientError) -> ClientError {
        self.mark_connection(epoch, ConnectionStatus::Error);
        self.fail(action, err)
    }

    fn current_epoch(&self) -> u64 {
        self.network_epoch.load(Ordering::SeqCst)
    }

    // Checked inside the watch closure, which set_network also bumps the epoch from.
    fn mark_connection(&self, epoch: u64, status: ConnectionStatus) {
        let mut superseded = false;
        self.state_tx.send_if_modified(|state| {
            if self.current_epoch() != epoch {
                superseded = true;
                return false;
            }
            let changed = state.connection_status != status;
            state.connection_status = status;
            changed
        });
        if superseded {
            self.log_superseded("connection status", epoch);
        }
    }

    fn log_superseded(&self, what: &str, epoch: u64) {
        self.sink.log(
            LogLevel::Debug,
            CONTEXT,
            "ignoring result from a previous network",
            &[("reason", what.to_string()), ("epoch", epoch.to_string())],
        );
    }

    fn require_key(&self, action: ActionKind) -> Result<String, ClientError> {
        let private_key = self.state_tx.borrow().private_key.clone().unwrap_or_default();
        match validate_private_key(&private_key) {
            Ok(()) => Ok(private_key),
            Err(err) => Err(self.fail(action, err.into())),
        }
    }

    fn issue_query(&self) -> u64 {
        self.next_query.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Replaces lastGameState unless a later-issued call already did or the network changed.
    fn apply_game_state(&self, ticket: u64, epoch: u64, game: GameState) -> bool {
        let mut superseded = false;
        let applied = self.state_tx.send_if_modified(|state| {
            if self.current_epoch() != epoch {
                superseded = true;
                return false;
            }
            let newest = self.last_applied_query.fetch_max(ticket, Ordering::SeqCst) < ticket;
            if newest {
                state.last_game_state = Some(game);
            }
            newest
        });
        if superseded {
            self.log_superseded("game state", epoch);
        } else if !applied {
            self.sink.log(
                LogLevel::Debug,
                CONTEXT,
                "discarding stale game state",
                &[("ticket", ticket.to_string())],
            );
        }
        applied
    }
}

fn unexpected(action: ActionKind, result: &ActionResult) -> ClientError {
    ClientError::Protocol(format!("{action} resolved with a {} result", result.kind()))
}

fn load_private_key(store: &dyn KeyValueStore, sink: &dyn EventSink) -> Option<String> {
    match store.get(PRIVATE_KEY_STORAGE_KEY) {
        Ok(Some(key)) if validate_private_key(&key).is_ok() => Some(key),
        Ok(Some(_)) => {
            sink.log(LogLevel::Warn, CONTEXT, "ignoring malformed stored key", &[]);
            None
        }
        Ok(None) => None,
        Err(reason) => {
            sink.log(
                LogLevel::Warn,
                CONTEXT,
                "failed to read stored key",
                &[("error", reason)],
            );
            None
        }
    }
}
