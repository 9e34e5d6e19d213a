// Use-case level inputs/outputs exchanged with the worker.

use crate::domain::{AccountError, BetError, CardsState, ChipsState, GameState, Network};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    GetKey,
    CreateGame,
    JoinGame,
    PlaceBet,
    SetNetwork,
    GetGameState,
    GetChipsState,
    GetCardsState,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::GetKey => "get_key",
            ActionKind::CreateGame => "create_game",
            ActionKind::JoinGame => "join_game",
            ActionKind::PlaceBet => "place_bet",
            ActionKind::SetNetwork => "set_network",
            ActionKind::GetGameState => "get_game_state",
            ActionKind::GetChipsState => "get_chips_state",
            ActionKind::GetCardsState => "get_cards_state",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed request, one variant per action kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    GetKey,
    CreateGame { game_id: u64, private_key: String },
    JoinGame { game_id: u64, private_key: String },
    PlaceBet { game_id: u64, amount: f64, private_key: String },
    SetNetwork { network: Network },
    GetGameState { game_id: u64 },
    GetChipsState { game_id: u64 },
    GetCardsState { game_id: u64, private_key: String },
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::GetKey => ActionKind::GetKey,
            ActionRequest::CreateGame { .. } => ActionKind::CreateGame,
            ActionRequest::JoinGame { .. } => ActionKind::JoinGame,
            ActionRequest::PlaceBet { .. } => ActionKind::PlaceBet,
            ActionRequest::SetNetwork { .. } => ActionKind::SetNetwork,
            ActionRequest::GetGameState { .. } => ActionKind::GetGameState,
            ActionRequest::GetChipsState { .. } => ActionKind::GetChipsState,
            ActionRequest::GetCardsState { .. } => ActionKind::GetCardsState,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedGame {
    pub game_id: u64,
    pub creator: String,
    pub state: Option<GameState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedGame {
    pub game_id: u64,
    pub player: String,
    pub state: Option<GameState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBet {
    pub game_id: u64,
    pub amount: u64,
    pub player: String,
    pub state: Option<GameState>,
}

/// Typed result, one variant per action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Key(String),
    GameCreated(CreatedGame),
    GameJoined(JoinedGame),
    BetPlaced(PlacedBet),
    NetworkSet(Network),
    GameState(GameState),
    ChipsState(ChipsState),
    CardsState(CardsState),
}

impl ActionResult {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionResult::Key(_) => ActionKind::GetKey,
            ActionResult::GameCreated(_) => ActionKind::CreateGame,
            ActionResult::GameJoined(_) => ActionKind::JoinGame,
            ActionResult::BetPlaced(_) => ActionKind::PlaceBet,
            ActionResult::NetworkSet(_) => ActionKind::SetNetwork,
            ActionResult::GameState(_) => ActionKind::GetGameState,
            ActionResult::ChipsState(_) => ActionKind::GetChipsState,
            ActionResult::CardsState(_) => ActionKind::GetCardsState,
        }
    }
}

/// Errors surfaced by the coordinator and the session facade.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Rejected locally before any worker round-trip.
    Validation(String),
    /// The worker reported a failure for this action.
    Action { action: ActionKind, reason: String },
    /// No response arrived within the request timeout.
    Timeout { action: ActionKind },
    /// The response could not be decoded or did not match the request.
    Protocol(String),
    /// The worker never acknowledged `init`.
    Initialization(String),
    /// The worker went away while the call was pending.
    WorkerExited,
    /// The coordinator was shut down.
    Cancelled,
    /// The durable store rejected a write.
    Storage(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Validation(reason) => write!(f, "invalid request: {reason}"),
            ClientError::Action { action, reason } => write!(f, "{action} failed: {reason}"),
            ClientError::Timeout { action } => write!(f, "{action} timed out"),
            ClientError::Protocol(reason) => write!(f, "protocol error: {reason}"),
            ClientError::Initialization(reason) => {
                write!(f, "worker failed to initialize: {reason}")
            }
            ClientError::WorkerExited => f.write_str("worker exited before responding"),
            ClientError::Cancelled => f.write_str("request cancelled"),
            ClientError::Storage(reason) => write!(f, "storage error: {reason}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<AccountError> for ClientError {
    fn from(err: AccountError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

impl From<BetError> for ClientError {
    fn from(err: BetError) -> Self {
        ClientError::Validation(err.to_string())
    }
}
