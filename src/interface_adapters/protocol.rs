// Wire envelopes exchanged across the worker boundary as JSON text frames.
// The typed request/result model lives in use_cases::types; conversions happen here.

use crate::domain::{CardsState, ChipsState, GameState, Network};
use crate::use_cases::{
    ActionKind, ActionRequest, ActionResult, ClientError, CreatedGame, JoinedGame, PlacedBet,
};
use serde::{Deserialize, Serialize};

/// Coordinator -> worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub action: ActionKind,
    pub request_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RequestData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
}

impl RequestEnvelope {
    pub fn new(request_id: u64, request: &ActionRequest) -> Self {
        let data = match request {
            ActionRequest::GetKey => None,
            ActionRequest::CreateGame {
                game_id,
                private_key,
            }
            | ActionRequest::JoinGame {
                game_id,
                private_key,
            }
            | ActionRequest::GetCardsState {
                game_id,
                private_key,
            } => Some(RequestData {
                game_id: Some(*game_id),
                private_key: Some(private_key.clone()),
                ..Default::default()
            }),
            ActionRequest::PlaceBet {
                game_id,
                amount,
                private_key,
            } => Some(RequestData {
                game_id: Some(*game_id),
                private_key: Some(private_key.clone()),
                amount: Some(*amount),
                ..Default::default()
            }),
            ActionRequest::SetNetwork { network } => Some(RequestData {
                network: Some(*network),
                ..Default::default()
            }),
            ActionRequest::GetGameState { game_id } | ActionRequest::GetChipsState { game_id } => {
                Some(RequestData {
                    game_id: Some(*game_id),
                    ..Default::default()
                })
            }
        };

        Self {
            action: request.kind(),
            request_id,
            data,
        }
    }

    /// Checks that the payload carries every field the action needs.
    pub fn into_request(self) -> Result<ActionRequest, String> {
        let action = self.action;
        let data = self.data.unwrap_or_default();
        let missing = |field: &str| format!("{action} requires `{field}`");

        let request = match action {
            ActionKind::GetKey => ActionRequest::GetKey,
            ActionKind::CreateGame => ActionRequest::CreateGame {
                game_id: data.game_id.ok_or_else(|| missing("gameId"))?,
                private_key: data.private_key.ok_or_else(|| missing("privateKey"))?,
            },
            ActionKind::JoinGame => ActionRequest::JoinGame {
                game_id: data.game_id.ok_or_else(|| missing("gameId"))?,
                private_key: data.private_key.ok_or_else(|| missing("privateKey"))?,
            },
            ActionKind::PlaceBet => ActionRequest::PlaceBet {
                game_id: data.game_id.ok_or_else(|| missing("gameId"))?,
                amount: data.amount.ok_or_else(|| missing("amount"))?,
                private_key: data.private_key.ok_or_else(|| missing("privateKey"))?,
            },
            ActionKind::SetNetwork => ActionRequest::SetNetwork {
                network: data.network.ok_or_else(|| missing("network"))?,
            },
            ActionKind::GetGameState => ActionRequest::GetGameState {
                game_id: data.game_id.ok_or_else(|| missing("gameId"))?,
            },
            ActionKind::GetChipsState => ActionRequest::GetChipsState {
                game_id: data.game_id.ok_or_else(|| missing("gameId"))?,
            },
            ActionKind::GetCardsState => ActionRequest::GetCardsState {
                game_id: data.game_id.ok_or_else(|| missing("gameId"))?,
                private_key: data.private_key.ok_or_else(|| missing("privateKey"))?,
            },
        };

        Ok(request)
    }
}

/// Best-effort lookup of `requestId` in a frame that failed to decode.
pub fn recover_request_id(frame: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(frame)
        .ok()?
        .get("requestId")?
        .as_u64()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Init,
    Key,
    CreateGame,
    JoinGame,
    PlaceBet,
    Error,
    Network,
    GameState,
    ChipsState,
    CardsState,
}

impl ResponseKind {
    pub fn for_action(action: ActionKind) -> Self {
        match action {
            ActionKind::GetKey => ResponseKind::Key,
            ActionKind::CreateGame => ResponseKind::CreateGame,
            ActionKind::JoinGame => ResponseKind::JoinGame,
            ActionKind::PlaceBet => ResponseKind::PlaceBet,
            ActionKind::SetNetwork => ResponseKind::Network,
            ActionKind::GetGameState => ResponseKind::GameState,
            ActionKind::GetChipsState => ResponseKind::ChipsState,
            ActionKind::GetCardsState => ResponseKind::CardsState,
        }
    }
}

/// Worker -> coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseResult {
    Text(String),
    Data(Box<ResultData>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<GameState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chips: Option<ChipsState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<CardsState>,
}

impl ResponseEnvelope {
    pub fn init() -> Self {
        Self {
            kind: ResponseKind::Init,
            request_id: None,
            result: ResponseResult::Text("ready".to_string()),
        }
    }

    pub fn error(request_id: Option<u64>, reason: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Error,
            request_id,
            result: ResponseResult::Text(reason.into()),
        }
    }

    pub fn success(request_id: Option<u64>, result: &ActionResult) -> Self {
        let kind = ResponseKind::for_action(result.kind());
        let result = match result {
            ActionResult::Key(key) => ResponseResult::Text(key.clone()),
            ActionResult::NetworkSet(network) => ResponseResult::Text(network.to_string()),
            ActionResult::GameCreated(created) => data(ResultData {
                game_id: Some(created.game_id),
                status: Some("created".to_string()),
                creator: Some(created.creator.clone()),
                state: created.state.clone(),
                ..Default::default()
            }),
            ActionResult::GameJoined(joined) => data(ResultData {
                game_id: Some(joined.game_id),
                status: Some("joined".to_string()),
                player: Some(joined.player.clone()),
                state: joined.state.clone(),
                ..Default::default()
            }),
            ActionResult::BetPlaced(bet) => data(ResultData {
                game_id: Some(bet.game_id),
                status: Some("bet_placed".to_string()),
                amount: Some(bet.amount),
                player: Some(bet.player.clone()),
                state: bet.state.clone(),
                ..Default::default()
            }),
            ActionResult::GameState(state) => data(ResultData {
                game_id: Some(state.id),
                state: Some(state.clone()),
                ..Default::default()
            }),
            ActionResult::ChipsState(chips) => data(ResultData {
                game_id: Some(chips.game_id),
                chips: Some(chips.clone()),
                ..Default::default()
            }),
            ActionResult::CardsState(cards) => data(ResultData {
                game_id: Some(cards.game_id),
                player: Some(cards.player.clone()),
                cards: Some(cards.clone()),
                ..Default::default()
            }),
        };

        Self {
            kind,
            request_id,
            result,
        }
    }

    /// Resolves the envelope for a call of the given action kind.
    pub fn into_outcome(self, action: ActionKind) -> Result<ActionResult, ClientError> {
        if self.kind == ResponseKind::Error {
            let reason = match self.result {
                ResponseResult::Text(reason) => reason,
                ResponseResult::Data(data) => data
                    .error
                    .unwrap_or_else(|| "unknown worker error".to_string()),
            };
            return Err(ClientError::Action { action, reason });
        }

        let expected = ResponseKind::for_action(action);
        if self.kind != expected {
            return Err(ClientError::Protocol(format!(
                "{action} call received a {:?} response",
                self.kind
            )));
        }

        match action {
            ActionKind::GetKey => Ok(ActionResult::Key(text(self.result, action)?)),
            ActionKind::SetNetwork => {
                let network = text(self.result, action)?
                    .parse::<Network>()
                    .map_err(ClientError::Protocol)?;
                Ok(ActionResult::NetworkSet(network))
            }
            ActionKind::CreateGame => {
                let data = object(self.result, action)?;
                Ok(ActionResult::GameCreated(CreatedGame {
                    game_id: require(data.game_id, action, "gameId")?,
                    creator: require(data.creator, action, "creator")?,
                    state: data.state,
                }))
            }
            ActionKind::JoinGame => {
                let data = object(self.result, action)?;
                Ok(ActionResult::GameJoined(JoinedGame {
                    game_id: require(data.game_id, action, "gameId")?,
                    player: require(data.player, action, "player")?,
                    state: data.state,
                }))
            }
            ActionKind::PlaceBet => {
                let data = object(self.result, action)?;
                Ok(ActionResult::BetPlaced(PlacedBet {
                    game_id: require(data.game_id, action, "gameId")?,
                    amount: require(data.amount, action, "amount")?,
                    player: require(data.player, action, "player")?,
                    state: data.state,
                }))
            }
            ActionKind::GetGameState => {
                let data = object(self.result, action)?;
                Ok(ActionResult::GameState(require(data.state, action, "state")?))
            }
            ActionKind::GetChipsState => {
                let data = object(self.result, action)?;
                Ok(ActionResult::ChipsState(require(data.chips, action, "chips")?))
            }
            ActionKind::GetCardsState => {
                let data = object(self.result, action)?;
                Ok(ActionResult::CardsState(require(data.cards, action, "cards")?))
            }
        }
    }
}

fn data(data: ResultData) -> ResponseResult {
    ResponseResult::Data(Box::new(data))
}

fn text(result: ResponseResult, action: ActionKind) -> Result<String, ClientError> {
    match result {
        ResponseResult::Text(text) => Ok(text),
        ResponseResult::Data(_) => Err(ClientError::Protocol(format!(
            "{action} response should carry a string result"
        ))),
    }
}

fn object(result: ResponseResult, action: ActionKind) -> Result<ResultData, ClientError> {
    match result {
        ResponseResult::Data(data) => Ok(*data),
        ResponseResult::Text(_) => Err(ClientError::Protocol(format!(
            "{action} response should carry an object result"
        ))),
    }
}

fn require<T>(value: Option<T>, action: ActionKind, field: &str) -> Result<T, ClientError> {
    value.ok_or_else(|| ClientError::Protocol(format!("{action} response is missing `{field}`")))
}
