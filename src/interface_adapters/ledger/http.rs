use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::{CardsState, ChipsState, GameState, Ledger};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest<'a> {
    game_id: u64,
    creator: &'a str,
}

#[derive(Debug, Serialize)]
struct JoinGameRequest<'a> {
    player: &'a str,
}

#[derive(Debug, Serialize)]
struct PlaceBetRequest<'a> {
    player: &'a str,
    amount: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerClientError {
    Transport(String),
    Upstream { status: u16, message: String },
    Decode(String),
}

impl fmt::Display for LedgerClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerClientError::Transport(reason) => write!(f, "ledger unreachable: {reason}"),
            LedgerClientError::Upstream { status, message } => {
                write!(f, "ledger rejected request ({status}): {message}")
            }
            LedgerClientError::Decode(reason) => write!(f, "unexpected ledger response: {reason}"),
        }
    }
}

impl std::error::Error for LedgerClientError {}

// Thin reqwest client for a REST ledger service.
#[derive(Clone)]
pub struct HttpLedger {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerClientError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| LedgerClientError::Transport(e.to_string()))?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LedgerClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerClientError::Transport(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, LedgerClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| LedgerClientError::Decode(e.to_string()));
    }

    // Fall back to the status text when the body is not the usual error shape.
    let message = match response.json::<ErrorResponse>().await {
        Ok(error) => error.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(LedgerClientError::Upstream {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn create_game(&self, game_id: u64, creator: &str) -> Result<GameState, String> {
        self.post("/games", &CreateGameRequest { game_id, creator })
            .await
            .map_err(|e| e.to_string())
    }

    async fn join_game(&self, game_id: u64, player: &str) -> Result<GameState, String> {
        self.post(&format!("/games/{game_id}/join"), &JoinGameRequest { player })
            .await
            .map_err(|e| e.to_string())
    }

    async fn place_bet(&self, game_id: u64, player: &str, amount: u64) -> Result<GameState, String> {
        self.post(
            &format!("/games/{game_id}/bets"),
            &PlaceBetRequest { player, amount },
        )
        .await
        .map_err(|e| e.to_string())
    }

    async fn game_state(&self, game_id: u64) -> Result<GameState, String> {
        self.get(&format!("/games/{game_id}"))
            .await
            .map_err(|e| e.to_string())
    }

    async fn chips_state(&self, game_id: u64) -> Result<ChipsState, String> {
        self.get(&format!("/games/{game_id}/chips"))
            .await
            .map_err(|e| e.to_string())
    }

    // Addresses are `aleo_` plus hex, so they need no query escaping.
    async fn cards_state(&self, game_id: u64, player: &str) -> Result<CardsState, String> {
        self.get(&format!("/games/{game_id}/cards?player={player}"))
            .await
            .map_err(|e| e.to_string())
    }
}
