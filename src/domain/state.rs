// Domain-level game snapshots and the client session record.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Ledger deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Local,
    Testnet,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Local => "local",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Network::Local),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Reachability of the selected ledger as last observed by a state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blinds {
    pub small: u64,
    pub big: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub address: String,
    pub chips: u64,
    // Hole cards are only present in the owner's private view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_folded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_all_in: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bet: Option<u64>,
    pub seat: u8,
}

impl Player {
    pub fn new(address: impl Into<String>, chips: u64, seat: u8) -> Self {
        Self {
            address: address.into(),
            chips,
            cards: None,
            is_folded: Some(false),
            is_all_in: Some(false),
            current_bet: Some(0),
            seat,
        }
    }

    /// True while the player can still act in the current hand.
    pub fn can_act(&self) -> bool {
        !self.is_folded.unwrap_or(false) && !self.is_all_in.unwrap_or(false)
    }
}

/// Full table snapshot. Always replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: u64,
    pub players: Vec<Player>,
    pub community_cards: Vec<String>,
    pub pot: u64,
    pub current_turn: u8,
    pub status: GameStatus,
    pub blinds: Blinds,
}

impl GameState {
    pub fn player(&self, address: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.address == address)
    }

    /// Checks seat uniqueness and that the turn points at a seated player while playing.
    pub fn validate(&self) -> Result<(), String> {
        let mut seats = HashSet::new();
        for player in &self.players {
            if !seats.insert(player.seat) {
                return Err(format!("game {}: seat {} is taken twice", self.id, player.seat));
            }
        }

        if self.status == GameStatus::Playing && !seats.contains(&self.current_turn) {
            return Err(format!(
                "game {}: current turn {} is not a seated player",
                self.id, self.current_turn
            ));
        }

        Ok(())
    }

    /// Copy of the state with every player's hole cards removed.
    pub fn public_view(&self) -> GameState {
        let mut view = self.clone();
        for player in &mut view.players {
            player.cards = None;
        }
        view
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipStack {
    pub address: String,
    pub seat: u8,
    pub chips: u64,
    pub current_bet: u64,
}

/// Per-seat chip view of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipsState {
    pub game_id: u64,
    pub pot: u64,
    pub stacks: Vec<ChipStack>,
}

impl From<&GameState> for ChipsState {
    fn from(state: &GameState) -> Self {
        Self {
            game_id: state.id,
            pot: state.pot,
            stacks: state
                .players
                .iter()
                .map(|player| ChipStack {
                    address: player.address.clone(),
                    seat: player.seat,
                    chips: player.chips,
                    current_bet: player.current_bet.unwrap_or(0),
                })
                .collect(),
        }
    }
}

/// A single player's private card view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsState {
    pub game_id: u64,
    pub player: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_cards: Option<[String; 2]>,
    pub community_cards: Vec<String>,
}

/// Client session record observed by UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub private_key: Option<String>,
    pub network: Network,
    pub connection_status: ConnectionStatus,
    pub last_game_state: Option<GameState>,
    pub error: Option<String>,
}

impl SessionState {
    pub fn new(private_key: Option<String>, network: Network) -> Self {
        Self {
            private_key,
            network,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_game() -> GameState {
        GameState {
            id: 1,
            players: vec![Player::new("aleo_a", 1000, 0), Player::new("aleo_b", 1000, 1)],
            community_cards: Vec::new(),
            pot: 0,
            current_turn: 0,
            status: GameStatus::Playing,
            blinds: Blinds { small: 5, big: 10 },
        }
    }

    #[test]
    fn network_parses_case_insensitively() {
        assert_eq!("Testnet".parse::<Network>(), Ok(Network::Testnet));
        assert_eq!(" local ".parse::<Network>(), Ok(Network::Local));
        assert!("mainnet".parse::<Network>().is_err());
    }

    #[test]
    fn duplicate_seats_are_rejected() {
        let mut game = two_player_game();
        game.players[1].seat = 0;

        assert!(game.validate().is_err());
    }

    #[test]
    fn turn_must_point_at_a_seat_while_playing() {
        let mut game = two_player_game();
        game.current_turn = 4;
        assert!(game.validate().is_err());

        game.status = GameStatus::Waiting;
        assert!(game.validate().is_ok());
    }

    #[test]
    fn public_view_strips_hole_cards() {
        let mut game = two_player_game();
        game.players[0].cards = Some(["As".to_string(), "Kd".to_string()]);

        let view = game.public_view();

        assert!(view.players.iter().all(|player| player.cards.is_none()));
        assert_eq!(view.pot, game.pot);
    }

    #[test]
    fn game_state_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(two_player_game()).expect("serialize game state");

        assert_eq!(json["currentTurn"], 0);
        assert_eq!(json["communityCards"], serde_json::json!([]));
        assert_eq!(json["players"][0]["isFolded"], false);
        assert_eq!(json["status"], "playing");
    }
}
