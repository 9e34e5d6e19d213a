use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{
    Blinds, CardsState, ChipsState, GameState, GameStatus, Ledger, Player,
};

pub const STARTING_CHIPS: u64 = 1000;
pub const DEFAULT_BLINDS: Blinds = Blinds { small: 5, big: 10 };
pub const MAX_SEATS: usize = 6;
// Players needed before cards are dealt.
const MIN_PLAYERS: usize = 2;

const RANKS: [char; 13] = ['2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A'];
const SUITS: [char; 4] = ['c', 'd', 'h', 's'];

// In-process ledger. Games live for the lifetime of the value.
#[derive(Default)]
pub struct MemoryLedger {
    games: Mutex<HashMap<u64, GameState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn games(&self) -> MutexGuard<'_, HashMap<u64, GameState>> {
        self.games.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_game<T>(
        &self,
        game_id: u64,
        f: impl FnOnce(&mut GameState) -> Result<T, String>,
    ) -> Result<T, String> {
        let mut games = self.games();
        let game = games
            .get_mut(&game_id)
            .ok_or_else(|| format!("game {game_id} not found"))?;
        f(game)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_game(&self, game_id: u64, creator: &str) -> Result<GameState, String> {
        let mut games = self.games();
        if games.contains_key(&game_id) {
            return Err(format!("game {game_id} already exists"));
        }

        let game = GameState {
            id: game_id,
            players: vec![Player::new(creator, STARTING_CHIPS, 0)],
            community_cards: Vec::new(),
            pot: 0,
            current_turn: 0,
            status: GameStatus::Waiting,
            blinds: DEFAULT_BLINDS,
        };
        let view = game.public_view();
        games.insert(game_id, game);
        tracing::debug!(game_id, creator, "game created");
        Ok(view)
    }

    async fn join_game(&self, game_id: u64, player: &str) -> Result<GameState, String> {
        self.with_game(game_id, |game| {
            if game.status == GameStatus::Ended {
                return Err(format!("game {game_id} has ended"));
            }
            if game.player(player).is_some() {
                return Err(format!("{player} already joined game {game_id}"));
            }
            let seat = (0..MAX_SEATS as u8)
                .find(|seat| game.players.iter().all(|p| p.seat != *seat))
                .ok_or_else(|| format!("game {game_id} is full"))?;

            game.players.push(Player::new(player, STARTING_CHIPS, seat));
            game.players.sort_by_key(|p| p.seat);

            let status = game.status;
            match status {
                GameStatus::Waiting if game.players.len() >= MIN_PLAYERS => start_hand(game),
                // Late joiners are dealt into the hand already running.
                GameStatus::Playing => deal_seat(game, seat),
                _ => {}
            }
            tracing::debug!(game_id, player, seat, "player joined");
            Ok(game.public_view())
        })
    }

    async fn place_bet(&self, game_id: u64, player: &str, amount: u64) -> Result<GameState, String> {
        self.with_game(game_id, |game| {
            if game.status != GameStatus::Playing {
                return Err(format!("game {game_id} is not in play"));
            }
            let current_turn = game.current_turn;
            let bettor = game
                .players
                .iter_mut()
                .find(|p| p.address == player)
                .ok_or_else(|| format!("{player} is not seated in game {game_id}"))?;
            if bettor.seat != current_turn {
                return Err(format!("it is not {player}'s turn"));
            }
            if !bettor.can_act() {
                return Err(format!("{player} cannot act in this hand"));
            }
            if amount > bettor.chips {
                return Err(format!(
                    "bet of {amount} exceeds stack of {}",
                    bettor.chips
                ));
            }

            bettor.chips -= amount;
            bettor.current_bet = Some(bettor.current_bet.unwrap_or(0) + amount);
            if bettor.chips == 0 {
                bettor.is_all_in = Some(true);
            }
            game.pot += amount;
            advance_turn(game);
            tracing::debug!(game_id, player, amount, pot = game.pot, "bet placed");
            Ok(game.public_view())
        })
    }

    async fn game_state(&self, game_id: u64) -> Result<GameState, String> {
        self.with_game(game_id, |game| Ok(game.public_view()))
    }

    async fn chips_state(&self, game_id: u64) -> Result<ChipsState, String> {
        self.with_game(game_id, |game| Ok(ChipsState::from(&*game)))
    }

    async fn cards_state(&self, game_id: u64, player: &str) -> Result<CardsState, String> {
        self.with_game(game_id, |game| {
            let seated = game
                .player(player)
                .ok_or_else(|| format!("{player} is not seated in game {game_id}"))?;
            Ok(CardsState {
                game_id,
                player: player.to_string(),
                hole_cards: seated.cards.clone(),
                community_cards: game.community_cards.clone(),
            })
        })
    }
}

fn start_hand(game: &mut GameState) {
    game.status = GameStatus::Playing;
    let seats: Vec<u8> = game.players.iter().map(|p| p.seat).collect();
    for seat in seats {
        deal_seat(game, seat);
    }
    game.current_turn = game.players.first().map(|p| p.seat).unwrap_or(0);
}

// Seat N always receives deck cards 2N and 2N+1.
fn deal_seat(game: &mut GameState, seat: u8) {
    let deck = shuffled_deck(game.id);
    let first = usize::from(seat) * 2;
    if let Some(player) = game.players.iter_mut().find(|p| p.seat == seat) {
        player.cards = Some([deck[first].clone(), deck[first + 1].clone()]);
    }
}

fn advance_turn(game: &mut GameState) {
    let current = game.current_turn;
    let next = game
        .players
        .iter()
        .filter(|p| p.can_act())
        .map(|p| p.seat)
        .find(|seat| *seat > current)
        .or_else(|| game.players.iter().filter(|p| p.can_act()).map(|p| p.seat).next());

    match next {
        Some(seat) => game.current_turn = seat,
        None => game.status = GameStatus::Ended,
    }
}

/// Deterministic per-game deck order: cards sorted by SHA-256 of game id and card.
pub fn shuffled_deck(game_id: u64) -> Vec<String> {
    let mut deck: Vec<(Vec<u8>, String)> = RANKS
        .iter()
        .flat_map(|rank| SUITS.iter().map(move |suit| format!("{rank}{suit}")))
        .map(|card| {
            let mut hasher = Sha256::new();
            hasher.update(game_id.to_be_bytes());
            hasher.update(card.as_bytes());
            (hasher.finalize().to_vec(), card)
        })
        .collect();
    deck.sort();
    deck.into_iter().map(|(_, card)| card).collect()
}
