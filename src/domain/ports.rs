use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::state::{CardsState, ChipsState, GameState, Network};

// Port for the ledger endpoint the worker executes actions against.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create_game(&self, game_id: u64, creator: &str) -> Result<GameState, String>;
    async fn join_game(&self, game_id: u64, player: &str) -> Result<GameState, String>;
    async fn place_bet(&self, game_id: u64, player: &str, amount: u64)
        -> Result<GameState, String>;
    async fn game_state(&self, game_id: u64) -> Result<GameState, String>;
    async fn chips_state(&self, game_id: u64) -> Result<ChipsState, String>;
    async fn cards_state(&self, game_id: u64, player: &str) -> Result<CardsState, String>;
}

// One ledger per network; the worker picks one when it dispatches an action.
#[derive(Clone)]
pub struct LedgerSet {
    local: Arc<dyn Ledger>,
    testnet: Arc<dyn Ledger>,
}

impl LedgerSet {
    pub fn new(local: Arc<dyn Ledger>, testnet: Arc<dyn Ledger>) -> Self {
        Self { local, testnet }
    }

    pub fn select(&self, network: Network) -> Arc<dyn Ledger> {
        match network {
            Network::Local => self.local.clone(),
            Network::Testnet => self.testnet.clone(),
        }
    }
}

// Port for durable key-value persistence (private key survives restarts).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// Structured diagnostic sink shared by the worker, coordinator and session.
// Fire-and-forget: implementations must not block or panic.
pub trait EventSink: Send + Sync {
    fn log(&self, level: LogLevel, context: &str, message: &str, fields: &[(&str, String)]);
}
