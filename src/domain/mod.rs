// Domain layer: game/session state, account rules and the ports the core depends on.

pub mod account;
pub mod errors;
pub mod ports;
pub mod state;

pub use errors::{AccountError, BetError};
pub use ports::{EventSink, KeyValueStore, Ledger, LedgerSet, LogLevel};
pub use state::{
    Blinds, CardsState, ChipStack, ChipsState, ConnectionStatus, GameState, GameStatus, Network,
    Player, SessionState,
};
