use crate::domain::Network;
use std::{env, path::PathBuf, time::Duration};

// Runtime constants and environment-driven settings.

pub const WORKER_CHANNEL_CAPACITY: usize = 64;
// Requests shorter than this would time out healthy ledger round-trips.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Http,
}

pub fn network() -> Network {
    env::var("POKER_NETWORK")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

pub fn ledger_backend() -> LedgerBackend {
    match env::var("POKER_LEDGER_BACKEND").as_deref().map(str::trim) {
        Ok("http") => LedgerBackend::Http,
        _ => LedgerBackend::Memory,
    }
}

pub fn local_ledger_url() -> String {
    env::var("POKER_LOCAL_LEDGER_URL").unwrap_or_else(|_| "http://127.0.0.1:3030".to_string())
}

pub fn testnet_ledger_url() -> String {
    env::var("POKER_TESTNET_LEDGER_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:3031".to_string())
}

pub fn ledger_timeout() -> Duration {
    millis_var("POKER_LEDGER_TIMEOUT_MS").unwrap_or(Duration::from_millis(1500))
}

pub fn request_timeout() -> Duration {
    clamp_request_timeout(millis_var("POKER_REQUEST_TIMEOUT_MS"))
}

pub fn init_timeout() -> Duration {
    millis_var("POKER_INIT_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

pub fn storage_path() -> PathBuf {
    env::var("POKER_STORAGE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".poker_client/storage.json"))
}

fn millis_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn clamp_request_timeout(configured: Option<Duration>) -> Duration {
    configured
        .unwrap_or(Duration::from_secs(15))
        .max(MIN_REQUEST_TIMEOUT)
}
