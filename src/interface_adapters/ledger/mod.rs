// Ledger adapters: an in-process table store and a REST client.

pub mod http;
pub mod memory;

pub use http::{HttpLedger, LedgerClientError};
pub use memory::MemoryLedger;
