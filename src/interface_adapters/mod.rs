// Interface adapters: wire protocol, worker launchers, ledgers, storage and logging.

pub mod launcher;
pub mod ledger;
pub mod logging;
pub mod protocol;
pub mod storage;
