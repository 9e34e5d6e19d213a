// Use cases: worker execution, request correlation and the session facade.

pub mod coordinator;
pub mod session;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{
    Coordinator, CoordinatorSettings, WorkerChannels, WorkerLauncher, WorkerStatus,
};
pub use session::GameSession;
pub use types::{
    ActionKind, ActionRequest, ActionResult, ClientError, CreatedGame, JoinedGame, PlacedBet,
};
pub use worker::{worker_task, ActionWorker};
