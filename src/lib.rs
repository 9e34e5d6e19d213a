pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::runtime::{build_session, run};
pub use use_cases::{Coordinator, GameSession};
