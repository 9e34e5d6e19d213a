// Frameworks: environment config, runtime bootstrap and the command-line front end.

pub mod cli;
pub mod config;
pub mod runtime;
