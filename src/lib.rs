pub mod cli;
pub mod config;
pub mod error;
pub mod prelude;
pub mod pruner;
pub mod retention;
pub mod snapshot;
