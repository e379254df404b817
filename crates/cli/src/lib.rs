pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod host;
pub mod logging;
pub mod output;
