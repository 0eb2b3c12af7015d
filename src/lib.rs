pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod refresh;
pub mod session;
pub mod stats;
pub mod utils;
