pub mod build_info;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod jobs;
pub mod logging;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod state;
pub mod store;
