pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod filter;
pub mod logging;
pub mod services;
