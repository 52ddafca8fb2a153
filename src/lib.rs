pub mod cli;
pub mod commands;
pub mod config;
pub mod docker;
pub mod environment;
pub mod error;
pub mod hasura;
pub mod layout;
pub mod ports;
pub mod process;
pub mod proxy;
pub mod signal;
pub mod ui;
pub mod watcher;
