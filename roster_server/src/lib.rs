//! Champion Roster - durable record store and sync gateway
//!
//! Keeps champion records in SQLite (images as raw BLOBs) and serves them to
//! clients over a small JSON API that speaks data URIs.

pub mod config;
pub mod database;
pub mod error;
pub mod web;

pub use config::ServerConfig;
pub use database::{
    account_count, champion_count, ensure_bootstrap_account, get_champion, init_schema,
    insert_champion, list_champions, update_champion, BootstrapAccount,
};
pub use error::{Result, ServerError};
pub use web::{create_router, GatewayOptions};
