//! Champion Roster server
//!
//! Opens the SQLite store, makes sure the admin account exists and serves the
//! sync gateway until the process is stopped.

use clap::Parser;
use roster_server::{ensure_bootstrap_account, init_schema, ServerConfig};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    let db_path = PathBuf::from(&config.database);

    log::info!("Starting roster_server...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    // Runs once per start, never as a side effect of a query
    if let Err(e) = ensure_bootstrap_account(&conn, &config.bootstrap_account()) {
        log::error!("Failed to bootstrap admin account: {}", e);
        std::process::exit(1);
    }

    if config.active_write_token().is_none() {
        log::warn!("No write token configured; champion writes are unauthenticated");
    }

    // Wrap connection in Arc<Mutex> for thread-safe sharing
    let db = Arc::new(Mutex::new(conn));

    tokio::select! {
        result = roster_server::web::serve(db, &config) => {
            if let Err(e) = result {
                log::error!("Gateway error: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutdown requested, exiting");
        }
    }
}
