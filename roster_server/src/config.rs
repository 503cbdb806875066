//! Command line / environment configuration for the roster server

use crate::database::{BootstrapAccount, LOCKED_PASSWORD_HASH};
use clap::Parser;
use std::path::PathBuf;

/// Champion roster server - durable record store and sync gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "roster_server")]
#[command(version, about, long_about = None)]
pub struct ServerConfig {
    /// Path to the SQLite database file
    #[arg(short, long, env = "ROSTER_DATABASE", default_value_t = default_db_path())]
    pub database: String,

    /// Address to bind the HTTP listener to
    #[arg(long, env = "ROSTER_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the HTTP listener
    #[arg(short, long, env = "ROSTER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Maximum request body size in MiB (two 2 MiB images must fit)
    #[arg(long, env = "ROSTER_BODY_LIMIT_MB", default_value_t = 16)]
    pub body_limit_mb: usize,

    /// Bearer token required for writes (writes are open when unset)
    #[arg(long, env = "ROSTER_WRITE_TOKEN", hide_env_values = true)]
    pub write_token: Option<String>,

    /// Name of the admin account created on first start
    #[arg(long, env = "ROSTER_ADMIN_NAME", default_value = "Administrator")]
    pub admin_name: String,

    /// Email of the admin account created on first start
    #[arg(long, env = "ROSTER_ADMIN_EMAIL", default_value = "admin@example.com")]
    pub admin_email: String,

    /// Password hash for the admin account (the account is locked when unset)
    #[arg(long, env = "ROSTER_ADMIN_PASSWORD_HASH", hide_env_values = true)]
    pub admin_password_hash: Option<String>,
}

/// Returns the default database path: ~/.local/share/champion_roster/roster.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("champion_roster")
        .join("roster.db")
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    /// `bind:port` for the TCP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }

    /// The write token in effect. An empty token leaves writes open.
    pub fn active_write_token(&self) -> Option<&str> {
        self.write_token.as_deref().filter(|token| !token.is_empty())
    }

    /// The admin account to create when none exists
    pub fn bootstrap_account(&self) -> BootstrapAccount {
        BootstrapAccount {
            name: self.admin_name.clone(),
            email: self.admin_email.clone(),
            password_hash: self
                .admin_password_hash
                .clone()
                .filter(|hash| !hash.is_empty())
                .unwrap_or_else(|| LOCKED_PASSWORD_HASH.to_string()),
        }
    }
}
