//! SlayPoints Server Library
//!
//! A points-tracking web app: accounts sign up or log in with email and
//! password, and each account's point balance is kept in a document store.
//! This module exports the core types and functions for testing and reuse.

pub mod auth;
pub mod balance;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod routes;
pub mod security;
pub mod session;
pub mod store;
pub mod view;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};

use std::sync::Arc;
use std::time::Duration;

use auth::LocalAuth;
use session::SessionRegistry;
use store::RedbDocumentStore;

/// Session registry as wired in the server
pub type Sessions = SessionRegistry<LocalAuth, RedbDocumentStore>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub sessions: Arc<Sessions>,
}

impl AppState {
    /// Wire the local auth provider and document store over one database
    pub fn new(db: Db, config: Config) -> Self {
        let sessions = SessionRegistry::new(
            LocalAuth::new(db.clone(), &config),
            RedbDocumentStore::new(db.clone()),
            Duration::from_secs(config.session_idle_timeout_secs),
            config.max_sessions,
        );
        Self {
            db,
            config,
            sessions: Arc::new(sessions),
        }
    }
}
