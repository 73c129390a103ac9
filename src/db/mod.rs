//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer persisting the entity store and processed-event ledger

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{EventStatus, ProcessedEvent, Repository};
