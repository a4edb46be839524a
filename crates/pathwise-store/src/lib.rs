//! # pathwise-store
//!
//! SQLite persistence for the Pathwise discovery engine.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for the five engine
//! tables (relationships, activity events, recommendations, trending entries,
//! unlocked achievements) plus read access to the course-catalog mirror that
//! other domains populate.

pub mod achievements;
pub mod activities;
pub mod catalog;
pub mod database;
pub mod migrations;
pub mod models;
pub mod recommendations;
pub mod relationships;
pub mod trending;

mod error;
mod sql;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
