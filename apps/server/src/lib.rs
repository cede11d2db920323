//! Question service
//!
//! An HTTP service for a community Q&A site:
//! - Questions with title, content, tags and an asker
//! - A fixed tag catalog that questions must reference
//! - Bearer-token identity for creating, editing and deleting questions
//! - View counting on every successful read

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
