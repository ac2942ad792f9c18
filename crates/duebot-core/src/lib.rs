//! # DueBot Core
//! Shared types, traits, configuration and error handling.
//!
//! Every other crate in the workspace talks through the seams defined here:
//! [`traits::Channel`] for the chat transport and [`traits::Provider`] for
//! the optional AI backend behind `/ask`.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DueBotConfig;
pub use error::{DueBotError, Result};
