//! Core module - shared infrastructure for multichat
//!
//! This module contains foundational types, configuration, error handling,
//! logging setup and the notification channel used throughout the crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod types;

pub use config::{BotProfile, Config};
pub use error::{MultichatError, Result};
pub use notify::{Notification, NotificationSink};
pub use types::*;
