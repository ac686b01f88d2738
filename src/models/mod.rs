// src/models/mod.rs

//! Domain models for the archiver application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod channel;
mod config;
mod order;
mod post;

// Re-export all public types
pub use channel::ChannelInfo;
pub use config::{
    ArchiverConfig, AuthConfig, Config, Driver, FetcherConfig, LoggingConfig, PathsConfig,
};
pub use order::{OrderEntry, OrderTable};
pub use post::{DEFAULT_COUNT, Post, PostRecord};
