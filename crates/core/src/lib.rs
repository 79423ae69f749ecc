//! R-Droid Core - Shared types for Gradle build script tooling
//! 
//! This crate provides the pieces every other crate leans on: the
//! application error type, the rewrite configuration, dialect detection
//! and the event bus used to observe model changes.

pub mod config;
pub mod dialect;
pub mod events;
pub mod error;

pub use config::{DslConfig, QuoteStyle};
pub use dialect::GradleDialect;
pub use events::{Event, EventBus, EventSubscription};
pub use error::{RDroidError, Result};

/// R-Droid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "R-Droid Gradle";
