//! R-Droid Gradle - typed editing of Gradle build scripts
//!
//! Loads `build.gradle`, `build.gradle.kts` and `build.gradle.dcl` files
//! into a navigable property model and writes changes back into the
//! original text, leaving comments and formatting alone.
//!
//! ## Architecture
//!
//! - `r-droid-core`: configuration, events and the application error type
//! - `r-droid-editor`: rope text buffer with transactional edits
//! - `r-droid-gradle-dsl`: parser, element graph, property and block models

#![warn(clippy::all)]

pub mod commands;

// Re-export main components for library usage
pub use r_droid_core as core;
pub use r_droid_editor as editor;
pub use r_droid_gradle_dsl as dsl;

/// Prelude module for convenient imports
pub mod prelude {
    pub use r_droid_core::{DslConfig, Event, GradleDialect};
    pub use r_droid_gradle_dsl::{
        DslContext, DslError, DslExpr, GradleBuildModel, PropertyError, PropertyModel, ResolvedValue,
    };
}
