//! R-Droid Gradle DSL
//!
//! Typed, editable model of Gradle build and settings scripts (Groovy,
//! Kotlin and declarative). Scripts are parsed into an element graph; block and
//! property models read and change it; the document synchronizer writes
//! the changes back into the original text without disturbing anything
//! the model did not touch.

pub mod lexer;
pub mod syntax;
pub mod parser;
pub mod description;
pub mod names;
pub mod value;
pub mod element;
pub mod context;
pub mod tree;
pub mod resolve;
pub mod property;
pub mod writer;
pub mod sync;
pub mod blocks;
pub mod build_model;

pub use blocks::{
    AndroidModel, ArtifactDependency, ArtifactDependencySpec, BlockModel, BuildTypeModel, DependenciesModel,
    ExtModel, JavaApplicationModel, PluginsModel, ProductFlavorModel, SettingsModel, SourceDirectoryModel,
    SourceSetModel,
};
pub use build_model::GradleBuildModel;
pub use context::DslContext;
pub use description::BlockKind;
pub use element::{DslElement, ElementId, ElementKind, ElementState, PropertyType};
pub use names::{NameResolver, Semantics};
pub use parser::{DslParser, ParseError};
pub use property::{PropertyError, PropertyModel};
pub use resolve::{ValueDependency, ValueResolver};
pub use sync::{DocumentSynchronizer, SyncError, TextEdit};
pub use tree::DslTree;
pub use value::{DslExpr, LiteralValue, ResolvedValue, ValueType};
pub use writer::DslWriter;

/// Errors surfaced by [`GradleBuildModel`]
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Property error: {0}")]
    Property(#[from] PropertyError),
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Save failed: {0}")]
    Save(String),
}
