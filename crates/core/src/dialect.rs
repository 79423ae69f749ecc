//! Build script dialects
//!
//! Gradle accepts three surface syntaxes for the same build model.

use std::path::Path;
use serde::{Deserialize, Serialize};

/// Surface syntax of a build script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradleDialect {
    /// `build.gradle`
    #[default]
    Groovy,
    /// `build.gradle.kts`
    Kotlin,
    /// `build.gradle.dcl`, assignment-only key/value syntax
    Declarative,
}

impl GradleDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradleDialect::Groovy => "groovy",
            GradleDialect::Kotlin => "kotlin",
            GradleDialect::Declarative => "declarative",
        }
    }

    /// Detect the dialect from a build file name
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?;
        if name.ends_with(".gradle.kts") {
            Some(GradleDialect::Kotlin)
        } else if name.ends_with(".gradle.dcl") || name.ends_with(".dcl") {
            Some(GradleDialect::Declarative)
        } else if name.ends_with(".gradle") {
            Some(GradleDialect::Groovy)
        } else {
            None
        }
    }

    /// Whether properties may only be bound with `=`
    pub fn is_assignment_only(&self) -> bool {
        matches!(self, GradleDialect::Declarative)
    }

    /// Whether string literals may use single quotes
    pub fn allows_single_quotes(&self) -> bool {
        matches!(self, GradleDialect::Groovy)
    }
}

impl std::fmt::Display for GradleDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(GradleDialect::from_path("app/build.gradle"), Some(GradleDialect::Groovy));
        assert_eq!(GradleDialect::from_path("build.gradle.kts"), Some(GradleDialect::Kotlin));
        assert_eq!(GradleDialect::from_path("settings.gradle.dcl"), Some(GradleDialect::Declarative));
        assert_eq!(GradleDialect::from_path("Cargo.toml"), None);
    }
}
