//! `dependencies { }`
//!
//! Every declaration is kept as its own element, so two `implementation`
//! lines stay two artifacts. Only artifact notations are modelled here:
//! `'group:name:version'` strings and `group: .., name: .., version: ..`
//! maps. Anything else (`project(':lib')`, `platform(..)`) is left alone.

use std::fmt;

use serde::Serialize;

use crate::element::{ElementId, ElementKind};
use crate::resolve::ValueResolver;
use crate::value::{DslExpr, ResolvedValue};

/// `group:name:version:classifier@extension`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDependencySpec {
    pub group: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub extension: Option<String>,
}

impl ArtifactDependencySpec {
    /// Parse a compact notation; `None` when there is no artifact name
    pub fn parse(notation: &str) -> Option<Self> {
        let notation = notation.trim();
        let (coordinates, extension) = match notation.split_once('@') {
            Some((coordinates, extension)) => (coordinates, Some(extension.to_string())),
            None => (notation, None),
        };
        let parts: Vec<&str> = coordinates.split(':').collect();
        let non_empty = |part: &&str| (!part.is_empty()).then(|| part.to_string());
        let (group, name, version, classifier) = match parts.as_slice() {
            [name] => (None, name.to_string(), None, None),
            [group, name] => (non_empty(group), name.to_string(), None, None),
            [group, name, version] => (non_empty(group), name.to_string(), non_empty(version), None),
            [group, name, version, classifier] => {
                (non_empty(group), name.to_string(), non_empty(version), non_empty(classifier))
            }
            _ => return None,
        };
        if name.is_empty() {
            return None;
        }
        Some(Self { group, name, version, classifier, extension })
    }

    fn from_map(entries: &indexmap::IndexMap<String, ResolvedValue>) -> Option<Self> {
        let field = |key: &str| entries.get(key).and_then(|value| value.as_str()).map(str::to_string);
        Some(Self {
            group: field("group"),
            name: field("name")?,
            version: field("version"),
            classifier: field("classifier"),
            extension: field("ext"),
        })
    }
}

impl fmt::Display for ArtifactDependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group.as_deref().unwrap_or(""), self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        if let Some(extension) = &self.extension {
            write!(f, "@{}", extension)?;
        }
        Ok(())
    }
}

/// One declared artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDependency {
    pub configuration: String,
    pub spec: ArtifactDependencySpec,
    #[serde(skip)]
    pub element: ElementId,
}

typed_block!(
    /// The `dependencies` block
    DependenciesModel
);

impl DependenciesModel<'_> {
    /// Artifact declarations in document order
    pub fn artifacts(&self) -> Vec<ArtifactDependency> {
        let tree = self.tree();
        let resolver = ValueResolver::new(tree);
        tree.live_children(self.id())
            .into_iter()
            .filter_map(|id| {
                let element = tree.get(id);
                let spec = match &element.kind {
                    ElementKind::Expression(_) => match resolver.resolve(id) {
                        ResolvedValue::Literal(literal) => ArtifactDependencySpec::parse(&literal.to_string()),
                        _ => None,
                    },
                    ElementKind::Map(_) => match resolver.resolve(id) {
                        ResolvedValue::Map(entries) => ArtifactDependencySpec::from_map(&entries),
                        _ => None,
                    },
                    _ => None,
                }?;
                Some(ArtifactDependency { configuration: element.name.clone(), spec, element: id })
            })
            .collect()
    }

    /// Artifacts of one configuration such as `implementation`
    pub fn artifacts_of(&self, configuration: &str) -> Vec<ArtifactDependency> {
        self.artifacts().into_iter().filter(|artifact| artifact.configuration == configuration).collect()
    }

    pub fn contains(&self, configuration: &str, notation: &str) -> bool {
        let Some(wanted) = ArtifactDependencySpec::parse(notation) else { return false };
        self.artifacts_of(configuration).iter().any(|artifact| artifact.spec == wanted)
    }

    /// Append `configuration 'notation'` unless it is already declared
    pub fn add_artifact(&mut self, configuration: &str, notation: &str) -> bool {
        if self.contains(configuration, notation) {
            return false;
        }
        let holder = self.id();
        let tree = self.tree_mut();
        let id = tree.new_literal(configuration, DslExpr::from(notation));
        tree.set_new_element(holder, id);
        // Configurations are method calls in every dialect
        tree.get_mut(id).use_assignment = false;
        true
    }

    /// Remove every declaration of `notation` under `configuration`
    pub fn remove_artifact(&mut self, configuration: &str, notation: &str) -> bool {
        let Some(wanted) = ArtifactDependencySpec::parse(notation) else { return false };
        let doomed: Vec<ElementId> = self
            .artifacts_of(configuration)
            .into_iter()
            .filter(|artifact| artifact.spec == wanted)
            .map(|artifact| artifact.element)
            .collect();
        let tree = self.tree_mut();
        for id in &doomed {
            tree.remove_element(*id);
        }
        !doomed.is_empty()
    }
}
