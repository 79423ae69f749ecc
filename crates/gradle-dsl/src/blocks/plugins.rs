//! Applied plugins
//!
//! Plugins are read from the `plugins { }` block and from legacy
//! `apply plugin: 'x'` statements at the top level. The view is built over
//! the root element so both places are visible to it.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::element::{ElementId, ElementKind};
use crate::property::PropertyError;
use crate::resolve::ValueResolver;
use crate::tree::DslTree;
use crate::value::{DslExpr, ResolvedValue};
use r_droid_core::GradleDialect;

/// `id 'x' version '1.0' apply false`, `id("x") version "1.0"`
static ID_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*id\s*\(?\s*["']([^"']+)["']"#).expect("valid regex"));

/// `kotlin("android") version "1.9.0"`
static KOTLIN_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*kotlin\s*\(\s*"([^"]+)"\s*\)"#).expect("valid regex"));

/// `apply(plugin = "x")`
static KOTLIN_APPLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*apply\s*\(\s*plugin\s*=\s*"([^"]+)"\s*\)"#).expect("valid regex"));

const KOTLIN_PLUGIN_PREFIX: &str = "org.jetbrains.kotlin.";

/// Top-level blocks allowed before `plugins { }`
const LEADING_BLOCKS: &[&str] = &["buildscript", "pluginManagement"];

typed_block!(
    /// Plugins of a build file; wraps the root element
    PluginsModel
);

impl PluginsModel<'_> {
    /// Plugin ids in document order, duplicates removed
    pub fn plugins(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for (_, id) in self.entries() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.entries().iter().any(|(_, plugin)| plugin == id)
    }

    /// Apply `id`; returns `false` when it is already applied
    ///
    /// Groovy scripts that only use `apply plugin:` get another such
    /// statement, everything else gets an `id` entry in `plugins { }`.
    pub fn apply_plugin(&mut self, id: &str) -> Result<bool, PropertyError> {
        if self.has_plugin(id) {
            return Ok(false);
        }
        let root = self.id();
        let legacy = self.tree().dialect() == GradleDialect::Groovy
            && self.tree().find_block(root, "plugins").is_none()
            && !self.apply_maps().is_empty();

        let tree = self.tree_mut();
        if legacy {
            let declared: Vec<ElementId> = tree
                .live_children(root)
                .into_iter()
                .filter(|child| !matches!(tree.get(*child).kind, ElementKind::Unparsed(_)))
                .collect();
            let index = declared
                .iter()
                .rposition(|child| is_apply_map(tree.get(*child).name.as_str(), &tree.get(*child).kind))
                .map_or(0, |position| position + 1);
            let map = tree.new_map("apply");
            tree.add_new_element_at(root, index, map)?;
            tree.get_mut(map).use_assignment = false;
            let entry = tree.new_literal("plugin", DslExpr::from(id));
            tree.add_new_element_at(map, 0, entry)?;
        } else {
            let block = match tree.find_block(root, "plugins") {
                Some(block) => block,
                None => new_plugins_block(tree, root)?,
            };
            let entry = tree.new_literal("id", DslExpr::from(id));
            tree.set_new_element(block, entry);
            tree.get_mut(entry).use_assignment = false;
        }
        debug!("Applied plugin {}", id);
        Ok(true)
    }

    /// Remove every declaration applying `id`
    pub fn remove_plugin(&mut self, id: &str) -> bool {
        let doomed: Vec<ElementId> =
            self.entries().into_iter().filter(|(_, plugin)| plugin == id).map(|(element, _)| element).collect();
        let tree = self.tree_mut();
        for element in &doomed {
            tree.remove_element(*element);
        }
        !doomed.is_empty()
    }

    fn apply_maps(&self) -> Vec<ElementId> {
        let tree = self.tree();
        tree.live_children(self.id())
            .into_iter()
            .filter(|child| is_apply_map(&tree.get(*child).name, &tree.get(*child).kind))
            .collect()
    }

    /// Declaring element and plugin id of every applied plugin
    fn entries(&self) -> Vec<(ElementId, String)> {
        let tree = self.tree();
        let resolver = ValueResolver::new(tree);
        let mut entries = Vec::new();

        if let Some(block) = tree.find_block(self.id(), "plugins") {
            for child in tree.live_children(block) {
                let element = tree.get(child);
                let id = match &element.kind {
                    ElementKind::Expression(DslExpr::Unknown(text)) if text.is_empty() => Some(element.name.clone()),
                    ElementKind::Expression(DslExpr::Reference(text)) if element.name == "alias" => Some(text.clone()),
                    ElementKind::Expression(_) => match (element.name.as_str(), resolver.resolve(child)) {
                        ("id", ResolvedValue::Literal(literal)) => Some(literal.to_string()),
                        ("kotlin", ResolvedValue::Literal(literal)) => Some(format!("{}{}", KOTLIN_PLUGIN_PREFIX, literal)),
                        _ => None,
                    },
                    ElementKind::Unparsed(text) => capture(&ID_STATEMENT, text)
                        .or_else(|| capture(&KOTLIN_STATEMENT, text).map(|name| format!("{}{}", KOTLIN_PLUGIN_PREFIX, name))),
                    _ => None,
                };
                if let Some(id) = id {
                    entries.push((child, id));
                }
            }
        }

        for child in tree.live_children(self.id()) {
            let element = tree.get(child);
            let id = match &element.kind {
                kind if is_apply_map(&element.name, kind) => match resolver.resolve(child) {
                    ResolvedValue::Map(map) => map.get("plugin").and_then(|value| value.as_str()).map(str::to_string),
                    _ => None,
                },
                ElementKind::Unparsed(text) => capture(&KOTLIN_APPLY, text),
                _ => None,
            };
            if let Some(id) = id {
                entries.push((child, id));
            }
        }
        entries
    }
}

/// Gradle wants `plugins { }` ahead of every statement but `buildscript` and `pluginManagement`
fn new_plugins_block(tree: &mut DslTree, root: ElementId) -> Result<ElementId, PropertyError> {
    let declared: Vec<ElementId> = tree
        .live_children(root)
        .into_iter()
        .filter(|child| !matches!(tree.get(*child).kind, ElementKind::Unparsed(_)))
        .collect();
    let index = declared
        .iter()
        .rposition(|child| {
            let element = tree.get(*child);
            element.is_block() && LEADING_BLOCKS.contains(&element.name.as_str())
        })
        .map_or(0, |position| position + 1);
    let kind = tree.holder_kind(root).child_kind("plugins");
    let block = tree.new_block("plugins", kind);
    tree.add_new_element_at(root, index, block)?;
    Ok(block)
}

fn is_apply_map(name: &str, kind: &ElementKind) -> bool {
    name == "apply" && matches!(kind, ElementKind::Map(_))
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern.captures(text).and_then(|captures| captures.get(1)).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DslContext;
    use crate::parser::DslParser;
    use crate::sync::DocumentSynchronizer;
    use r_droid_editor::TextBuffer;

    fn apply(tree: &DslTree, text: &str) -> String {
        let edits = DocumentSynchronizer::new(tree, text).compute().unwrap();
        let mut buffer = TextBuffer::from_str(text);
        DocumentSynchronizer::apply(&mut buffer, &edits, tree.context()).unwrap();
        buffer.text()
    }

    fn plugins(tree: &mut DslTree) -> PluginsModel<'_> {
        let root = tree.root();
        PluginsModel::new(tree, root)
    }

    #[test]
    fn test_read_plugins_block() {
        let text = "plugins {\n    id 'com.android.application'\n    id 'org.jetbrains.kotlin.android' version '1.9.0' apply false\n    java\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        assert_eq!(
            plugins(&mut tree).plugins(),
            vec!["com.android.application", "org.jetbrains.kotlin.android", "java"]
        );
    }

    #[test]
    fn test_read_kotlin_plugins() {
        let text = "plugins {\n    id(\"com.android.library\")\n    kotlin(\"android\")\n    `kotlin-dsl`\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::new(GradleDialect::Kotlin)).unwrap();
        assert_eq!(
            plugins(&mut tree).plugins(),
            vec!["com.android.library", "org.jetbrains.kotlin.android", "kotlin-dsl"]
        );
    }

    #[test]
    fn test_read_legacy_apply() {
        let text = "apply plugin: 'com.android.application'\napply plugin: 'kotlin-android'\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        let model = plugins(&mut tree);
        assert!(model.has_plugin("kotlin-android"));
        assert_eq!(model.plugins().len(), 2);
    }

    #[test]
    fn test_apply_plugin_into_block() {
        let text = "plugins {\n    id 'com.android.application'\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        let mut model = plugins(&mut tree);
        assert!(model.apply_plugin("kotlin-parcelize").unwrap());
        assert!(!model.apply_plugin("kotlin-parcelize").unwrap());
        assert_eq!(
            apply(&tree, text),
            "plugins {\n    id 'com.android.application'\n    id 'kotlin-parcelize'\n}\n"
        );
    }

    #[test]
    fn test_apply_plugin_kotlin_call_syntax() {
        let text = "plugins {\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::new(GradleDialect::Kotlin)).unwrap();
        plugins(&mut tree).apply_plugin("com.android.library").unwrap();
        assert_eq!(apply(&tree, text), "plugins {\n    id(\"com.android.library\")\n}\n");
    }

    #[test]
    fn test_new_plugins_block_goes_first() {
        let text = "android {\n    compileSdk = 34\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::new(GradleDialect::Kotlin)).unwrap();
        plugins(&mut tree).apply_plugin("com.android.application").unwrap();
        assert_eq!(
            apply(&tree, text),
            "plugins {\n    id(\"com.android.application\")\n}\nandroid {\n    compileSdk = 34\n}\n"
        );
    }

    #[test]
    fn test_new_plugins_block_follows_buildscript() {
        let text = "buildscript {\n    repositories {\n        google()\n    }\n}\n\nandroid {\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        plugins(&mut tree).apply_plugin("com.android.library").unwrap();
        assert_eq!(
            apply(&tree, text),
            "buildscript {\n    repositories {\n        google()\n    }\n}\nplugins {\n    id 'com.android.library'\n}\n\nandroid {\n}\n"
        );
    }

    #[test]
    fn test_apply_plugin_follows_legacy_style() {
        let text = "apply plugin: 'com.android.application'\n\nandroid {\n}\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        plugins(&mut tree).apply_plugin("kotlin-android").unwrap();
        assert_eq!(
            apply(&tree, text),
            "apply plugin: 'com.android.application'\napply plugin: 'kotlin-android'\n\nandroid {\n}\n"
        );
    }

    #[test]
    fn test_remove_plugin() {
        let text = "plugins {\n    id 'com.android.application'\n    id 'kotlin-kapt' version '1.9.0'\n}\napply plugin: 'kotlin-kapt'\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        let mut model = plugins(&mut tree);
        assert!(model.remove_plugin("kotlin-kapt"));
        assert!(!model.remove_plugin("kotlin-kapt"));
        assert_eq!(model.plugins(), vec!["com.android.application"]);
        assert_eq!(apply(&tree, text), "plugins {\n    id 'com.android.application'\n}\n");
    }
}
