//! Settings script modules
//!
//! `settings.gradle(.kts)` lists the modules of a build with `include`
//! calls at the top level. Every `include` statement feeds one list, so
//! adding, removing and replacing modules goes through the list operations
//! of [`PropertyModel`].

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::element::{ElementId, ElementKind};
use crate::property::{PropertyError, PropertyModel};
use crate::resolve::ValueResolver;
use crate::value::DslExpr;

/// `project(':lib').projectDir = new File(rootDir, 'libs/lib')`, `project(":lib").projectDir = file("libs/lib")`
static PROJECT_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*project\s*\(\s*["']([^"']+)["']\s*\)\s*\.projectDir\s*=\s*(?:new\s+)?(?:File\s*\(\s*(?:rootDir|settingsDir|rootProject\.projectDir)\s*,\s*|file\s*\(\s*)["']([^"']+)["']\s*\)"#,
    )
    .expect("valid regex")
});

const ROOT_MODULE: &str = ":";

typed_block!(
    /// Modules of a settings file; wraps the root element
    SettingsModel
);

impl SettingsModel<'_> {
    /// Module paths in declaration order, starting with the root module `:`
    pub fn module_paths(&self) -> Vec<String> {
        let mut paths = vec![ROOT_MODULE.to_string()];
        for (_, path) in self.included() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    pub fn has_module(&self, path: &str) -> bool {
        self.module_paths().contains(&module_path(path))
    }

    /// Include a module; returns `false` when it is already included
    pub fn add_module_path(&mut self, path: &str) -> Result<bool, PropertyError> {
        let path = module_path(path);
        if self.has_module(&path) {
            return Ok(false);
        }
        self.include().add_to_list(path.as_str())?;
        debug!("Included module {}", path);
        Ok(true)
    }

    /// Drop every inclusion of a module; returns whether any existed
    pub fn remove_module_path(&mut self, path: &str) -> bool {
        let path = module_path(path);
        let doomed: Vec<ElementId> =
            self.included().into_iter().filter(|(_, included)| *included == path).map(|(item, _)| item).collect();
        let tree = self.tree_mut();
        for item in &doomed {
            tree.remove_element(*item);
        }
        !doomed.is_empty()
    }

    /// Rename an included module in place; returns whether it was included
    pub fn replace_module_path(&mut self, old: &str, new: &str) -> bool {
        let old = module_path(old);
        let new = module_path(new);
        let items: Vec<ElementId> =
            self.included().into_iter().filter(|(_, included)| *included == old).map(|(item, _)| item).collect();
        let tree = self.tree_mut();
        for item in &items {
            tree.set_expr(*item, DslExpr::from(new.as_str()));
        }
        !items.is_empty()
    }

    /// Directory of a module relative to the directory of the settings file
    ///
    /// A `projectDir` override wins; otherwise a module lives in a directory
    /// named after it inside its parent's directory.
    pub fn module_directory(&self, path: &str) -> PathBuf {
        let path = module_path(path);
        if path == ROOT_MODULE {
            return PathBuf::new();
        }
        if let Some(directory) = self.directory_overrides().into_iter().rev().find(|(module, _)| *module == path) {
            return directory.1;
        }
        let (parent, name) = path.rsplit_once(':').unwrap_or((ROOT_MODULE, path.as_str()));
        let parent = if parent.is_empty() { ROOT_MODULE } else { parent };
        self.module_directory(parent).join(name)
    }

    /// Included module whose directory is `directory`
    pub fn module_with_directory(&self, directory: impl AsRef<Path>) -> Option<String> {
        let directory = directory.as_ref();
        self.module_paths().into_iter().find(|path| self.module_directory(path) == directory)
    }

    /// Closest included ancestor of a module, the root module when there is none
    pub fn parent_module(&self, path: &str) -> Option<String> {
        let path = module_path(path);
        if path == ROOT_MODULE {
            return None;
        }
        let modules = self.module_paths();
        let segments: Vec<&str> = path.trim_start_matches(':').split(':').collect();
        (1..segments.len())
            .rev()
            .map(|end| format!(":{}", segments[..end].join(":")))
            .find(|candidate| modules.contains(candidate))
            .or_else(|| Some(ROOT_MODULE.to_string()))
    }

    fn include(&mut self) -> PropertyModel<'_> {
        self.property("include")
    }

    /// List item and normalized module path of every `include` argument
    fn included(&self) -> Vec<(ElementId, String)> {
        let tree = self.tree();
        let Some(list) = tree.find_property(self.id(), "include") else { return Vec::new() };
        let resolver = ValueResolver::new(tree);
        let items = match &tree.get(list).kind {
            ElementKind::List(_) => tree.live_children(list),
            _ => vec![list],
        };
        items
            .into_iter()
            .filter_map(|item| resolver.resolve(item).as_str().map(|path| (item, module_path(path))))
            .collect()
    }

    /// Module paths with a `projectDir` set, and the directory they name
    fn directory_overrides(&self) -> Vec<(String, PathBuf)> {
        let tree = self.tree();
        tree.live_children(self.id())
            .into_iter()
            .filter_map(|child| match &tree.get(child).kind {
                ElementKind::Unparsed(text) => PROJECT_DIR.captures(text),
                _ => None,
            })
            .filter_map(|captures| Some((module_path(captures.get(1)?.as_str()), PathBuf::from(captures.get(2)?.as_str()))))
            .collect()
    }
}

/// `lib:sub` and `:lib:sub` name the same module
pub fn module_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with(':') {
        path.to_string()
    } else {
        format!(":{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DslContext;
    use crate::parser::DslParser;
    use crate::sync::DocumentSynchronizer;
    use crate::tree::DslTree;
    use r_droid_core::GradleDialect;
    use r_droid_editor::TextBuffer;

    const SETTINGS: &str = "include ':app'\ninclude 'lib', ':lib:subLib'\n";

    fn apply(tree: &DslTree, text: &str) -> String {
        let edits = DocumentSynchronizer::new(tree, text).compute().unwrap();
        let mut buffer = TextBuffer::from_str(text);
        DocumentSynchronizer::apply(&mut buffer, &edits, tree.context()).unwrap();
        buffer.text()
    }

    fn settings(tree: &mut DslTree) -> SettingsModel<'_> {
        let root = tree.root();
        SettingsModel::new(tree, root)
    }

    #[test]
    fn test_module_paths() {
        let mut tree = DslParser::parse_string(SETTINGS, DslContext::default()).unwrap();
        let model = settings(&mut tree);
        assert_eq!(model.module_paths(), vec![":", ":app", ":lib", ":lib:subLib"]);
        assert!(model.has_module("lib:subLib"));
        assert!(!model.has_module(":other"));
    }

    #[test]
    fn test_kotlin_module_paths() {
        let text = "rootProject.name = \"demo\"\ninclude(\":app\", \":app.ext\")\n";
        let mut tree = DslParser::parse_string(text, DslContext::new(GradleDialect::Kotlin)).unwrap();
        assert_eq!(settings(&mut tree).module_paths(), vec![":", ":app", ":app.ext"]);
    }

    #[test]
    fn test_add_module_path() {
        let mut tree = DslParser::parse_string(SETTINGS, DslContext::default()).unwrap();
        let mut model = settings(&mut tree);
        assert!(model.add_module_path("lib1").unwrap());
        assert!(!model.add_module_path(":lib1").unwrap());
        assert_eq!(model.module_paths(), vec![":", ":app", ":lib", ":lib:subLib", ":lib1"]);
        assert_eq!(apply(&tree, SETTINGS), "include ':app'\ninclude 'lib', ':lib:subLib', ':lib1'\n");
    }

    #[test]
    fn test_add_module_path_to_empty_settings() {
        let text = "rootProject.name = \"demo\"\n";
        let mut tree = DslParser::parse_string(text, DslContext::new(GradleDialect::Kotlin)).unwrap();
        settings(&mut tree).add_module_path(":app").unwrap();
        assert_eq!(apply(&tree, text), "rootProject.name = \"demo\"\ninclude(\":app\")\n");
    }

    #[test]
    fn test_remove_module_path() {
        let mut tree = DslParser::parse_string(SETTINGS, DslContext::default()).unwrap();
        let mut model = settings(&mut tree);
        assert!(model.remove_module_path(":app"));
        assert!(model.remove_module_path("lib"));
        assert!(!model.remove_module_path("lib"));
        assert_eq!(model.module_paths(), vec![":", ":lib:subLib"]);
        assert_eq!(apply(&tree, SETTINGS), "include ':lib:subLib'\n");
    }

    #[test]
    fn test_replace_module_path() {
        let mut tree = DslParser::parse_string(SETTINGS, DslContext::default()).unwrap();
        let mut model = settings(&mut tree);
        assert!(model.replace_module_path("lib", "lib1"));
        assert!(!model.replace_module_path("missing", "lib2"));
        assert_eq!(model.module_paths(), vec![":", ":app", ":lib1", ":lib:subLib"]);
        assert_eq!(apply(&tree, SETTINGS), "include ':app'\ninclude ':lib1', ':lib:subLib'\n");
    }

    #[test]
    fn test_module_directories() {
        let text = "include ':app', ':libs:mylibrary', ':olibs:mylibrary'\nproject(':libs:mylibrary').projectDir = new File(rootDir, 'xyz/mylibrary')\nproject(':olibs').projectDir = file('otherlibs')\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        let model = settings(&mut tree);
        assert_eq!(model.module_directory(":"), PathBuf::new());
        assert_eq!(model.module_directory("app"), PathBuf::from("app"));
        assert_eq!(model.module_directory(":libs:mylibrary"), PathBuf::from("xyz/mylibrary"));
        assert_eq!(model.module_directory(":olibs:mylibrary"), PathBuf::from("otherlibs/mylibrary"));
        assert_eq!(model.module_with_directory("xyz/mylibrary").as_deref(), Some(":libs:mylibrary"));
        assert_eq!(model.module_with_directory("nowhere"), None);
    }

    #[test]
    fn test_parent_module() {
        let text = "include ':libs', ':libs:mylibrary', ':notamodule:deepmodule'\n";
        let mut tree = DslParser::parse_string(text, DslContext::default()).unwrap();
        let model = settings(&mut tree);
        assert_eq!(model.parent_module("libs:mylibrary").as_deref(), Some(":libs"));
        assert_eq!(model.parent_module(":notamodule:deepmodule").as_deref(), Some(":"));
        assert_eq!(model.parent_module(":"), None);
    }
}
