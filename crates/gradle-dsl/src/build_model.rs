//! Build Model
//!
//! [`GradleBuildModel`] owns one build script: the document text in a
//! [`TextBuffer`] and the element graph parsed from it. Typed views borrow
//! the model mutably; [`GradleBuildModel::apply_changes`] writes whatever
//! they changed back into the text.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use r_droid_core::{DslConfig, Event, EventSubscription, GradleDialect};
use r_droid_editor::TextBuffer;

use crate::blocks::{
    AndroidModel, BlockModel, DependenciesModel, ExtModel, JavaApplicationModel, PluginsModel, SettingsModel,
};
use crate::context::DslContext;
use crate::parser::DslParser;
use crate::property::PropertyModel;
use crate::resolve::ValueResolver;
use crate::sync::DocumentSynchronizer;
use crate::tree::DslTree;
use crate::value::ResolvedValue;
use crate::DslError;

/// Block names that hold a JVM application, in lookup order
const JVM_APPLICATION_BLOCKS: &[&str] = &["javaApplication", "javaLibrary", "application"];

/// A parsed build script and its pending changes
pub struct GradleBuildModel {
    buffer: TextBuffer,
    tree: DslTree,
}

impl GradleBuildModel {
    /// Build a model from script text
    pub fn parse(text: &str, context: DslContext) -> Result<Self, DslError> {
        let tree = DslParser::parse_string(text, context)?;
        Ok(Self { buffer: TextBuffer::from_str(text), tree })
    }

    /// Load a build file, picking the dialect from its name
    pub async fn load(path: impl AsRef<Path>, config: DslConfig) -> Result<Self, DslError> {
        let path = path.as_ref();
        let dialect = GradleDialect::from_path(path).unwrap_or(config.default_dialect);
        Self::load_with_context(path, DslContext::new(dialect).with_config(config)).await
    }

    pub async fn load_with_context(path: impl AsRef<Path>, context: DslContext) -> Result<Self, DslError> {
        let path = path.as_ref();
        let (text, tree) = DslParser::parse_file(path, context).await?;
        let mut buffer = TextBuffer::from_str(&text);
        buffer.set_path(path.to_path_buf());
        info!("Loaded {} build file {:?}", tree.dialect().as_str(), path);
        tree.context().events.emit(Event::DocumentLoaded(path.to_path_buf()));
        Ok(Self { buffer, tree })
    }

    /// Apply pending changes and write the document to its file
    pub async fn save(&mut self) -> Result<(), DslError> {
        self.apply_changes()?;
        self.buffer.save().await.map_err(|e| DslError::Save(e.to_string()))?;
        if let Some(path) = self.buffer.path().cloned() {
            info!("Saved build file {:?}", path);
            self.emit(Event::DocumentSaved(path));
        }
        Ok(())
    }

    pub async fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), DslError> {
        let path = path.into();
        self.apply_changes()?;
        self.buffer.save_as(path.clone()).await.map_err(|e| DslError::Save(e.to_string()))?;
        info!("Saved build file {:?}", path);
        self.emit(Event::DocumentSaved(path));
        Ok(())
    }

    /// Current document text; pending model changes are not included
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn dialect(&self) -> GradleDialect {
        self.tree.dialect()
    }

    pub fn context(&self) -> &DslContext {
        self.tree.context()
    }

    pub fn tree(&self) -> &DslTree {
        &self.tree
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.buffer.path()
    }

    /// Whether the model holds changes not yet written to the text
    pub fn is_modified(&self) -> bool {
        self.tree.is_modified()
    }

    /// Write every pending change into the document in one transaction
    ///
    /// Returns the number of text edits. On failure the document and the
    /// model are left exactly as they were.
    pub fn apply_changes(&mut self) -> Result<usize, DslError> {
        if !self.tree.is_modified() {
            return Ok(0);
        }
        let text = self.buffer.text();
        let applied = DocumentSynchronizer::new(&self.tree, &text).compute().and_then(|edits| {
            DocumentSynchronizer::apply(&mut self.buffer, &edits, self.tree.context()).map(|tree| (edits.len(), tree))
        });
        match applied {
            Ok((count, tree)) => {
                self.tree = tree;
                debug!("Applied {} edits", count);
                self.emit(Event::ChangesApplied { edits: count });
                Ok(count)
            }
            Err(e) => {
                warn!("Rolled back build file changes: {}", e);
                self.emit(Event::ChangesRolledBack { reason: e.to_string() });
                Err(e.into())
            }
        }
    }

    /// Drop pending changes by re-reading the document
    pub fn reset_changes(&mut self) -> Result<(), DslError> {
        self.tree = DslParser::parse_string(&self.buffer.text(), self.tree.context().clone())?;
        Ok(())
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.tree.context().events.subscribe()
    }

    /// Property at a dotted path such as `android.defaultConfig.minSdk`
    pub fn property(&mut self, path: &str) -> PropertyModel<'_> {
        let (holder, name) = self.tree.resolve_path(path);
        PropertyModel::new(&mut self.tree, holder, &name)
    }

    /// Block at a dotted path, created empty when absent
    pub fn block(&mut self, path: &str) -> BlockModel<'_> {
        let root = self.tree.root();
        let id = path
            .split('.')
            .filter(|part| !part.is_empty())
            .fold(root, |holder, part| self.tree.ensure_block(holder, part));
        BlockModel::new(&mut self.tree, id)
    }

    pub fn plugins(&mut self) -> PluginsModel<'_> {
        let root = self.tree.root();
        PluginsModel::new(&mut self.tree, root)
    }

    pub fn android(&mut self) -> AndroidModel<'_> {
        let id = self.tree.ensure_block(self.tree.root(), "android");
        AndroidModel::new(&mut self.tree, id)
    }

    /// The declared JVM application block, or a new one for the dialect
    pub fn java_application(&mut self) -> JavaApplicationModel<'_> {
        let root = self.tree.root();
        let id = match JVM_APPLICATION_BLOCKS.iter().find_map(|name| self.tree.find_block(root, name)) {
            Some(id) => id,
            None if self.tree.dialect() == GradleDialect::Declarative => self.tree.ensure_block(root, "javaApplication"),
            None => self.tree.ensure_block(root, "application"),
        };
        JavaApplicationModel::new(&mut self.tree, id)
    }

    /// Module list of a `settings.gradle(.kts)` script
    pub fn settings(&mut self) -> SettingsModel<'_> {
        let root = self.tree.root();
        SettingsModel::new(&mut self.tree, root)
    }

    pub fn dependencies(&mut self) -> DependenciesModel<'_> {
        let id = self.tree.ensure_block(self.tree.root(), "dependencies");
        DependenciesModel::new(&mut self.tree, id)
    }

    pub fn ext(&mut self) -> ExtModel<'_> {
        let id = self.tree.ensure_block(self.tree.root(), "ext");
        ExtModel::new(&mut self.tree, id)
    }

    /// Every property of the script with references resolved
    pub fn snapshot(&self) -> ResolvedValue {
        ValueResolver::new(&self.tree).resolve(self.tree.root())
    }

    fn emit(&self, event: Event) {
        self.tree.context().events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyError;

    const APP: &str = r#"plugins {
    id 'com.android.application'
}

// Application module
android {
    namespace 'com.example.app'
    compileSdk 34

    defaultConfig {
        applicationId "com.example.app"
        minSdk 24
        targetSdk 34
    }

    sourceSets {
        main {
            java {
                srcDir 'a'
                srcDirs = ['b', 'c']
            }
        }
    }
}

dependencies {
    implementation 'androidx.core:core-ktx:1.12.0'
}
"#;

    fn model(text: &str) -> GradleBuildModel {
        GradleBuildModel::parse(text, DslContext::default()).unwrap()
    }

    #[test]
    fn test_round_trip_without_changes() {
        let mut build = model(APP);
        assert_eq!(build.apply_changes().unwrap(), 0);
        assert_eq!(build.text(), APP);
    }

    #[test]
    fn test_set_then_read_back() {
        let mut build = model(APP);
        build.android().default_config().min_sdk().set_value(26).unwrap();
        build.android().namespace().set_value("com.example.other").unwrap();
        assert!(build.is_modified());
        assert!(build.apply_changes().unwrap() > 0);
        assert!(!build.is_modified());

        let text = build.text();
        assert!(text.contains("        minSdk 26\n"));
        assert!(text.contains("    namespace 'com.example.other'\n"));
        assert!(text.contains("// Application module\n"));
        assert_eq!(build.android().default_config().min_sdk().int_value(), Some(26));
    }

    #[test]
    fn test_src_dirs_across_spellings() {
        let mut build = model(APP);
        let mut android = build.android();
        let mut main = android.source_set("main");
        assert_eq!(main.java().src_dirs().value().strings(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ext_property_rendered_with_assignment() {
        let mut build = model(APP);
        build.ext().find_property("kotlinVersion").set_value("1.9.0").unwrap();
        build.apply_changes().unwrap();
        assert!(build.text().contains("ext {\n    kotlinVersion = '1.9.0'\n}\n"));
    }

    #[test]
    fn test_new_properties_inserted_in_order() {
        let mut build = model(APP);
        {
            let mut android = build.android();
            let mut config = android.default_config();
            config.version_code().set_value(3).unwrap();
            config.version_name().set_value("1.2").unwrap();
        }
        build.apply_changes().unwrap();
        assert!(build.text().contains(
            "        targetSdk 34\n        versionCode 3\n        versionName '1.2'\n    }\n"
        ));
    }

    #[test]
    fn test_dotted_assignment_read_through_block() {
        let mut build = model("android.compileSdk = 33\nandroid.namespace = 'x'\n");
        assert_eq!(build.android().compile_sdk().int_value(), Some(33));
        assert_eq!(build.property("android.namespace").string_value().as_deref(), Some("x"));
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let mut build = model(APP);
        let err = build.property("android.sourceSets.main.java.srcDirs").set_value("d").unwrap_err();
        assert!(matches!(err, PropertyError::KindMismatch { .. }));
        let err = build.android().compile_sdk().add_to_list(1).unwrap_err();
        assert!(matches!(err, PropertyError::KindMismatch { .. }));
    }

    #[test]
    fn test_reset_discards_pending_changes() {
        let mut build = model(APP);
        build.dependencies().add_artifact("implementation", "a:b:1");
        build.reset_changes().unwrap();
        assert!(!build.is_modified());
        assert_eq!(build.apply_changes().unwrap(), 0);
        assert_eq!(build.text(), APP);
    }

    #[test]
    fn test_events_for_applied_changes() {
        let mut build = model(APP);
        let events = build.subscribe();
        build.android().compile_sdk().set_value(35).unwrap();
        let edits = build.apply_changes().unwrap();
        let received = events.drain();
        assert!(received.contains(&Event::ChangesApplied { edits }));
    }

    #[test]
    fn test_java_application_block_per_dialect() {
        let mut declarative = GradleBuildModel::parse("", DslContext::new(GradleDialect::Declarative)).unwrap();
        declarative.java_application().main_class().set_value("com.example.App").unwrap();
        declarative.apply_changes().unwrap();
        assert_eq!(declarative.text(), "javaApplication {\n    mainClass = \"com.example.App\"\n}\n");

        let mut groovy = model("");
        groovy.java_application().main_class().set_value("com.example.App").unwrap();
        groovy.apply_changes().unwrap();
        assert!(groovy.text().starts_with("application {\n"));
    }

    #[test]
    fn test_snapshot() {
        let mut build = model(APP);
        let snapshot = build.snapshot();
        let ResolvedValue::Map(root) = snapshot else { panic!("root resolves to a map") };
        let android = root.get("android").unwrap();
        let ResolvedValue::Map(android) = android else { panic!("android resolves to a map") };
        assert_eq!(android.get("compileSdk").and_then(ResolvedValue::as_i64), Some(34));
        assert!(build.plugins().has_plugin("com.android.application"));
    }

    #[tokio::test]
    async fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.gradle.kts");
        tokio::fs::write(&path, "android {\n    compileSdk = 33\n}\n").await.unwrap();

        let mut build = GradleBuildModel::load(&path, DslConfig::default()).await.unwrap();
        assert_eq!(build.dialect(), GradleDialect::Kotlin);
        let events = build.subscribe();
        build.android().compile_sdk().set_value(34).unwrap();
        build.save().await.unwrap();

        let saved = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(saved, "android {\n    compileSdk = 34\n}\n");
        assert!(events.drain().contains(&Event::DocumentSaved(path.clone())));
    }

    #[test]
    fn test_insert_after_emptied_proguard_call() {
        let mut build = model("android {\n    defaultConfig {\n        proguardFile 'a'\n    }\n}\n");
        let mut android = build.android();
        let mut default_config = android.default_config();
        assert!(default_config.proguard_files().remove_from_list("a").unwrap());
        default_config.min_sdk().set_value(21).unwrap();
        build.apply_changes().unwrap();
        assert_eq!(build.text(), "android {\n    defaultConfig {\n        minSdk 21\n    }\n}\n");
    }

    #[tokio::test]
    async fn test_settings_modules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.gradle.kts");
        tokio::fs::write(&path, "rootProject.name = \"demo\"\ninclude(\":app\")\n").await.unwrap();

        let mut settings = GradleBuildModel::load(&path, DslConfig::default()).await.unwrap();
        assert_eq!(settings.settings().module_paths(), vec![":", ":app"]);
        assert!(settings.settings().add_module_path("core:data").unwrap());
        assert!(settings.settings().replace_module_path("app", "mobile"));
        settings.save().await.unwrap();

        let saved = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(saved, "rootProject.name = \"demo\"\ninclude(\":mobile\", \":core:data\")\n");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = GradleBuildModel::load(dir.path().join("build.gradle"), DslConfig::default()).await;
        assert!(matches!(result, Err(DslError::Parse(_))));
    }
}
