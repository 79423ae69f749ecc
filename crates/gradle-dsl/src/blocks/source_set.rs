//! Source sets and their source directory blocks

use crate::property::{PropertyError, PropertyModel};
use crate::value::DslExpr;

typed_block!(
    /// One entry of `sourceSets`
    SourceSetModel
);

impl SourceSetModel<'_> {
    /// `root 'src/x'` or `setRoot("src/x")`
    pub fn root(&mut self) -> PropertyModel<'_> {
        self.property("root")
    }

    pub fn java(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("java")
    }

    pub fn kotlin(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("kotlin")
    }

    pub fn res(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("res")
    }

    pub fn assets(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("assets")
    }

    pub fn aidl(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("aidl")
    }

    pub fn jni_libs(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("jniLibs")
    }

    pub fn resources(&mut self) -> SourceDirectoryModel<'_> {
        self.directory("resources")
    }

    fn directory(&mut self, name: &str) -> SourceDirectoryModel<'_> {
        let id = self.child_block(name);
        SourceDirectoryModel::new(self.tree_mut(), id)
    }
}

typed_block!(
    /// `java { }`, `res { }` and the other directory blocks of a source set
    SourceDirectoryModel
);

impl SourceDirectoryModel<'_> {
    /// Every directory from `srcDir`, `srcDirs` and `setSrcDirs`, in order
    pub fn src_dirs(&mut self) -> PropertyModel<'_> {
        self.property("srcDirs")
    }

    pub fn includes(&mut self) -> PropertyModel<'_> {
        self.property("include")
    }

    pub fn excludes(&mut self) -> PropertyModel<'_> {
        self.property("exclude")
    }

    pub fn add_src_dir(&mut self, dir: impl Into<DslExpr>) -> Result<(), PropertyError> {
        self.src_dirs().add_to_list(dir)
    }

    pub fn remove_src_dir(&mut self, dir: impl Into<DslExpr>) -> Result<bool, PropertyError> {
        self.src_dirs().remove_from_list(dir)
    }

    pub fn remove_all_includes(&mut self) {
        self.includes().delete();
    }

    pub fn remove_all_excludes(&mut self) {
        self.excludes().delete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DslContext;
    use crate::parser::DslParser;
    use crate::sync::DocumentSynchronizer;
    use crate::tree::DslTree;
    use r_droid_editor::TextBuffer;

    fn source_set(tree: &mut DslTree) -> SourceSetModel<'_> {
        let android = tree.find_block(tree.root(), "android").unwrap();
        let source_sets = tree.find_block(android, "sourceSets").unwrap();
        let main = tree.find_block(source_sets, "main").unwrap();
        SourceSetModel::new(tree, main)
    }

    const BUILD: &str = "android {\n    sourceSets {\n        main {\n            java {\n                srcDir 'a'\n                srcDirs = ['b', 'c']\n                include '**/*.java'\n                include '**/*.kt'\n                exclude 'gen/**'\n            }\n            setRoot 'src/main'\n        }\n    }\n}\n";

    #[test]
    fn test_src_dirs_in_declaration_order() {
        let mut tree = DslParser::parse_string(BUILD, DslContext::default()).unwrap();
        let mut main = source_set(&mut tree);
        assert_eq!(main.root().string_value().as_deref(), Some("src/main"));
        let mut java = main.java();
        assert_eq!(java.src_dirs().value().strings(), vec!["a", "b", "c"]);
        assert_eq!(java.includes().value().strings(), vec!["**/*.java", "**/*.kt"]);
        assert_eq!(java.excludes().value().strings(), vec!["gen/**"]);
    }

    #[test]
    fn test_add_then_remove_src_dir() {
        let mut tree = DslParser::parse_string(BUILD, DslContext::default()).unwrap();
        let mut main = source_set(&mut tree);
        let mut java = main.java();
        java.add_src_dir("d").unwrap();
        assert_eq!(java.src_dirs().value().strings(), vec!["a", "b", "c", "d"]);
        assert!(java.remove_src_dir("d").unwrap());
        assert_eq!(java.src_dirs().value().strings(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_all_includes_is_idempotent() {
        let mut once = DslParser::parse_string(BUILD, DslContext::default()).unwrap();
        source_set(&mut once).java().remove_all_includes();

        let mut twice = DslParser::parse_string(BUILD, DslContext::default()).unwrap();
        {
            let mut main = source_set(&mut twice);
            let mut java = main.java();
            java.remove_all_includes();
            java.remove_all_includes();
            assert!(java.includes().value().is_absent());
            assert_eq!(java.excludes().value().strings(), vec!["gen/**"]);
        }

        let render = |tree: &DslTree| {
            let edits = DocumentSynchronizer::new(tree, BUILD).compute().unwrap();
            let mut buffer = TextBuffer::from_str(BUILD);
            DocumentSynchronizer::apply(&mut buffer, &edits, tree.context()).unwrap();
            buffer.text()
        };
        let expected = render(&once);
        assert_eq!(render(&twice), expected);
        assert!(!expected.contains("include"));
        assert!(expected.contains("exclude 'gen/**'"));
    }

    #[test]
    fn test_add_src_dir_to_empty_source_set() {
        let mut tree = DslParser::parse_string("android {\n    sourceSets {\n        main {\n        }\n    }\n}\n", DslContext::default()).unwrap();
        let mut main = source_set(&mut tree);
        main.kotlin().add_src_dir("src/main/kotlin").unwrap();
        assert_eq!(main.kotlin().src_dirs().value().strings(), vec!["src/main/kotlin"]);
    }
}
