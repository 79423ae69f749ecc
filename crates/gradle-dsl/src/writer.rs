//! Text Rendering
//!
//! Renders values and statements for the document synchronizer in the
//! tree's dialect. Items that were parsed and never touched are copied from
//! the original text so their formatting survives.

use r_droid_core::{GradleDialect, QuoteStyle};

use crate::description::BlockKind;
use crate::element::{ElementId, ElementKind, ElementState, PropertyType};
use crate::names::Arity;
use crate::tree::DslTree;
use crate::value::{DslExpr, LiteralValue};

/// Named-container children Kotlin scripts reach with `getByName`
const PREDEFINED_CHILDREN: &[&str] = &["release", "debug", "main", "test", "androidTest"];

/// Renders elements of one tree
pub struct DslWriter<'a> {
    tree: &'a DslTree,
    text: &'a str,
}

impl<'a> DslWriter<'a> {
    pub fn new(tree: &'a DslTree, text: &'a str) -> Self {
        Self { tree, text }
    }

    fn dialect(&self) -> GradleDialect {
        self.tree.dialect()
    }

    fn original(&self, span: &std::ops::Range<usize>) -> Option<&'a str> {
        self.text.get(span.clone())
    }

    /// String literal in the dialect's quoting
    pub fn quote(&self, value: &str) -> String {
        let quote = match self.dialect() {
            GradleDialect::Groovy => self.tree.context().config.groovy_quote,
            GradleDialect::Kotlin | GradleDialect::Declarative => QuoteStyle::Double,
        };
        let delimiter = quote.as_char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(delimiter);
        for c in value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '$' if quote == QuoteStyle::Double => out.push_str("\\$"),
                c if c == delimiter => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push(delimiter);
        out
    }

    pub fn expr(&self, expr: &DslExpr) -> String {
        match expr {
            DslExpr::Literal(LiteralValue::String(value)) => self.quote(value),
            DslExpr::Literal(LiteralValue::Integer(value)) => value.to_string(),
            DslExpr::Literal(LiteralValue::Decimal(value)) => {
                let mut text = value.to_string();
                if !text.contains(['.', 'e', 'E', 'N', 'n']) {
                    text.push_str(".0");
                }
                text
            }
            DslExpr::Literal(LiteralValue::Boolean(value)) => value.to_string(),
            DslExpr::Interpolated(raw) => format!("\"{}\"", raw),
            DslExpr::Reference(text) | DslExpr::Unknown(text) => text.clone(),
        }
    }

    fn untouched(&self, id: ElementId) -> bool {
        let element = self.tree.get(id);
        element.state == ElementState::Existing && !element.renamed && !element.replaced
    }

    /// One list item
    pub fn item(&self, id: ElementId) -> String {
        if self.untouched(id) {
            let original = self.tree.get(id).spans.as_ref().and_then(|spans| spans.value.as_ref());
            if let Some(text) = original.and_then(|span| self.original(span)) {
                return text.to_string();
            }
        }
        self.value(id)
    }

    /// One map entry, key included
    pub fn entry(&self, id: ElementId) -> String {
        if self.untouched(id) {
            if let Some(text) = self.tree.get(id).spans.as_ref().and_then(|spans| self.original(&spans.statement)) {
                return text.to_string();
            }
        }
        let key = &self.tree.get(id).name;
        let value = self.value(id);
        match self.dialect() {
            GradleDialect::Groovy if is_identifier(key) => format!("{}: {}", key, value),
            GradleDialect::Groovy => format!("{}: {}", self.quote(key), value),
            GradleDialect::Kotlin | GradleDialect::Declarative => format!("{} to {}", self.quote(key), value),
        }
    }

    pub fn items(&self, ids: &[ElementId]) -> String {
        ids.iter().map(|id| self.item(*id)).collect::<Vec<_>>().join(", ")
    }

    pub fn entries(&self, ids: &[ElementId]) -> String {
        ids.iter().map(|id| self.entry(*id)).collect::<Vec<_>>().join(", ")
    }

    pub fn list_literal(&self, inner: &str) -> String {
        match self.dialect() {
            GradleDialect::Groovy => format!("[{}]", inner),
            GradleDialect::Kotlin | GradleDialect::Declarative => format!("listOf({})", inner),
        }
    }

    pub fn map_literal(&self, inner: &str) -> String {
        match self.dialect() {
            GradleDialect::Groovy if inner.is_empty() => "[:]".to_string(),
            GradleDialect::Groovy => format!("[{}]", inner),
            GradleDialect::Kotlin | GradleDialect::Declarative => format!("mapOf({})", inner),
        }
    }

    /// Whole value of an element as an expression
    pub fn value(&self, id: ElementId) -> String {
        let element = self.tree.get(id);
        match &element.kind {
            ElementKind::Expression(expr) => self.expr(expr),
            ElementKind::List(_) => self.list_literal(&self.items(&self.tree.live_children(id))),
            ElementKind::Map(_) => self.map_literal(&self.entries(&self.tree.live_children(id))),
            ElementKind::Block(_) | ElementKind::Unparsed(_) => String::new(),
        }
    }

    /// Spelling used to write a property name
    pub fn property_name(&self, id: ElementId) -> String {
        let element = self.tree.get(id);
        let holder = element.parent.map(|parent| self.tree.holder_kind(parent)).unwrap_or(BlockKind::Generic);
        let resolver = self.tree.resolver();
        let spelling = element
            .external_name
            .clone()
            .unwrap_or_else(|| resolver.external_name(holder, &element.name, self.dialect()));
        let several = matches!(element.kind, ElementKind::List(_)) && self.tree.live_children(id).len() > 1;
        if several && resolver.resolve(holder, &spelling).arity == Arity::Single {
            if let Some(vararg) = resolver.vararg_spelling(holder, &element.name) {
                return vararg.to_string();
            }
        }
        spelling
    }

    /// Kotlin writes `ext` properties as `extra["name"]`
    pub fn writes_as_extra(&self, id: ElementId) -> bool {
        let element = self.tree.get(id);
        self.dialect() == GradleDialect::Kotlin
            && element.property_type == PropertyType::Regular
            && !element.is_block()
            && element.parent.and_then(|parent| self.tree.block_kind(parent)) == Some(BlockKind::Ext)
    }

    /// Statement declaring a new element, `prefix` naming its virtual parents
    pub fn statement(&self, id: ElementId, prefix: &str, indent: &str) -> String {
        let element = self.tree.get(id);
        if element.is_block() {
            return self.block_statement(id, prefix, indent);
        }
        if self.writes_as_extra(id) {
            return format!("{}extra[{}] = {}", prefix, self.quote(&element.name), self.value(id));
        }
        let name = format!("{}{}", prefix, self.property_name(id));
        if element.property_type == PropertyType::Variable {
            let keyword = match self.dialect() {
                GradleDialect::Groovy => "def",
                GradleDialect::Kotlin | GradleDialect::Declarative => "val",
            };
            return format!("{} {} = {}", keyword, element.name, self.value(id));
        }

        let kotlin = self.dialect() != GradleDialect::Groovy;
        match &element.kind {
            _ if element.use_assignment => format!("{} = {}", name, self.value(id)),
            ElementKind::Expression(DslExpr::Unknown(text)) if text.is_empty() => format!("{}()", name),
            ElementKind::Expression(_) if kotlin => format!("{}({})", name, self.value(id)),
            ElementKind::Expression(_) => format!("{} {}", name, self.value(id)),
            ElementKind::List(_) | ElementKind::Map(_) if self.tree.live_children(id).is_empty() => {
                format!("{} = {}", name, self.value(id))
            }
            ElementKind::List(_) if kotlin => format!("{}({})", name, self.items(&self.tree.live_children(id))),
            ElementKind::List(_) => format!("{} {}", name, self.items(&self.tree.live_children(id))),
            ElementKind::Map(_) if kotlin => format!("{}({})", name, self.value(id)),
            ElementKind::Map(_) => format!("{} {}", name, self.entries(&self.tree.live_children(id))),
            ElementKind::Block(_) | ElementKind::Unparsed(_) => String::new(),
        }
    }

    fn block_statement(&self, id: ElementId, prefix: &str, indent: &str) -> String {
        let element = self.tree.get(id);
        let children: Vec<ElementId> = self
            .tree
            .live_children(id)
            .into_iter()
            .filter(|child| self.tree.is_significant(*child))
            .collect();

        // Kotlin has no ext block; its properties go straight into the holder
        if self.dialect() == GradleDialect::Kotlin && self.tree.block_kind(id) == Some(BlockKind::Ext) {
            return children
                .iter()
                .map(|child| self.statement(*child, prefix, indent))
                .collect::<Vec<_>>()
                .join(&format!("\n{}", indent));
        }

        let name = element.external_name.clone().unwrap_or_else(|| element.name.clone());
        let in_container = element
            .parent
            .and_then(|parent| self.tree.block_kind(parent))
            .is_some_and(|kind| kind.is_named_container());
        let header = if in_container && self.dialect() == GradleDialect::Kotlin {
            let factory = if PREDEFINED_CHILDREN.contains(&element.name.as_str()) { "getByName" } else { "create" };
            format!("{}{}({})", prefix, factory, self.quote(&element.name))
        } else {
            format!("{}{}", prefix, name)
        };

        let inner = format!("{}{}", indent, self.tree.context().config.indent_unit());
        let mut out = format!("{} {{\n", header);
        for child in children {
            out.push_str(&inner);
            out.push_str(&self.statement(child, "", &inner));
            out.push('\n');
        }
        out.push_str(indent);
        out.push('}');
        out
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DslContext;
    use crate::parser::DslParser;
    use crate::property::PropertyModel;
    use r_droid_core::DslConfig;

    fn tree(text: &str, dialect: GradleDialect) -> DslTree {
        DslParser::parse_string(text, DslContext::new(dialect)).unwrap()
    }

    #[test]
    fn test_quoting() {
        let groovy = tree("", GradleDialect::Groovy);
        let writer = DslWriter::new(&groovy, "");
        assert_eq!(writer.quote("it's"), "'it\\'s'");
        assert_eq!(writer.quote("$x"), "'$x'");

        let kotlin = tree("", GradleDialect::Kotlin);
        let writer = DslWriter::new(&kotlin, "");
        assert_eq!(writer.quote("say \"hi\" $x"), "\"say \\\"hi\\\" \\$x\"");

        let mut config = DslConfig::default();
        config.groovy_quote = QuoteStyle::Double;
        let double = DslParser::parse_string("", DslContext::default().with_config(config)).unwrap();
        assert_eq!(DslWriter::new(&double, "").quote("a"), "\"a\"");
    }

    #[test]
    fn test_expressions() {
        let groovy = tree("", GradleDialect::Groovy);
        let writer = DslWriter::new(&groovy, "");
        assert_eq!(writer.expr(&DslExpr::from(2.0)), "2.0");
        assert_eq!(writer.expr(&DslExpr::from(1.5)), "1.5");
        assert_eq!(writer.expr(&DslExpr::from(true)), "true");
        assert_eq!(writer.expr(&DslExpr::reference("rootProject.ext.v")), "rootProject.ext.v");
        assert_eq!(writer.expr(&DslExpr::interpolated("v$x")), "\"v$x\"");
        assert_eq!(writer.map_literal(""), "[:]");
    }

    #[test]
    fn test_untouched_items_keep_text() {
        let text = "a {\n  l = [ \"x\" ,  'y' ]\n}";
        let tree = tree(text, GradleDialect::Groovy);
        let block = tree.find_block(tree.root(), "a").unwrap();
        let list = tree.find_property(block, "l").unwrap();
        let writer = DslWriter::new(&tree, text);
        assert_eq!(writer.items(&tree.live_children(list)), "\"x\", 'y'");
    }

    #[test]
    fn test_new_statements() {
        let mut groovy = tree("android {\n  compileSdk 33\n}", GradleDialect::Groovy);
        let android = groovy.find_block(groovy.root(), "android").unwrap();
        let namespace = groovy.new_literal("namespace", DslExpr::from("com.x"));
        groovy.set_new_element(android, namespace);
        let build_types = groovy.ensure_block(android, "buildTypes");
        let release = groovy.ensure_block(build_types, "release");
        let minify = groovy.new_literal("minifyEnabled", DslExpr::from(true));
        groovy.set_new_element(release, minify);

        let writer = DslWriter::new(&groovy, "");
        assert_eq!(writer.statement(namespace, "", "  "), "namespace 'com.x'");
        assert_eq!(
            writer.statement(build_types, "", ""),
            "buildTypes {\n    release {\n        minifyEnabled true\n    }\n}"
        );
        assert_eq!(writer.statement(minify, "android.buildTypes.release.", ""), "android.buildTypes.release.minifyEnabled true");
    }

    #[test]
    fn test_kotlin_statements() {
        let mut kotlin = tree("android {\n}", GradleDialect::Kotlin);
        let android = kotlin.find_block(kotlin.root(), "android").unwrap();
        let build_types = kotlin.ensure_block(android, "buildTypes");
        let release = kotlin.ensure_block(build_types, "release");
        let staging = kotlin.ensure_block(build_types, "staging");
        for block in [release, staging] {
            let minify = kotlin.new_literal("minifyEnabled", DslExpr::from(false));
            kotlin.set_new_element(block, minify);
        }
        let ext = kotlin.ensure_block(kotlin.root(), "ext");
        let version = kotlin.new_literal("kotlinVersion", DslExpr::from("1.9"));
        kotlin.set_new_element(ext, version);

        let writer = DslWriter::new(&kotlin, "");
        assert_eq!(
            writer.statement(build_types, "", ""),
            "buildTypes {\n    getByName(\"release\") {\n        isMinifyEnabled = false\n    }\n    create(\"staging\") {\n        isMinifyEnabled = false\n    }\n}"
        );
        assert_eq!(writer.statement(ext, "", ""), "extra[\"kotlinVersion\"] = \"1.9\"");
    }

    #[test]
    fn test_kotlin_augmenting_lists_written_as_calls() {
        let mut kotlin = tree("android {\n    defaultConfig {\n        minSdk = 21\n    }\n}", GradleDialect::Kotlin);
        let root = kotlin.root();
        let android = kotlin.find_block(root, "android").unwrap();
        let default_config = kotlin.find_block(android, "defaultConfig").unwrap();
        PropertyModel::new(&mut kotlin, default_config, "proguardFiles").add_to_list("a.pro").unwrap();
        let source_sets = kotlin.ensure_block(android, "sourceSets");
        let main = kotlin.ensure_block(source_sets, "main");
        let java = kotlin.ensure_block(main, "java");
        PropertyModel::new(&mut kotlin, java, "srcDirs").add_to_list("src/x").unwrap();
        let ext = kotlin.ensure_block(root, "ext");
        PropertyModel::new(&mut kotlin, ext, "dirs").add_to_list("x").unwrap();

        let proguard = kotlin.find_property(default_config, "proguardFiles").unwrap();
        let src_dirs = kotlin.find_property(java, "srcDirs").unwrap();
        let dirs = kotlin.find_property(ext, "dirs").unwrap();
        let writer = DslWriter::new(&kotlin, "");
        assert_eq!(writer.statement(proguard, "", ""), "proguardFiles(\"a.pro\")");
        assert_eq!(writer.statement(src_dirs, "", ""), "srcDirs(\"src/x\")");
        assert_eq!(writer.statement(dirs, "", ""), "extra[\"dirs\"] = listOf(\"x\")");
    }

    #[test]
    fn test_single_spelling_grows_to_vararg() {
        let mut groovy = tree("android {\n  sourceSets {\n    main {\n      java {\n      }\n    }\n  }\n}", GradleDialect::Groovy);
        let android = groovy.find_block(groovy.root(), "android").unwrap();
        let source_sets = groovy.find_block(android, "sourceSets").unwrap();
        let main = groovy.find_block(source_sets, "main").unwrap();
        let java = groovy.find_block(main, "java").unwrap();
        let list = groovy.new_list("srcDirs");
        groovy.get_mut(list).external_name = Some("srcDir".into());
        groovy.set_new_element(java, list);
        for dir in ["a", "b"] {
            let item = groovy.new_literal("", DslExpr::from(dir));
            let len = groovy.live_children(list).len();
            groovy.add_new_element_at(list, len, item).unwrap();
        }
        let writer = DslWriter::new(&groovy, "");
        assert_eq!(writer.statement(list, "", ""), "srcDirs 'a', 'b'");
    }
}
