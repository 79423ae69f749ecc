//! Value Resolution
//!
//! Follows variable and property references to the values they name.
//! Only declarations that appear before the use are visible, so a
//! reference to something declared later stays unresolved.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::element::{ElementId, ElementKind};
use crate::names::canonical_block_name;
use crate::tree::DslTree;
use crate::value::{DslExpr, ResolvedValue};

/// Longest reference chain followed before giving up
const MAX_DEPTH: usize = 32;

/// `${expr}` or `$name.path` inside a double-quoted string
static INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)").expect("valid regex")
});

/// One step of a reference path
#[derive(Debug, Clone, PartialEq)]
enum PathPart {
    Name(String),
    Index(usize),
    Key(String),
}

/// A reference made by a value and the element it names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDependency {
    pub reference: String,
    /// `None` when nothing visible from the value carries that name
    pub target: Option<ElementId>,
}

/// Resolves element values against one tree
pub struct ValueResolver<'a> {
    tree: &'a DslTree,
}

impl<'a> ValueResolver<'a> {
    pub fn new(tree: &'a DslTree) -> Self {
        Self { tree }
    }

    /// Value with references followed
    pub fn resolve(&self, id: ElementId) -> ResolvedValue {
        self.value(id, true, &mut Vec::new())
    }

    /// Value with references reported as written
    pub fn raw(&self, id: ElementId) -> ResolvedValue {
        self.value(id, false, &mut Vec::new())
    }

    fn value(&self, id: ElementId, follow: bool, visiting: &mut Vec<ElementId>) -> ResolvedValue {
        let element = self.tree.get(id);
        match &element.kind {
            ElementKind::Expression(expr) => self.expr(id, expr, follow, visiting),
            ElementKind::List(list) => ResolvedValue::List(
                list.items
                    .iter()
                    .filter(|item| self.tree.get(**item).is_live())
                    .map(|item| self.value(*item, follow, visiting))
                    .collect(),
            ),
            ElementKind::Map(map) => {
                let mut entries = IndexMap::new();
                for entry in map.entries.iter().filter(|e| self.tree.get(**e).is_live()) {
                    entries.insert(self.tree.get(*entry).name.clone(), self.value(*entry, follow, visiting));
                }
                ResolvedValue::Map(entries)
            }
            ElementKind::Block(_) => {
                let mut entries = IndexMap::new();
                for name in self.tree.property_names(id) {
                    let child = self.tree.find_property(id, &name).or_else(|| self.tree.find_variable(id, &name));
                    if let Some(child) = child {
                        entries.insert(name, self.value(child, follow, visiting));
                    }
                }
                ResolvedValue::Map(entries)
            }
            ElementKind::Unparsed(text) => ResolvedValue::Raw(text.clone()),
        }
    }

    fn expr(&self, context: ElementId, expr: &DslExpr, follow: bool, visiting: &mut Vec<ElementId>) -> ResolvedValue {
        match expr {
            DslExpr::Literal(literal) => ResolvedValue::Literal(literal.clone()),
            DslExpr::Reference(text) if follow => self.follow(context, text, visiting),
            DslExpr::Reference(text) => ResolvedValue::Unresolved { reference: text.clone() },
            DslExpr::Interpolated(raw) if follow => self.interpolate(context, raw, visiting),
            DslExpr::Interpolated(raw) => ResolvedValue::Raw(raw.clone()),
            DslExpr::Unknown(text) => ResolvedValue::Raw(text.clone()),
        }
    }

    fn follow(&self, context: ElementId, reference: &str, visiting: &mut Vec<ElementId>) -> ResolvedValue {
        let unresolved = || ResolvedValue::Unresolved { reference: reference.to_string() };
        if visiting.contains(&context) || visiting.len() >= MAX_DEPTH {
            return unresolved();
        }
        let Some(target) = self.lookup(context, reference, visiting.len()) else { return unresolved() };
        if visiting.contains(&target) || target == context {
            return unresolved();
        }
        visiting.push(context);
        let value = self.value(target, true, visiting);
        visiting.pop();
        match value {
            ResolvedValue::Absent => unresolved(),
            value => value,
        }
    }

    /// Substitute every injection; any that cannot be resolved leaves the text raw
    fn interpolate(&self, context: ElementId, raw: &str, visiting: &mut Vec<ElementId>) -> ResolvedValue {
        let mut out = String::new();
        let mut last = 0;
        for captures in INJECTION.captures_iter(raw) {
            let Some(whole) = captures.get(0) else { continue };
            let reference = captures.get(1).or_else(|| captures.get(2)).map_or("", |m| m.as_str().trim());
            match self.follow(context, reference, visiting) {
                ResolvedValue::Literal(literal) => {
                    out.push_str(&raw[last..whole.start()]);
                    out.push_str(&literal.to_string());
                    last = whole.end();
                }
                _ => return ResolvedValue::Raw(raw.to_string()),
            }
        }
        out.push_str(&raw[last..]);
        ResolvedValue::Literal(crate::value::LiteralValue::String(unescape_dollars(&out)))
    }

    /// References made by an element's value, including those inside
    /// collections and string injections, in the order they are written
    pub fn dependencies(&self, id: ElementId) -> Vec<ValueDependency> {
        let mut out = Vec::new();
        self.collect_dependencies(id, &mut out);
        out
    }

    fn collect_dependencies(&self, id: ElementId, out: &mut Vec<ValueDependency>) {
        let element = self.tree.get(id);
        if !element.is_live() {
            return;
        }
        match &element.kind {
            ElementKind::Expression(DslExpr::Reference(reference)) => out.push(self.dependency(id, reference)),
            ElementKind::Expression(DslExpr::Interpolated(raw)) => {
                for captures in INJECTION.captures_iter(raw) {
                    let Some(whole) = captures.get(0) else { continue };
                    if raw[..whole.start()].ends_with('\\') {
                        continue;
                    }
                    if let Some(reference) = captures.get(1).or_else(|| captures.get(2)) {
                        out.push(self.dependency(id, reference.as_str().trim()));
                    }
                }
            }
            ElementKind::List(_) | ElementKind::Map(_) => {
                for child in self.tree.live_children(id) {
                    self.collect_dependencies(child, out);
                }
            }
            _ => {}
        }
    }

    fn dependency(&self, context: ElementId, reference: &str) -> ValueDependency {
        ValueDependency { reference: reference.to_string(), target: self.lookup(context, reference, 0) }
    }

    /// Element a reference names, as seen from `context`
    pub fn lookup(&self, context: ElementId, reference: &str, depth: usize) -> Option<ElementId> {
        let mut parts = parse_reference(reference)?;
        while matches!(parts.first(), Some(PathPart::Name(name)) if name == "rootProject" || name == "project") && parts.len() > 1 {
            parts.remove(0);
        }
        let PathPart::Name(first) = parts.first()? else { return None };
        let mut current = self.find_in_scope(context, canonical_block_name(first))?;
        for part in &parts[1..] {
            current = self.step(current, part, depth)?;
        }
        Some(current)
    }

    /// Search enclosing scopes for a declaration that precedes `context`
    fn find_in_scope(&self, context: ElementId, name: &str) -> Option<ElementId> {
        let mut child = context;
        while let Some(scope) = self.tree.parent(child) {
            let scope_element = self.tree.get(scope);
            if let ElementKind::Block(block) = &scope_element.kind {
                let position = block.children.iter().position(|id| *id == child).unwrap_or(block.children.len());
                let canonical = self.tree.resolver().canonical(block.kind, name);
                for id in block.children[..position].iter().rev() {
                    let element = self.tree.get(*id);
                    if !element.is_live() || matches!(element.kind, ElementKind::Unparsed(_)) {
                        continue;
                    }
                    if element.name == name || element.name == canonical {
                        return Some(*id);
                    }
                    // Properties of a preceding ext block are visible unqualified
                    if element.name == "ext" && element.is_block() {
                        if let Some(found) = self.tree.find_property(*id, name).or_else(|| self.tree.find_variable(*id, name)) {
                            return Some(found);
                        }
                    }
                }
            }
            child = scope;
        }
        None
    }

    fn step(&self, current: ElementId, part: &PathPart, depth: usize) -> Option<ElementId> {
        let element = self.tree.get(current);
        match (&element.kind, part) {
            (ElementKind::Expression(DslExpr::Reference(text)), _) if depth < MAX_DEPTH => {
                let target = self.lookup(current, text, depth + 1)?;
                self.step(target, part, depth + 1)
            }
            (ElementKind::Block(block), PathPart::Name(name) | PathPart::Key(name)) => {
                let canonical = self.tree.resolver().canonical(block.kind, name);
                self.tree
                    .find_property(current, &canonical)
                    .or_else(|| self.tree.find_block(current, name))
                    .or_else(|| self.tree.find_variable(current, name))
            }
            (ElementKind::Map(map), PathPart::Name(key) | PathPart::Key(key)) => map
                .entries
                .iter()
                .rev()
                .copied()
                .find(|id| self.tree.get(*id).is_live() && &self.tree.get(*id).name == key),
            (ElementKind::List(list), PathPart::Index(index)) => list
                .items
                .iter()
                .copied()
                .filter(|id| self.tree.get(*id).is_live())
                .nth(*index),
            _ => None,
        }
    }
}

/// Split `a.b['c'][0]` into its steps
fn parse_reference(text: &str) -> Option<Vec<PathPart>> {
    let text = text.trim();
    let mut parts = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut name_start: Option<usize> = None;

    let flush = |start: &mut Option<usize>, end: usize, parts: &mut Vec<PathPart>| {
        if let Some(s) = start.take() {
            if s < end {
                parts.push(PathPart::Name(text[s..end].to_string()));
            }
        }
    };

    while let Some((i, c)) = chars.next() {
        match c {
            '.' => flush(&mut name_start, i, &mut parts),
            '[' => {
                flush(&mut name_start, i, &mut parts);
                let close = text[i..].find(']')? + i;
                let inner = text[i + 1..close].trim();
                let part = if let Some(key) = inner
                    .strip_prefix('\'')
                    .and_then(|k| k.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|k| k.strip_suffix('"')))
                {
                    PathPart::Key(key.to_string())
                } else {
                    PathPart::Index(inner.parse().ok()?)
                };
                parts.push(part);
                while chars.peek().is_some_and(|(j, _)| *j <= close) {
                    chars.next();
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '$' => {
                if name_start.is_none() {
                    name_start = Some(i);
                }
            }
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }
    flush(&mut name_start, text.len(), &mut parts);
    (!parts.is_empty()).then_some(parts)
}

/// `\$` in interpolated text stands for a literal dollar sign
fn unescape_dollars(text: &str) -> String {
    text.replace("\\$", "$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DslContext;
    use crate::parser::DslParser;
    use crate::value::LiteralValue;

    fn parse(text: &str) -> DslTree {
        DslParser::parse_string(text, DslContext::default()).unwrap()
    }

    fn resolve(tree: &DslTree, holder: ElementId, name: &str) -> ResolvedValue {
        let id = tree.find_property(holder, name).unwrap();
        ValueResolver::new(tree).resolve(id)
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("rootProject.ext['x'][0]").unwrap(),
            vec![
                PathPart::Name("rootProject".into()),
                PathPart::Name("ext".into()),
                PathPart::Key("x".into()),
                PathPart::Index(0),
            ]
        );
        assert!(parse_reference("a + b").is_none());
    }

    #[test]
    fn test_variable_resolution() {
        let tree = parse("def sdk = 34\nandroid {\n  compileSdk sdk\n}");
        let android = tree.find_block(tree.root(), "android").unwrap();
        assert_eq!(resolve(&tree, android, "compileSdk"), ResolvedValue::from(34i64));
        let id = tree.find_property(android, "compileSdk").unwrap();
        assert_eq!(ValueResolver::new(&tree).raw(id), ResolvedValue::Unresolved { reference: "sdk".into() });
    }

    #[test]
    fn test_declaration_order() {
        let tree = parse("android {\n  compileSdk sdk\n}\ndef sdk = 34\n");
        let android = tree.find_block(tree.root(), "android").unwrap();
        assert_eq!(resolve(&tree, android, "compileSdk"), ResolvedValue::Unresolved { reference: "sdk".into() });
    }

    #[test]
    fn test_last_preceding_declaration_wins() {
        let tree = parse("def v = 1\ndef v = 2\nx {\n  y v\n}\ndef v = 3\n");
        let x = tree.find_block(tree.root(), "x").unwrap();
        assert_eq!(resolve(&tree, x, "y"), ResolvedValue::from(2i64));
    }

    #[test]
    fn test_ext_and_dotted_paths() {
        let tree = parse("ext {\n  versions = [kotlin: '1.9']\n  minSdk = 21\n}\nandroid {\n  defaultConfig {\n    minSdkVersion rootProject.ext.minSdk\n    versionName versions.kotlin\n    targetSdk ext['minSdk']\n  }\n}");
        let android = tree.find_block(tree.root(), "android").unwrap();
        let config = tree.find_block(android, "defaultConfig").unwrap();
        assert_eq!(resolve(&tree, config, "minSdk"), ResolvedValue::from(21i64));
        assert_eq!(resolve(&tree, config, "versionName"), ResolvedValue::from("1.9"));
        assert_eq!(resolve(&tree, config, "targetSdk"), ResolvedValue::from(21i64));
    }

    #[test]
    fn test_list_index() {
        let tree = parse("def dirs = ['a', 'b']\nx {\n  y dirs[1]\n}");
        let x = tree.find_block(tree.root(), "x").unwrap();
        assert_eq!(resolve(&tree, x, "y"), ResolvedValue::from("b"));
    }

    #[test]
    fn test_interpolation() {
        let tree = parse("def v = '1.9'\ndeps {\n  a \"kotlin:$v\"\n  b \"kotlin:${v}-x\"\n  c \"kotlin:$missing\"\n  d \"cost \\$5 $v\"\n}");
        let deps = tree.find_block(tree.root(), "deps").unwrap();
        assert_eq!(resolve(&tree, deps, "a"), ResolvedValue::from("kotlin:1.9"));
        assert_eq!(resolve(&tree, deps, "b"), ResolvedValue::from("kotlin:1.9-x"));
        assert_eq!(resolve(&tree, deps, "c"), ResolvedValue::Raw("kotlin:$missing".into()));
        assert_eq!(resolve(&tree, deps, "d"), ResolvedValue::Literal(LiteralValue::String("cost $5 1.9".into())));
    }

    #[test]
    fn test_self_reference_is_unresolved() {
        let tree = parse("ext {\n  foo = foo\n}");
        let ext = tree.find_block(tree.root(), "ext").unwrap();
        assert_eq!(resolve(&tree, ext, "foo"), ResolvedValue::Unresolved { reference: "foo".into() });
    }

    #[test]
    fn test_block_resolves_to_map() {
        let tree = parse("a {\n  x 1\n  y 'z'\n}");
        let a = tree.find_block(tree.root(), "a").unwrap();
        let value = ValueResolver::new(&tree).resolve(a);
        let ResolvedValue::Map(map) = value else { panic!() };
        assert_eq!(map.get("x"), Some(&ResolvedValue::from(1i64)));
        assert_eq!(map.len(), 2);
    }
}
