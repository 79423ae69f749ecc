//! Document Synchronizer
//!
//! Turns the pending changes of a [`DslTree`] into byte-range edits on the
//! text it was parsed from. Only touched statements are rewritten; every
//! other byte of the document is left alone.

use std::ops::Range;

use r_droid_core::GradleDialect;
use r_droid_editor::{BufferError, TextBuffer};
use tracing::debug;

use crate::context::DslContext;
use crate::description::BlockKind;
use crate::element::{ElementId, ElementKind, ElementState, PropertyType, SegmentStyle};
use crate::lexer::BOM;
use crate::parser::{DslParser, ParseError};
use crate::tree::DslTree;
use crate::writer::DslWriter;

/// Synchronizer errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Edits overlap at byte {offset}")]
    OverlappingEdits { offset: usize },
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("Document no longer parses after applying changes: {0}")]
    Reparse(#[from] ParseError),
}

/// One replacement of a byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub text: String,
    seq: usize,
}

/// Computes the edits that bring a document in line with its tree
pub struct DocumentSynchronizer<'a> {
    tree: &'a DslTree,
    text: &'a str,
    writer: DslWriter<'a>,
    edits: Vec<TextEdit>,
}

impl<'a> DocumentSynchronizer<'a> {
    pub fn new(tree: &'a DslTree, text: &'a str) -> Self {
        Self { tree, text, writer: DslWriter::new(tree, text), edits: Vec::new() }
    }

    /// Every edit, ordered from the end of the document to its start
    pub fn compute(mut self) -> Result<Vec<TextEdit>, SyncError> {
        self.visit_block(self.tree.root());
        let mut edits = self.edits;
        edits.sort_by(|a, b| {
            b.range
                .start
                .cmp(&a.range.start)
                .then(b.range.end.cmp(&a.range.end))
                .then(b.seq.cmp(&a.seq))
        });
        edits.dedup_by(|a, b| a.range == b.range && a.text == b.text && !a.range.is_empty());
        for pair in edits.windows(2) {
            if pair[1].range.end > pair[0].range.start {
                return Err(SyncError::OverlappingEdits { offset: pair[0].range.start });
            }
        }
        debug!("Computed {} document edits", edits.len());
        Ok(edits)
    }

    /// Apply edits from [`compute`](Self::compute) in one buffer transaction
    /// and parse the result; any failure leaves the buffer untouched
    pub fn apply(buffer: &mut TextBuffer, edits: &[TextEdit], context: &DslContext) -> Result<DslTree, SyncError> {
        buffer.transaction(|tx| {
            for edit in edits {
                tx.replace_bytes(edit.range.clone(), &edit.text)?;
            }
            Ok(DslParser::parse_string(&tx.text(), context.clone())?)
        })
    }

    fn push(&mut self, range: Range<usize>, text: impl Into<String>) {
        let seq = self.edits.len();
        self.edits.push(TextEdit { range, text: text.into(), seq });
    }

    // ---------------------------------------------------------------
    // Walk
    // ---------------------------------------------------------------

    fn visit_block(&mut self, block: ElementId) {
        let mut anchor: Option<ElementId> = None;
        let mut pending: Vec<ElementId> = Vec::new();
        for child in self.tree.get(block).children().to_vec() {
            match self.tree.get(child).state {
                ElementState::Removed => {
                    self.delete_element(child);
                    continue;
                }
                ElementState::New => {
                    if self.tree.is_significant(child) {
                        pending.push(child);
                    }
                    continue;
                }
                ElementState::Existing | ElementState::Modified => {}
            }
            if !pending.is_empty() {
                self.insert_group(block, anchor, &pending);
                pending.clear();
            }
            self.visit_existing(child);
            if self.extent(child).is_some() {
                anchor = Some(child);
            }
        }
        if !pending.is_empty() {
            self.insert_group(block, anchor, &pending);
        }
    }

    fn visit_existing(&mut self, id: ElementId) {
        let element = self.tree.get(id);
        let Some(spans) = element.spans.clone() else {
            if element.is_block() {
                self.visit_block(id);
            }
            return;
        };
        match &element.kind {
            ElementKind::Block(_) => {
                if element.renamed {
                    if let Some(name) = spans.name {
                        self.push(name, element.external_name.clone().unwrap_or_else(|| element.name.clone()));
                    }
                }
                self.visit_block(id);
            }
            ElementKind::Unparsed(_) => {}
            _ if element.replaced => self.rewrite_statement(id),
            ElementKind::Expression(expr) => {
                if element.state == ElementState::Modified {
                    match spans.value {
                        Some(value) => {
                            let text = self.writer.expr(expr);
                            self.push(value, text);
                        }
                        None => self.rewrite_statement(id),
                    }
                }
                if element.renamed {
                    if let Some(name) = spans.name {
                        let text = self.writer.property_name(id);
                        self.push(name, text);
                    }
                }
            }
            ElementKind::List(_) | ElementKind::Map(_) => {
                if element.renamed {
                    let text = self.writer.property_name(id);
                    let names: Vec<Range<usize>> = element
                        .segments()
                        .iter()
                        .filter_map(|segment| segment.name_span.clone())
                        .collect();
                    for name in names {
                        self.push(name, text.clone());
                    }
                }
                for index in 0..element.segments().len() {
                    if self.tree.get(id).segments()[index].dirty {
                        self.rewrite_segment(id, index);
                    }
                }
            }
        }
    }

    /// Re-render a parsed statement from its name onwards
    fn rewrite_statement(&mut self, id: ElementId) {
        let element = self.tree.get(id);
        let Some(spans) = element.spans.clone() else { return };
        let keeps_name = element.use_assignment || element.property_type == PropertyType::Variable;
        match (keeps_name, spans.value, spans.name) {
            (true, Some(value), _) => {
                let text = self.writer.value(id);
                self.push(value, text);
            }
            (_, _, Some(name)) => {
                let text = self.writer.statement(id, "", "");
                self.push(name.start..spans.statement.end, text);
            }
            _ => {
                let text = self.writer.statement(id, "", "");
                self.push(spans.statement, text);
            }
        }
    }

    fn rewrite_segment(&mut self, collection: ElementId, index: usize) {
        let element = self.tree.get(collection);
        let segment = element.segments()[index].clone();
        let items: Vec<ElementId> = self
            .tree
            .live_children(collection)
            .into_iter()
            .filter(|item| self.tree.get(*item).segment == Some(index))
            .collect();
        let is_map = matches!(element.kind, ElementKind::Map(_));
        let inner = if is_map { self.writer.entries(&items) } else { self.writer.items(&items) };

        match segment.style {
            SegmentStyle::Args if items.is_empty() => self.delete_statement(segment.statement),
            SegmentStyle::Args => {
                self.push(segment.inner, inner);
                let grows = !is_map && !element.renamed && items.len() > 1 && segment.arity == crate::names::Arity::Single;
                if grows {
                    let holder = element.parent.map(|parent| self.tree.holder_kind(parent)).unwrap_or(BlockKind::Generic);
                    let vararg = self.tree.resolver().vararg_spelling(holder, &element.name);
                    if let (Some(vararg), Some(name)) = (vararg, segment.name_span) {
                        self.push(name, vararg);
                    }
                }
            }
            SegmentStyle::Brackets => self.push(segment.inner, inner),
            SegmentStyle::Value if items.len() == 1 => self.push(segment.inner, inner),
            SegmentStyle::Value => {
                let literal = if is_map { self.writer.map_literal(&inner) } else { self.writer.list_literal(&inner) };
                self.push(segment.inner, literal);
            }
        }
    }

    // ---------------------------------------------------------------
    // Deletion
    // ---------------------------------------------------------------

    fn delete_element(&mut self, id: ElementId) {
        let mut statements = Vec::new();
        self.collect_statements(id, &mut statements);
        statements.sort_by_key(|span| (span.start, std::cmp::Reverse(span.end)));
        let mut outermost: Vec<Range<usize>> = Vec::new();
        for span in statements {
            if outermost.last().is_some_and(|last| span.start >= last.start && span.end <= last.end) {
                continue;
            }
            outermost.push(span);
        }
        for span in outermost {
            self.delete_statement(span);
        }
    }

    fn collect_statements(&self, id: ElementId, out: &mut Vec<Range<usize>>) {
        let element = self.tree.get(id);
        match &element.kind {
            ElementKind::Block(block) => {
                out.extend(block.bodies.iter().map(|body| body.statement.clone()));
                for child in &block.children {
                    self.collect_statements(*child, out);
                }
            }
            ElementKind::List(_) | ElementKind::Map(_) if !element.segments().is_empty() => {
                out.extend(element.segments().iter().map(|segment| segment.statement.clone()));
            }
            _ => out.extend(element.spans.as_ref().map(|spans| spans.statement.clone())),
        }
    }

    /// Delete a statement, taking its line with it when nothing else is on it
    fn delete_statement(&mut self, span: Range<usize>) {
        let text = self.text;
        let line_start = self.line_start(span.start);
        let line_end = text[span.end..].find('\n').map(|i| span.end + i).unwrap_or(text.len());
        let before = &text[line_start..span.start];
        let after = text[span.end..line_end].trim_start().trim_start_matches(';');
        if !before.trim().is_empty() || !after.trim().is_empty() {
            self.push(span, "");
        } else if line_end < text.len() {
            self.push(line_start..line_end + 1, "");
        } else if line_start > 0 {
            self.push(line_start - 1..line_end, "");
        } else {
            self.push(line_start..line_end, "");
        }
    }

    // ---------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------

    fn insert_group(&mut self, holder: ElementId, anchor: Option<ElementId>, group: &[ElementId]) {
        let (container, prefix) = self.physical_container(holder);
        let indent = self.child_indent(container);
        let statements: Vec<String> = group
            .iter()
            .map(|id| self.writer.statement(*id, &prefix, &indent))
            .filter(|statement| !statement.is_empty())
            .collect();
        if statements.is_empty() {
            return;
        }

        if let Some(end) = anchor.and_then(|anchor| self.extent(anchor)).map(|extent| extent.end) {
            let text: String = statements.iter().map(|s| format!("\n{}{}", indent, s)).collect();
            return self.push(end..end, text);
        }

        // Nothing before the group: go ahead of the first statement the holder owns
        let first = if holder == container && container != self.tree.root() { None } else { self.extent(holder) };
        if let Some(first) = first {
            let line_start = self.line_start(first.start);
            let text: String = statements.iter().map(|s| format!("{}{}\n", indent, s)).collect();
            return self.push(line_start..line_start, text);
        }

        let body = self.tree.get(container).block().and_then(|block| block.bodies.first().cloned());
        match body {
            Some(body) => {
                let mut text: String = statements.iter().map(|s| format!("\n{}{}", indent, s)).collect();
                let inner = &self.text[body.open + 1..body.close];
                if inner.contains('\n') {
                    return self.push(body.open + 1..body.open + 1, text);
                }
                text.push('\n');
                text.push_str(&self.line_indent(body.statement.start));
                // A blank one-line body is replaced so no padding is left before the brace
                let end = if inner.trim().is_empty() { body.close } else { body.open + 1 };
                self.push(body.open + 1..end, text);
            }
            None => {
                let end = self.text.len();
                let mut text = String::new();
                if !self.text.is_empty() && !self.text.ends_with('\n') {
                    text.push('\n');
                }
                for statement in statements {
                    text.push_str(&statement);
                    text.push('\n');
                }
                self.push(end..end, text);
            }
        }
    }

    /// Nearest block with braces in the text, and the dotted path down to `holder`
    fn physical_container(&self, holder: ElementId) -> (ElementId, String) {
        let mut parts: Vec<String> = Vec::new();
        let mut current = holder;
        while let Some(block) = self.tree.get(current).block().filter(|block| block.is_virtual) {
            let element = self.tree.get(current);
            let kotlin_extra = self.tree.dialect() == GradleDialect::Kotlin && block.kind == BlockKind::Ext;
            if !kotlin_extra {
                parts.push(element.external_name.clone().unwrap_or_else(|| element.name.clone()));
            }
            match element.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        let prefix: String = parts.iter().rev().map(|part| format!("{}.", part)).collect();
        (current, prefix)
    }

    /// Indentation for new statements directly inside `container`
    fn child_indent(&self, container: ElementId) -> String {
        let first_child = self
            .tree
            .live_children(container)
            .into_iter()
            .filter(|child| self.tree.get(*child).state != ElementState::New)
            .find_map(|child| self.extent(child));
        if let Some(extent) = first_child {
            return self.line_indent(extent.start);
        }
        match self.tree.get(container).block().and_then(|block| block.bodies.first()) {
            Some(body) => format!("{}{}", self.line_indent(body.statement.start), self.tree.context().config.indent_unit()),
            None => String::new(),
        }
    }

    /// Byte range covered by everything an element wrote
    fn extent(&self, id: ElementId) -> Option<Range<usize>> {
        let element = self.tree.get(id);
        if !element.is_live() || element.state == ElementState::New {
            return None;
        }
        let mut spans: Vec<Range<usize>> = Vec::new();
        match &element.kind {
            ElementKind::Block(block) => {
                spans.extend(block.bodies.iter().map(|body| body.statement.clone()));
                spans.extend(block.children.iter().filter_map(|child| self.extent(*child)));
            }
            ElementKind::List(_) | ElementKind::Map(_) if !element.segments().is_empty() => {
                spans.extend(
                    element
                        .segments()
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| !self.is_emptied_call(id, *index))
                        .map(|(_, segment)| segment.statement.clone()),
                );
            }
            _ => spans.extend(element.spans.as_ref().map(|spans| spans.statement.clone())),
        }
        let start = spans.iter().map(|span| span.start).min()?;
        let end = spans.iter().map(|span| span.end).max()?;
        Some(start..end)
    }

    /// Call segment whose statement [`rewrite_segment`](Self::rewrite_segment) deletes
    fn is_emptied_call(&self, collection: ElementId, index: usize) -> bool {
        let segment = &self.tree.get(collection).segments()[index];
        segment.style == SegmentStyle::Args
            && segment.dirty
            && !self
                .tree
                .live_children(collection)
                .into_iter()
                .any(|item| self.tree.get(item).segment == Some(index))
    }

    /// Start of the line holding `offset`; a leading byte order mark stays ahead of the first line
    fn line_start(&self, offset: usize) -> usize {
        let first = if self.text.starts_with(BOM) { BOM.len_utf8() } else { 0 };
        self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(first)
    }

    fn line_indent(&self, offset: usize) -> String {
        let start = self.line_start(offset);
        self.text[start..offset].chars().take_while(|c| c.is_whitespace()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyModel;
    use crate::value::DslExpr;

    fn parse(text: &str) -> DslTree {
        DslParser::parse_string(text, DslContext::default()).unwrap()
    }

    fn sync(tree: &DslTree, text: &str) -> String {
        let edits = DocumentSynchronizer::new(tree, text).compute().unwrap();
        let mut buffer = TextBuffer::from_str(text);
        DocumentSynchronizer::apply(&mut buffer, &edits, tree.context()).unwrap();
        buffer.text()
    }

    fn block(tree: &DslTree, path: &str) -> ElementId {
        path.split('.').fold(tree.root(), |holder, name| tree.find_block(holder, name).unwrap())
    }

    #[test]
    fn test_no_changes_no_edits() {
        let text = "android {\n  compileSdk 33 // keep\n}\n";
        let tree = parse(text);
        assert!(DocumentSynchronizer::new(&tree, text).compute().unwrap().is_empty());
    }

    #[test]
    fn test_value_replaced_in_place() {
        let text = "android {\n  compileSdkVersion 33 // sdk\n}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        PropertyModel::new(&mut tree, android, "compileSdk").set_value(34).unwrap();
        assert_eq!(sync(&tree, text), "android {\n  compileSdkVersion 34 // sdk\n}\n");
    }

    #[test]
    fn test_remove_deletes_line() {
        let text = "android {\n  namespace 'a'\n  compileSdk 33\n}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        PropertyModel::new(&mut tree, android, "namespace").delete();
        assert_eq!(sync(&tree, text), "android {\n  compileSdk 33\n}\n");
    }

    #[test]
    fn test_insert_after_sibling_with_indent() {
        let text = "android {\n    compileSdk 33\n}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        PropertyModel::new(&mut tree, android, "namespace").set_value("com.x").unwrap();
        assert_eq!(sync(&tree, text), "android {\n    compileSdk 33\n    namespace 'com.x'\n}\n");
    }

    #[test]
    fn test_insert_at_index_zero() {
        let text = "a {\n  x 1\n  y 2\n}\n";
        let mut tree = parse(text);
        let a = block(&tree, "a");
        let w = tree.new_literal("w", DslExpr::from(0));
        tree.add_new_element_at(a, 0, w).unwrap();
        let z = tree.new_literal("z", DslExpr::from(3));
        tree.add_new_element_at(a, 2, z).unwrap();
        assert_eq!(sync(&tree, text), "a {\n  w 0\n  x 1\n  z 3\n  y 2\n}\n");
    }

    #[test]
    fn test_insert_into_empty_block() {
        let text = "android {}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        PropertyModel::new(&mut tree, android, "compileSdk").set_value(34).unwrap();
        assert_eq!(sync(&tree, text), "android {\n    compileSdk 34\n}\n");
    }

    #[test]
    fn test_insert_into_blank_one_line_block() {
        let text = "/* c */ android { }\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        PropertyModel::new(&mut tree, android, "compileSdk").set_value(33).unwrap();
        assert_eq!(sync(&tree, text), "/* c */ android {\n    compileSdk 33\n}\n");
    }

    #[test]
    fn test_new_sibling_after_emptied_call_list() {
        let text = "android {\n    defaultConfig {\n        proguardFile 'a'\n    }\n}\n";
        let mut tree = parse(text);
        let default_config = block(&tree, "android.defaultConfig");
        assert!(PropertyModel::new(&mut tree, default_config, "proguardFiles").remove_from_list("a").unwrap());
        PropertyModel::new(&mut tree, default_config, "minSdk").set_value(21).unwrap();
        assert_eq!(sync(&tree, text), "android {\n    defaultConfig {\n        minSdk 21\n    }\n}\n");
    }

    #[test]
    fn test_leading_bom_kept_in_front() {
        let text = "\u{FEFF}android {\n}\nplugins {\n}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        assert_eq!(tree.ensure_block(tree.root(), "android"), android);
        PropertyModel::new(&mut tree, android, "compileSdk").set_value(34).unwrap();
        let extra = tree.new_literal("version", DslExpr::from("1.0"));
        tree.add_new_element_at(tree.root(), 0, extra).unwrap();
        assert_eq!(
            sync(&tree, text),
            "\u{FEFF}version '1.0'\nandroid {\n    compileSdk 34\n}\nplugins {\n}\n"
        );
    }

    #[test]
    fn test_new_nested_block() {
        let text = "android {\n  compileSdk 33\n}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        let build_types = tree.ensure_block(android, "buildTypes");
        let release = tree.ensure_block(build_types, "release");
        PropertyModel::new(&mut tree, release, "minifyEnabled").set_value(true).unwrap();
        assert_eq!(
            sync(&tree, text),
            "android {\n  compileSdk 33\n  buildTypes {\n      release {\n          minifyEnabled true\n      }\n  }\n}\n"
        );
    }

    #[test]
    fn test_segment_rewrite_keeps_untouched_items() {
        let text = "a {\n  l = [ 'x',  \"y\" ]\n}\n";
        let mut tree = parse(text);
        let a = block(&tree, "a");
        PropertyModel::new(&mut tree, a, "l").add_to_list("z").unwrap();
        assert_eq!(sync(&tree, text), "a {\n  l = ['x', \"y\", 'z']\n}\n");
    }

    #[test]
    fn test_src_dir_grows_to_vararg() {
        let text = "android {\n  sourceSets {\n    main {\n      java {\n        srcDir 'a'\n      }\n    }\n  }\n}\n";
        let mut tree = parse(text);
        let java = block(&tree, "android.sourceSets.main.java");
        PropertyModel::new(&mut tree, java, "srcDirs").add_to_list("b").unwrap();
        assert!(sync(&tree, text).contains("        srcDirs 'a', 'b'\n"));
    }

    #[test]
    fn test_emptied_call_segment_deletes_statement() {
        let text = "android {\n  sourceSets {\n    main {\n      java {\n        srcDir 'a'\n        srcDirs = ['b']\n      }\n    }\n  }\n}\n";
        let mut tree = parse(text);
        let java = block(&tree, "android.sourceSets.main.java");
        assert!(PropertyModel::new(&mut tree, java, "srcDirs").remove_from_list("a").unwrap());
        let out = sync(&tree, text);
        assert!(!out.contains("srcDir 'a'"));
        assert!(out.contains("      java {\n        srcDirs = ['b']\n      }"));
    }

    #[test]
    fn test_dotted_virtual_block_gets_prefix() {
        let text = "android.compileSdk = 33\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        PropertyModel::new(&mut tree, android, "namespace").set_value("x").unwrap();
        assert_eq!(sync(&tree, text), "android.compileSdk = 33\nandroid.namespace = 'x'\n");
    }

    #[test]
    fn test_removed_block_deletes_body() {
        let text = "plugins {\n  id 'a'\n}\nandroid {\n  compileSdk 33\n}\n";
        let mut tree = parse(text);
        let android = block(&tree, "android");
        tree.remove_element(android);
        assert_eq!(sync(&tree, text), "plugins {\n  id 'a'\n}\n");
    }

    #[test]
    fn test_rename() {
        let text = "a {\n  x 1\n}\n";
        let mut tree = parse(text);
        let a = block(&tree, "a");
        PropertyModel::new(&mut tree, a, "x").rename("y").unwrap();
        assert_eq!(sync(&tree, text), "a {\n  y 1\n}\n");
    }

    #[test]
    fn test_scalar_converted_to_list() {
        let text = "a {\n  x 1\n}\n";
        let mut tree = parse(text);
        let a = block(&tree, "a");
        let mut property = PropertyModel::new(&mut tree, a, "x");
        property.convert_to_empty_list().unwrap();
        property.add_to_list(2).unwrap();
        property.add_to_list(3).unwrap();
        assert_eq!(sync(&tree, text), "a {\n  x 2, 3\n}\n");
    }

    #[test]
    fn test_append_to_root() {
        let text = "// header\n";
        let mut tree = parse(text);
        let root = tree.root();
        PropertyModel::new(&mut tree, root, "version").set_value("1.0").unwrap();
        assert_eq!(sync(&tree, text), "// header\nversion '1.0'\n");
    }

    #[test]
    fn test_apply_rolls_back_on_error() {
        let text = "a {\n  x 1\n}\n";
        let mut buffer = TextBuffer::from_str(text);
        let edits = vec![
            TextEdit { range: 8..9, text: "2".into(), seq: 0 },
            TextEdit { range: 2..999, text: String::new(), seq: 1 },
        ];
        let context = DslContext::default();
        assert!(matches!(DocumentSynchronizer::apply(&mut buffer, &edits, &context), Err(SyncError::Buffer(_))));
        assert_eq!(buffer.text(), text);
    }

    #[test]
    fn test_apply_rolls_back_when_result_does_not_parse() {
        let text = "a {\n  x 1\n}\n";
        let mut buffer = TextBuffer::from_str(text);
        let edits = vec![TextEdit { range: 8..9, text: "'2".into(), seq: 0 }];
        let context = DslContext::default();
        assert!(matches!(DocumentSynchronizer::apply(&mut buffer, &edits, &context), Err(SyncError::Reparse(_))));
        assert_eq!(buffer.text(), text);
        assert!(!buffer.is_dirty());
    }
}
