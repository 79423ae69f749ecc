//! Build Script Parser
//!
//! Parses build scripts into a [`DslTree`]. Statements are read by the
//! syntax layer and loaded into the element graph block by block.

use std::path::Path;
use tracing::{debug, info};

use crate::context::DslContext;
use crate::element::{
    BlockBody, DslElement, ElementId, ElementKind, ElementSpans, ListElement, MapElement, PropertyType, Segment,
    SegmentStyle,
};
use crate::lexer::Span;
use crate::names::Arity;
use crate::syntax::{parse_document, Expr, ExprKind, MapEntry, NameSyntax, Statement, StatementKind};
use crate::tree::DslTree;
use crate::value::{DslExpr, LiteralValue};

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Unterminated string starting at byte {offset}")]
    UnterminatedString { offset: usize },
    #[error("Unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },
    #[error("Block opened at byte {offset} is never closed")]
    UnclosedBlock { offset: usize },
    #[error("Delimiter opened at byte {offset} is never closed")]
    UnclosedDelimiter { offset: usize },
    #[error("Unexpected '{found}' at byte {offset}")]
    UnexpectedToken { offset: usize, found: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build script parser
pub struct DslParser;

impl DslParser {
    /// Parse a build file from path
    pub async fn parse_file(path: impl AsRef<Path>, context: DslContext) -> Result<(String, DslTree), ParseError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        info!("Parsing build file: {:?}", path);
        let tree = Self::parse_string(&content, context)?;
        Ok((content, tree))
    }

    /// Parse a build script from a string
    pub fn parse_string(text: &str, context: DslContext) -> Result<DslTree, ParseError> {
        let statements = parse_document(text)?;
        let mut builder = TreeBuilder { tree: DslTree::new(context), text };
        let root = builder.tree.root();
        builder.load(root, &statements);
        debug!("Parsed {} top-level statements ({} dialect)", statements.len(), builder.tree.dialect());
        Ok(builder.tree)
    }
}

/// Loads syntax statements into the element graph
struct TreeBuilder<'a> {
    tree: DslTree,
    text: &'a str,
}

impl TreeBuilder<'_> {
    fn load(&mut self, holder: ElementId, statements: &[Statement]) {
        for statement in statements {
            self.load_statement(holder, statement);
        }
    }

    fn load_statement(&mut self, holder: ElementId, statement: &Statement) {
        match &statement.kind {
            StatementKind::Block { name, label, body, open, close } => {
                let (holder, spelling, name_span) = match label {
                    Some((label, span)) => (holder, label.as_str(), span.clone()),
                    None => (self.prefix_holder(holder, name.prefix()), name.last(), name.last_span.clone()),
                };
                let spans = ElementSpans { statement: statement.span.clone(), name: Some(name_span), value: None };
                let body_span = BlockBody { statement: statement.span.clone(), open: *open, close: *close };
                let block = self.tree.parsed_child_block(holder, spelling, Some(spans), Some(body_span));
                self.load(block, body);
            }
            StatementKind::Assignment { name, value, variable: true } => {
                let element = self.value_element(holder, name, value, statement.span.clone(), true);
                self.tree.get_mut(element).property_type = PropertyType::Variable;
                self.tree.set_parsed_element(holder, element);
            }
            StatementKind::Assignment { name, value, variable: false } => {
                let holder = self.prefix_holder(holder, name.prefix());
                let element = self.value_element(holder, name, value, statement.span.clone(), true);
                self.tree.set_parsed_element(holder, element);
            }
            StatementKind::Call { name, args, inner, .. } => {
                let holder = self.prefix_holder(holder, name.prefix());
                let element = self.call_element(holder, name, args, inner.clone(), statement.span.clone());
                self.tree.add_parsed_element(holder, element);
            }
            StatementKind::Unparsed => {
                let text = self.text(&statement.span);
                self.tree.push_unparsed(holder, statement.span.clone(), text);
            }
        }
    }

    /// Walk the dotted prefix of a name, creating virtual blocks on the way
    fn prefix_holder(&mut self, holder: ElementId, prefix: &[String]) -> ElementId {
        let mut current = holder;
        for part in prefix {
            if current == self.tree.root() && matches!(part.as_str(), "project" | "rootProject") {
                continue;
            }
            current = self.tree.parsed_child_block(current, part, None, None);
        }
        current
    }

    fn text(&self, span: &Span) -> String {
        self.text.get(span.clone()).unwrap_or_default().to_string()
    }

    fn arity(&self, holder: ElementId, spelling: &str) -> Arity {
        self.tree.resolver().resolve(self.tree.holder_kind(holder), spelling).arity
    }

    fn base_element(&self, holder: ElementId, name: &NameSyntax, kind: ElementKind, use_assignment: bool) -> DslElement {
        let spelling = name.last();
        let canonical = self.tree.resolver().canonical(self.tree.holder_kind(holder), spelling);
        let mut element = DslElement::new(canonical, kind);
        element.external_name = Some(spelling.to_string());
        element.use_assignment = use_assignment;
        element
    }

    /// Element for `name = value`
    fn value_element(&mut self, holder: ElementId, name: &NameSyntax, value: &Expr, statement: Span, assignment: bool) -> ElementId {
        let spans = ElementSpans { statement: statement.clone(), name: Some(name.last_span.clone()), value: Some(value.span.clone()) };
        let arity = self.arity(holder, name.last());
        match &value.kind {
            ExprKind::List { items, inner } => {
                let segment = self.segment(name, statement, inner.clone(), SegmentStyle::Brackets, arity);
                let mut element = self.base_element(holder, name, ElementKind::List(ListElement::default()), assignment);
                element.spans = Some(spans);
                let id = self.tree.new_parsed(element);
                self.fill_list(id, items, segment);
                id
            }
            ExprKind::Map { entries, inner } => {
                let style = if *inner == value.span { SegmentStyle::Args } else { SegmentStyle::Brackets };
                let segment = self.segment(name, statement, inner.clone(), style, arity);
                let mut element = self.base_element(holder, name, ElementKind::Map(MapElement::default()), assignment);
                element.spans = Some(spans);
                let id = self.tree.new_parsed(element);
                self.fill_map(id, entries, segment);
                id
            }
            _ => {
                let kind = ElementKind::Expression(self.expr(value));
                let mut element = self.base_element(holder, name, kind, assignment);
                element.spans = Some(spans);
                self.tree.new_parsed(element)
            }
        }
    }

    /// Element for `name arg, ...` or `name(arg, ...)`
    fn call_element(&mut self, holder: ElementId, name: &NameSyntax, args: &[Expr], inner: Span, statement: Span) -> ElementId {
        match args {
            [] => {
                let mut element = self.base_element(holder, name, ElementKind::Expression(DslExpr::Unknown(String::new())), false);
                element.spans = Some(ElementSpans { statement, name: Some(name.last_span.clone()), value: None });
                self.tree.new_parsed(element)
            }
            [single] => self.value_element(holder, name, single, statement, false),
            _ => {
                let arity = self.arity(holder, name.last());
                let segment = self.segment(name, statement.clone(), inner.clone(), SegmentStyle::Args, arity);
                let mut element = self.base_element(holder, name, ElementKind::List(ListElement::default()), false);
                element.spans = Some(ElementSpans { statement, name: Some(name.last_span.clone()), value: Some(inner) });
                let id = self.tree.new_parsed(element);
                self.fill_list(id, args, segment);
                id
            }
        }
    }

    fn segment(&self, name: &NameSyntax, statement: Span, inner: Span, style: SegmentStyle, arity: Arity) -> Segment {
        Segment {
            statement,
            spelling: name.last().to_string(),
            name_span: Some(name.last_span.clone()),
            inner,
            style,
            arity,
            dirty: false,
        }
    }

    fn fill_list(&mut self, list: ElementId, items: &[Expr], segment: Segment) {
        let ids: Vec<ElementId> = items.iter().map(|item| self.item_element(list, item)).collect();
        if let ElementKind::List(element) = &mut self.tree.get_mut(list).kind {
            element.items = ids;
            element.segments.push(segment);
        }
    }

    fn fill_map(&mut self, map: ElementId, entries: &[MapEntry], segment: Segment) {
        let ids: Vec<ElementId> = entries.iter().map(|entry| self.entry_element(map, entry)).collect();
        if let ElementKind::Map(element) = &mut self.tree.get_mut(map).kind {
            element.entries = ids;
            element.segments.push(segment);
        }
    }

    fn item_element(&mut self, list: ElementId, item: &Expr) -> ElementId {
        let kind = self.nested_kind(item);
        let mut element = DslElement::new("", kind);
        element.parent = Some(list);
        element.property_type = PropertyType::Derived;
        element.segment = Some(0);
        element.spans = Some(ElementSpans { statement: item.span.clone(), name: None, value: Some(item.span.clone()) });
        self.tree.new_parsed(element)
    }

    fn entry_element(&mut self, map: ElementId, entry: &MapEntry) -> ElementId {
        let kind = self.nested_kind(&entry.value);
        let mut element = DslElement::new(entry.key.clone(), kind);
        element.external_name = Some(entry.key.clone());
        element.parent = Some(map);
        element.property_type = PropertyType::Derived;
        element.use_assignment = true;
        element.segment = Some(0);
        element.spans = Some(ElementSpans {
            statement: entry.span.clone(),
            name: Some(entry.key_span.clone()),
            value: Some(entry.value.span.clone()),
        });
        self.tree.new_parsed(element)
    }

    /// Nested collections inside lists and maps stay opaque expressions
    fn nested_kind(&self, value: &Expr) -> ElementKind {
        ElementKind::Expression(self.expr(value))
    }

    fn expr(&self, value: &Expr) -> DslExpr {
        match &value.kind {
            ExprKind::String(text) => DslExpr::Literal(LiteralValue::String(text.clone())),
            ExprKind::Interpolated(raw) => DslExpr::Interpolated(raw.clone()),
            ExprKind::Integer(number) => DslExpr::Literal(LiteralValue::Integer(*number)),
            ExprKind::Decimal(number) => DslExpr::Literal(LiteralValue::Decimal(*number)),
            ExprKind::Boolean(flag) => DslExpr::Literal(LiteralValue::Boolean(*flag)),
            ExprKind::Reference => DslExpr::Reference(self.text(&value.span)),
            ExprKind::Null | ExprKind::Call { .. } | ExprKind::List { .. } | ExprKind::Map { .. } | ExprKind::Unknown => {
                DslExpr::Unknown(self.text(&value.span))
            }
        }
    }
}
