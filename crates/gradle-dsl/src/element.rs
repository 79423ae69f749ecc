//! DSL Elements
//!
//! Nodes of the element graph. Elements live in the arena owned by
//! [`crate::tree::DslTree`] and refer to each other by [`ElementId`].

use serde::Serialize;

use crate::description::BlockKind;
use crate::lexer::Span;
use crate::names::Arity;
use crate::value::{DslExpr, ValueType};

/// Index of an element in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub(crate) usize);

/// Change tracking for one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementState {
    /// Parsed and untouched
    Existing,
    /// Created by the model, not yet written
    New,
    /// Parsed, then changed by the model
    Modified,
    /// Parsed, then deleted by the model
    Removed,
}

/// Role of an element inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyType {
    /// A property of a block
    Regular,
    /// `def x` / `val x`
    Variable,
    /// A list item or map entry
    Derived,
}

/// Byte ranges of a parsed element in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpans {
    pub statement: Span,
    pub name: Option<Span>,
    pub value: Option<Span>,
}

/// How a segment delimits its items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStyle {
    /// `[a, b]` or `listOf(a, b)`
    Brackets,
    /// Call arguments: `srcDir 'a'`, `srcDirs('a', 'b')`
    Args,
    /// A single value bound by assignment: `srcDirs = 'a'`
    Value,
}

/// One physical container contributing items to a list or map element
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Statement declaring the segment
    pub statement: Span,
    /// Name as written and where
    pub spelling: String,
    pub name_span: Option<Span>,
    /// Text between the delimiters (or the run of arguments)
    pub inner: Span,
    pub style: SegmentStyle,
    pub arity: Arity,
    /// Items were added, removed or changed since parsing
    pub dirty: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListElement {
    pub items: Vec<ElementId>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapElement {
    pub entries: Vec<ElementId>,
    pub segments: Vec<Segment>,
}

/// Brace pair of one textual occurrence of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBody {
    pub statement: Span,
    pub open: usize,
    pub close: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockElement {
    pub kind: BlockKind,
    pub children: Vec<ElementId>,
    /// Every `name { }` occurrence, in document order
    pub bodies: Vec<BlockBody>,
    /// Implied by dotted names only, never written with braces
    pub is_virtual: bool,
}

impl BlockElement {
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, children: Vec::new(), bodies: Vec::new(), is_virtual: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Expression(DslExpr),
    List(ListElement),
    Map(MapElement),
    Block(BlockElement),
    /// A statement kept as opaque text
    Unparsed(String),
}

impl ElementKind {
    pub fn value_type(&self) -> ValueType {
        match self {
            ElementKind::Expression(expr) => expr.value_type(),
            ElementKind::List(_) => ValueType::List,
            ElementKind::Map(_) => ValueType::Map,
            ElementKind::Block(_) | ElementKind::Unparsed(_) => ValueType::Custom,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ElementKind::Expression(_) => "scalar",
            ElementKind::List(_) => "list",
            ElementKind::Map(_) => "map",
            ElementKind::Block(_) => "block",
            ElementKind::Unparsed(_) => "statement",
        }
    }
}

/// One node of the element graph
#[derive(Debug, Clone, PartialEq)]
pub struct DslElement {
    /// Canonical name; list items use an empty name
    pub name: String,
    /// Name as written in the document, if parsed
    pub external_name: Option<String>,
    pub parent: Option<ElementId>,
    pub kind: ElementKind,
    pub use_assignment: bool,
    pub property_type: PropertyType,
    pub state: ElementState,
    pub renamed: bool,
    /// Value was replaced by one of a different shape (scalar to list, ...)
    pub replaced: bool,
    /// Owning segment for list items and map entries
    pub segment: Option<usize>,
    pub spans: Option<ElementSpans>,
}

impl DslElement {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            external_name: None,
            parent: None,
            kind,
            use_assignment: false,
            property_type: PropertyType::Regular,
            state: ElementState::New,
            renamed: false,
            replaced: false,
            segment: None,
            spans: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state != ElementState::Removed
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, ElementKind::Block(_))
    }

    pub fn block(&self) -> Option<&BlockElement> {
        match &self.kind {
            ElementKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn block_mut(&mut self) -> Option<&mut BlockElement> {
        match &mut self.kind {
            ElementKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn expr(&self) -> Option<&DslExpr> {
        match &self.kind {
            ElementKind::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    /// Children in order: block children, list items or map entries
    pub fn children(&self) -> &[ElementId] {
        match &self.kind {
            ElementKind::Block(block) => &block.children,
            ElementKind::List(list) => &list.items,
            ElementKind::Map(map) => &map.entries,
            ElementKind::Expression(_) | ElementKind::Unparsed(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<ElementId>> {
        match &mut self.kind {
            ElementKind::Block(block) => Some(&mut block.children),
            ElementKind::List(list) => Some(&mut list.items),
            ElementKind::Map(map) => Some(&mut map.entries),
            ElementKind::Expression(_) | ElementKind::Unparsed(_) => None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        match &self.kind {
            ElementKind::List(list) => &list.segments,
            ElementKind::Map(map) => &map.segments,
            _ => &[],
        }
    }

    pub fn segments_mut(&mut self) -> Option<&mut Vec<Segment>> {
        match &mut self.kind {
            ElementKind::List(list) => Some(&mut list.segments),
            ElementKind::Map(map) => Some(&mut map.segments),
            _ => None,
        }
    }

    /// Whether this element occupies text in the document
    pub fn is_physical(&self) -> bool {
        self.spans.is_some() && !matches!(&self.kind, ElementKind::Block(block) if block.is_virtual)
    }
}
