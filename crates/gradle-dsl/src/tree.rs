//! Element Graph
//!
//! Arena of [`DslElement`]s rooted at the build file. Parents own their
//! children through ordered id lists; every element keeps its parent id.
//! Parsed statements enter through [`DslTree::add_parsed_element`] and
//! [`DslTree::set_parsed_element`], which apply the per-block aliasing
//! rules. Model edits go through the `new_*`, `add_new_element_at`,
//! `remove_element` and `rename_element` calls.

use r_droid_core::{Event, GradleDialect};
use tracing::debug;

use crate::context::DslContext;
use crate::description::BlockKind;
use crate::element::{
    BlockBody, BlockElement, DslElement, ElementId, ElementKind, ElementSpans, ElementState, ListElement,
    MapElement, PropertyType, Segment, SegmentStyle,
};
use crate::names::{canonical_block_name, NameResolver, Semantics};
use crate::property::PropertyError;
use crate::value::DslExpr;

/// Element graph for one build file
#[derive(Debug, Clone)]
pub struct DslTree {
    elements: Vec<DslElement>,
    root: ElementId,
    context: DslContext,
    resolver: NameResolver,
}

impl DslTree {
    /// Empty tree holding only the file element
    pub fn new(context: DslContext) -> Self {
        let mut root = DslElement::new("", ElementKind::Block(BlockElement::new(BlockKind::File)));
        root.state = ElementState::Existing;
        Self {
            elements: vec![root],
            root: ElementId(0),
            context,
            resolver: NameResolver,
        }
    }

    pub fn context(&self) -> &DslContext {
        &self.context
    }

    pub fn dialect(&self) -> GradleDialect {
        self.context.dialect
    }

    pub fn resolver(&self) -> NameResolver {
        self.resolver
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn get(&self, id: ElementId) -> &DslElement {
        &self.elements[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> &mut DslElement {
        &mut self.elements[id.0]
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).parent
    }

    /// Kind of a block element, `None` for anything else
    pub fn block_kind(&self, id: ElementId) -> Option<BlockKind> {
        self.get(id).block().map(|block| block.kind)
    }

    /// Block kind used to resolve names declared inside `holder`
    pub fn holder_kind(&self, holder: ElementId) -> BlockKind {
        self.block_kind(holder).unwrap_or(BlockKind::Generic)
    }

    /// Children that were not removed
    pub fn live_children(&self, id: ElementId) -> Vec<ElementId> {
        self.get(id)
            .children()
            .iter()
            .copied()
            .filter(|child| self.get(*child).is_live())
            .collect()
    }

    pub(crate) fn alloc(&mut self, element: DslElement) -> ElementId {
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    fn alloc_parsed(&mut self, mut element: DslElement) -> ElementId {
        element.state = ElementState::Existing;
        self.alloc(element)
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Last live property called `name` (canonical) directly inside `holder`
    pub fn find_property(&self, holder: ElementId, name: &str) -> Option<ElementId> {
        self.get(holder).children().iter().rev().copied().find(|&id| {
            let element = self.get(id);
            element.is_live()
                && element.name == name
                && element.property_type != PropertyType::Variable
                && !matches!(element.kind, ElementKind::Unparsed(_))
        })
    }

    /// Last live `def`/`val` variable called `name` directly inside `holder`
    pub fn find_variable(&self, holder: ElementId, name: &str) -> Option<ElementId> {
        self.get(holder).children().iter().rev().copied().find(|&id| {
            let element = self.get(id);
            element.is_live() && element.name == name && element.property_type == PropertyType::Variable
        })
    }

    pub fn find_block(&self, holder: ElementId, name: &str) -> Option<ElementId> {
        let name = canonical_block_name(name);
        self.get(holder).children().iter().rev().copied().find(|&id| {
            let element = self.get(id);
            element.is_live() && element.is_block() && element.name == name
        })
    }

    /// Find the child block, creating a new empty one when absent
    pub fn ensure_block(&mut self, holder: ElementId, name: &str) -> ElementId {
        if let Some(id) = self.find_block(holder, name) {
            return id;
        }
        let name = canonical_block_name(name).to_string();
        let kind = self.holder_kind(holder).child_kind(&name);
        let id = self.new_block(&name, kind);
        self.set_new_element(holder, id);
        id
    }

    /// Distinct property names inside `holder`, in first-declaration order
    pub fn property_names(&self, holder: ElementId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for id in self.live_children(holder) {
            let element = self.get(id);
            if matches!(element.kind, ElementKind::Unparsed(_)) || element.name.is_empty() {
                continue;
            }
            if !names.contains(&element.name) {
                names.push(element.name.clone());
            }
        }
        names
    }

    /// Holder and canonical name for a dotted path, creating missing blocks
    pub fn resolve_path(&mut self, path: &str) -> (ElementId, String) {
        let parts: Vec<&str> = path.split('.').filter(|part| !part.is_empty()).collect();
        let (last, prefix) = match parts.split_last() {
            Some((last, prefix)) => (*last, prefix),
            None => ("", &[][..]),
        };
        let holder = prefix.iter().fold(self.root, |holder, part| self.ensure_block(holder, part));
        let canonical = self.resolver.canonical(self.holder_kind(holder), last);
        (holder, canonical)
    }

    // ---------------------------------------------------------------
    // Parsed elements
    // ---------------------------------------------------------------

    /// Attach a call-style declaration, applying the holder's aliasing rules
    pub fn add_parsed_element(&mut self, holder: ElementId, element: ElementId) {
        self.attach_parsed(holder, element, false);
    }

    /// Attach an assignment; later assignments win on lookup
    pub fn set_parsed_element(&mut self, holder: ElementId, element: ElementId) {
        self.attach_parsed(holder, element, true);
    }

    fn attach_parsed(&mut self, holder: ElementId, element: ElementId, assignment: bool) {
        let kind = self.holder_kind(holder);
        if kind.forces_assignment() {
            self.get_mut(element).use_assignment = true;
        }
        if self.get(element).property_type == PropertyType::Variable {
            self.push_child(holder, element);
            return;
        }

        let spelling = {
            let element = self.get(element);
            element.external_name.clone().unwrap_or_else(|| element.name.clone())
        };
        let resolved = self.resolver.resolve(kind, &spelling);
        match resolved.semantics {
            // Source directories fan every srcDir/srcDirs spelling into one list
            Semantics::AugmentList if kind == BlockKind::SourceDirectory => self.add_to_parsed_list(holder, element),
            Semantics::AugmentList if !assignment => self.add_to_parsed_list(holder, element),
            Semantics::AugmentMap if !assignment => self.add_to_parsed_map(holder, element),
            _ => self.push_child(holder, element),
        }
    }

    /// Append the values of `element` to the list bound to its name, creating it if needed
    pub fn add_to_parsed_list(&mut self, holder: ElementId, element: ElementId) {
        let name = self.get(element).name.clone();
        let existing = self
            .find_property(holder, &name)
            .filter(|id| matches!(self.get(*id).kind, ElementKind::List(_)));

        let wrapped = match &self.get(element).kind {
            ElementKind::List(_) => element,
            ElementKind::Expression(_) => match self.wrap_in_list(holder, element) {
                Some(list) => list,
                None => return self.push_child(holder, element),
            },
            _ => return self.push_child(holder, element),
        };

        match existing {
            None => self.push_child(holder, wrapped),
            Some(list) => {
                self.merge_collection(list, wrapped);
                debug!("Merged '{}' into existing list in {:?}", name, self.holder_kind(holder));
            }
        }
    }

    /// Merge call-style map declarations (`manifestPlaceholders key: 'v'`)
    pub fn add_to_parsed_map(&mut self, holder: ElementId, element: ElementId) {
        let name = self.get(element).name.clone();
        if !matches!(self.get(element).kind, ElementKind::Map(_)) {
            return self.push_child(holder, element);
        }
        match self
            .find_property(holder, &name)
            .filter(|id| matches!(self.get(*id).kind, ElementKind::Map(_)))
        {
            None => self.push_child(holder, element),
            Some(map) => self.merge_collection(map, element),
        }
    }

    /// Turn a parsed scalar declaration into a one-item list with one segment
    fn wrap_in_list(&mut self, holder: ElementId, element: ElementId) -> Option<ElementId> {
        let source = self.get(element).clone();
        let spans = source.spans.clone()?;
        let inner = spans.value.clone()?;
        let spelling = source.external_name.clone().unwrap_or_else(|| source.name.clone());
        let arity = self.resolver.resolve(self.holder_kind(holder), &spelling).arity;

        let segment = Segment {
            statement: spans.statement.clone(),
            spelling,
            name_span: spans.name.clone(),
            inner,
            style: if source.use_assignment { SegmentStyle::Value } else { SegmentStyle::Args },
            arity,
            dirty: false,
        };
        let mut list = DslElement::new(
            source.name.clone(),
            ElementKind::List(ListElement { items: vec![element], segments: vec![segment] }),
        );
        list.external_name = source.external_name.clone();
        list.use_assignment = source.use_assignment;
        list.spans = Some(ElementSpans { statement: spans.statement, name: spans.name, value: spans.value });
        list.parent = Some(holder);
        let list = self.alloc_parsed(list);

        let item = self.get_mut(element);
        item.name = String::new();
        item.property_type = PropertyType::Derived;
        item.segment = Some(0);
        item.parent = Some(list);
        Some(list)
    }

    /// Move the items and segments of `from` onto the end of `into`
    fn merge_collection(&mut self, into: ElementId, from: ElementId) {
        let (items, segments) = match &mut self.get_mut(from).kind {
            ElementKind::List(list) => (std::mem::take(&mut list.items), std::mem::take(&mut list.segments)),
            ElementKind::Map(map) => (std::mem::take(&mut map.entries), std::mem::take(&mut map.segments)),
            _ => return,
        };
        let offset = self.get(into).segments().len();
        for item in &items {
            let element = self.get_mut(*item);
            element.parent = Some(into);
            element.segment = element.segment.map(|segment| segment + offset);
        }
        let target = self.get_mut(into);
        if let Some(existing) = target.children_mut() {
            existing.extend(items);
        }
        if let Some(existing) = target.segments_mut() {
            existing.extend(segments);
        }
        // The emptied wrapper stays in the arena but is no longer reachable
        self.get_mut(from).parent = Some(into);
    }

    fn push_child(&mut self, holder: ElementId, element: ElementId) {
        self.get_mut(element).parent = Some(holder);
        if let Some(children) = self.get_mut(holder).children_mut() {
            children.push(element);
        }
    }

    /// Find or create the block a parsed statement opens or implies
    pub(crate) fn parsed_child_block(
        &mut self,
        holder: ElementId,
        spelling: &str,
        spans: Option<ElementSpans>,
        body: Option<BlockBody>,
    ) -> ElementId {
        let name = canonical_block_name(spelling).to_string();
        if let Some(existing) = self.find_block(holder, &name) {
            let element = self.get_mut(existing);
            if let Some(body) = body {
                if let ElementKind::Block(block) = &mut element.kind {
                    block.bodies.push(body);
                    if block.is_virtual {
                        block.is_virtual = false;
                        element.spans = spans;
                    }
                }
            }
            return existing;
        }

        let kind = self.holder_kind(holder).child_kind(&name);
        let mut block = BlockElement::new(kind);
        block.is_virtual = body.is_none();
        block.bodies.extend(body);
        let mut element = DslElement::new(name, ElementKind::Block(block));
        element.external_name = Some(spelling.to_string());
        element.spans = if element.block().is_some_and(|b| b.is_virtual) { None } else { spans };
        let id = self.alloc_parsed(element);
        self.push_child(holder, id);
        id
    }

    /// Keep a statement the parser could not model
    pub(crate) fn push_unparsed(&mut self, holder: ElementId, statement: crate::lexer::Span, text: String) {
        let mut element = DslElement::new("", ElementKind::Unparsed(text));
        element.spans = Some(ElementSpans { statement, name: None, value: None });
        let id = self.alloc_parsed(element);
        self.push_child(holder, id);
    }

    pub(crate) fn new_parsed(&mut self, element: DslElement) -> ElementId {
        self.alloc_parsed(element)
    }

    // ---------------------------------------------------------------
    // New elements
    // ---------------------------------------------------------------

    pub fn new_literal(&mut self, name: &str, expr: DslExpr) -> ElementId {
        self.alloc(DslElement::new(name, ElementKind::Expression(expr)))
    }

    pub fn new_list(&mut self, name: &str) -> ElementId {
        self.alloc(DslElement::new(name, ElementKind::List(ListElement::default())))
    }

    pub fn new_map(&mut self, name: &str) -> ElementId {
        self.alloc(DslElement::new(name, ElementKind::Map(MapElement::default())))
    }

    pub fn new_block(&mut self, name: &str, kind: BlockKind) -> ElementId {
        self.alloc(DslElement::new(name, ElementKind::Block(BlockElement::new(kind))))
    }

    /// Insert a new element before the `index`-th live child of `holder`
    pub fn add_new_element_at(&mut self, holder: ElementId, index: usize, element: ElementId) -> Result<(), PropertyError> {
        let live: Vec<usize> = self
            .get(holder)
            .children()
            .iter()
            .enumerate()
            .filter(|(_, id)| {
                let child = self.get(**id);
                child.is_live() && !matches!(child.kind, ElementKind::Unparsed(_))
            })
            .map(|(position, _)| position)
            .collect();
        if index > live.len() {
            return Err(PropertyError::IndexOutOfBounds { index, len: live.len() });
        }
        let position = live.get(index).copied().unwrap_or(self.get(holder).children().len());
        self.prepare_new(holder, element, position);
        if let Some(children) = self.get_mut(holder).children_mut() {
            children.insert(position, element);
        }
        self.notify_changed(element);
        Ok(())
    }

    /// Append a new element, replacing any live property with the same name
    pub fn set_new_element(&mut self, holder: ElementId, element: ElementId) {
        let name = self.get(element).name.clone();
        if !self.holder_kind(holder).keeps_duplicates() && !name.is_empty() {
            let is_block = self.get(element).is_block();
            let existing = if is_block { self.find_block(holder, &name) } else { self.find_property(holder, &name) };
            if let Some(existing) = existing {
                self.remove_element(existing);
            }
        }
        let position = self.get(holder).children().len();
        self.prepare_new(holder, element, position);
        self.push_child(holder, element);
        self.notify_changed(element);
    }

    fn prepare_new(&mut self, holder: ElementId, element: ElementId, position: usize) {
        let derived = matches!(self.get(holder).kind, ElementKind::List(_) | ElementKind::Map(_));
        let use_assignment = derived || (self.declaration_style(holder) && !self.appends_by_call(holder, element));
        let segment = if derived { self.segment_for_position(holder, position) } else { None };
        let el = self.get_mut(element);
        el.parent = Some(holder);
        if derived {
            el.property_type = PropertyType::Derived;
            el.segment = segment;
        }
        if el.spans.is_none() {
            el.use_assignment = use_assignment;
        }
        if let Some(segment) = segment {
            self.mark_segment_dirty(holder, segment);
        }
    }

    /// Segment that receives an item inserted at `position` in a collection
    fn segment_for_position(&self, collection: ElementId, position: usize) -> Option<usize> {
        let element = self.get(collection);
        if element.segments().is_empty() {
            return None;
        }
        let children = element.children();
        let before = children[..position.min(children.len())]
            .iter()
            .rev()
            .find(|id| self.get(**id).is_live())
            .and_then(|id| self.get(*id).segment);
        let after = children
            .iter()
            .skip(position)
            .find(|id| self.get(**id).is_live())
            .and_then(|id| self.get(*id).segment);
        before.or(after).or(Some(element.segments().len() - 1))
    }

    /// Whether a new property in `holder` binds with `=`
    pub fn declaration_style(&self, holder: ElementId) -> bool {
        let kind = self.holder_kind(holder);
        if kind.forces_assignment() || self.dialect().is_assignment_only() {
            return true;
        }
        let inherited = self.get(holder).children().iter().rev().find_map(|id| {
            let element = self.get(*id);
            (element.is_live()
                && element.property_type == PropertyType::Regular
                && matches!(element.kind, ElementKind::Expression(_)))
            .then_some(element.use_assignment)
        });
        inherited.unwrap_or(match self.dialect() {
            GradleDialect::Groovy => self.context.config.groovy_assignment_default,
            GradleDialect::Kotlin | GradleDialect::Declarative => true,
        })
    }

    /// New lists of augmenting names are written as calls (`proguardFiles("a.pro")`)
    /// unless the holder only takes assignments
    fn appends_by_call(&self, holder: ElementId, element: ElementId) -> bool {
        let kind = self.holder_kind(holder);
        let list = self.get(element);
        matches!(list.kind, ElementKind::List(_))
            && !kind.forces_assignment()
            && !self.dialect().is_assignment_only()
            && self.resolver().is_list_property(kind, &list.name)
    }

    /// Delete an element; parsed elements are marked, new ones detached
    pub fn remove_element(&mut self, id: ElementId) {
        let element = self.get(id);
        let parent = element.parent;
        let segment = element.segment;
        if element.state == ElementState::New {
            if let Some(children) = parent.and_then(|p| self.get_mut(p).children_mut()) {
                children.retain(|child| *child != id);
            }
        } else {
            self.get_mut(id).state = ElementState::Removed;
        }
        if let (Some(parent), Some(segment)) = (parent, segment) {
            self.mark_segment_dirty(parent, segment);
        }
        self.notify_changed(id);
    }

    /// Rename an element to a new spelling
    pub fn rename_element(&mut self, id: ElementId, spelling: &str) {
        let kind = self.get(id).parent.map(|p| self.holder_kind(p)).unwrap_or(BlockKind::Generic);
        let canonical = if self.get(id).is_block() {
            canonical_block_name(spelling).to_string()
        } else {
            self.resolver.canonical(kind, spelling)
        };
        let element = self.get_mut(id);
        element.name = canonical;
        element.external_name = Some(spelling.to_string());
        if element.state != ElementState::New {
            element.renamed = true;
        }
        self.notify_changed(id);
    }

    /// Replace the expression of a scalar element
    pub(crate) fn set_expr(&mut self, id: ElementId, expr: DslExpr) {
        let element = self.get_mut(id);
        if element.expr() == Some(&expr) {
            return;
        }
        element.kind = ElementKind::Expression(expr);
        self.mark_modified(id);
    }

    /// Replace an element's value with one of a different shape
    pub(crate) fn replace_kind(&mut self, id: ElementId, kind: ElementKind) {
        let element = self.get_mut(id);
        element.kind = kind;
        if element.state != ElementState::New {
            element.replaced = true;
        }
        self.mark_modified(id);
    }

    pub(crate) fn mark_modified(&mut self, id: ElementId) {
        let element = self.get_mut(id);
        if element.state == ElementState::Existing {
            element.state = ElementState::Modified;
        }
        let (parent, segment) = (element.parent, element.segment);
        if let (Some(parent), Some(segment)) = (parent, segment) {
            self.mark_segment_dirty(parent, segment);
        }
        self.notify_changed(id);
    }

    pub(crate) fn mark_segment_dirty(&mut self, collection: ElementId, segment: usize) {
        if let Some(segment) = self.get_mut(collection).segments_mut().and_then(|s| s.get_mut(segment)) {
            segment.dirty = true;
        }
    }

    fn notify_changed(&self, id: ElementId) {
        let qualified_name = self.qualified_name(id);
        debug!("Property changed: {}", qualified_name);
        self.context.events.emit(Event::PropertyChanged { qualified_name });
    }

    // ---------------------------------------------------------------
    // Naming and state
    // ---------------------------------------------------------------

    /// Dotted path from the root, with `[i]` for list items
    pub fn qualified_name(&self, id: ElementId) -> String {
        let element = self.get(id);
        let Some(parent) = element.parent else { return String::new() };
        let prefix = self.qualified_name(parent);
        if let ElementKind::List(list) = &self.get(parent).kind {
            let index = list
                .items
                .iter()
                .filter(|item| self.get(**item).is_live())
                .position(|item| *item == id)
                .unwrap_or(list.items.len());
            return format!("{}[{}]", prefix, index);
        }
        if prefix.is_empty() {
            element.name.clone()
        } else {
            format!("{}.{}", prefix, element.name)
        }
    }

    /// Whether any reachable element differs from the parsed document
    pub fn is_modified(&self) -> bool {
        self.subtree_modified(self.root)
    }

    pub fn subtree_modified(&self, id: ElementId) -> bool {
        let element = self.get(id);
        if element.state != ElementState::Existing || element.renamed || element.replaced {
            // Empty new blocks are never written
            return !(element.state == ElementState::New && element.is_block() && !self.is_significant(id));
        }
        element.segments().iter().any(|segment| segment.dirty)
            || element.children().iter().any(|child| self.subtree_modified(*child))
    }

    /// Whether a new element would produce any text
    pub fn is_significant(&self, id: ElementId) -> bool {
        let element = self.get(id);
        if !element.is_live() {
            return false;
        }
        match &element.kind {
            ElementKind::Block(block) => block.children.iter().any(|child| self.is_significant(*child)),
            _ => true,
        }
    }

    /// Every element reachable from the root
    pub fn reachable(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.get(id).children().iter().rev().copied());
        }
        out
    }
}
