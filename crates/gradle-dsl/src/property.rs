//! Property Models
//!
//! [`PropertyModel`] is a read/write view of one property inside one block.
//! It is created on demand, holds no state of its own and writes every
//! change straight into the element graph.

use indexmap::IndexMap;

use crate::element::{ElementId, ElementKind, ListElement, MapElement, PropertyType};
use crate::resolve::{ValueDependency, ValueResolver};
use crate::tree::DslTree;
use crate::value::{DslExpr, ResolvedValue, ValueType};

/// Property errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("Cannot write a {attempted} to '{name}', which holds a {existing}")]
    KindMismatch {
        name: String,
        existing: &'static str,
        attempted: &'static str,
    },
    #[error("Index {index} is out of bounds for {len} items")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("List item '{0}' cannot be renamed")]
    CannotRename(String),
}

/// View of one property path
pub struct PropertyModel<'a> {
    tree: &'a mut DslTree,
    holder: ElementId,
    name: String,
    property_type: PropertyType,
    element: Option<ElementId>,
}

impl<'a> PropertyModel<'a> {
    /// Bind to the property spelled `spelling` inside `holder`
    pub fn new(tree: &'a mut DslTree, holder: ElementId, spelling: &str) -> Self {
        let name = tree.resolver().canonical(tree.holder_kind(holder), spelling);
        let element = tree.find_property(holder, &name);
        Self { tree, holder, name, property_type: PropertyType::Regular, element }
    }

    /// Bind to a `def`/`val` variable inside `holder`
    pub fn variable(tree: &'a mut DslTree, holder: ElementId, name: &str) -> Self {
        let element = tree.find_variable(holder, name);
        Self { tree, holder, name: name.to_string(), property_type: PropertyType::Variable, element }
    }

    /// Bind to an existing element
    pub fn for_element(tree: &'a mut DslTree, id: ElementId) -> Self {
        let element = tree.get(id);
        let holder = element.parent.unwrap_or(tree.root());
        let name = element.name.clone();
        let property_type = element.property_type;
        Self { tree, holder, name, property_type, element: Some(id) }
    }

    /// Name within the holder; list items use their index
    pub fn name(&self) -> String {
        match self.element {
            Some(id) if self.is_list_item() => {
                let qualified = self.tree.qualified_name(id);
                qualified
                    .rsplit_once('[')
                    .map(|(_, index)| index.trim_end_matches(']').to_string())
                    .unwrap_or_default()
            }
            _ => self.name.clone(),
        }
    }

    pub fn fully_qualified_name(&self) -> String {
        match self.element {
            Some(id) => self.tree.qualified_name(id),
            None => {
                let prefix = self.tree.qualified_name(self.holder);
                if prefix.is_empty() {
                    self.name.clone()
                } else {
                    format!("{}.{}", prefix, self.name)
                }
            }
        }
    }

    pub fn element_id(&self) -> Option<ElementId> {
        self.element
    }

    pub fn exists(&self) -> bool {
        self.element.is_some()
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn value_type(&self) -> ValueType {
        self.element
            .map(|id| self.tree.get(id).kind.value_type())
            .unwrap_or(ValueType::None)
    }

    /// Value with references followed
    pub fn value(&self) -> ResolvedValue {
        self.element
            .map(|id| ValueResolver::new(&*self.tree).resolve(id))
            .unwrap_or(ResolvedValue::Absent)
    }

    /// Value as written; references are not followed
    pub fn raw_value(&self) -> ResolvedValue {
        self.element
            .map(|id| ValueResolver::new(&*self.tree).raw(id))
            .unwrap_or(ResolvedValue::Absent)
    }

    /// Every reference the value makes and the element each one names
    pub fn dependencies(&self) -> Vec<ValueDependency> {
        self.element
            .map(|id| ValueResolver::new(&*self.tree).dependencies(id))
            .unwrap_or_default()
    }

    pub fn string_value(&self) -> Option<String> {
        self.value().as_str().map(str::to_string)
    }

    pub fn int_value(&self) -> Option<i64> {
        self.value().as_i64()
    }

    pub fn bool_value(&self) -> Option<bool> {
        self.value().as_bool()
    }

    /// Write a scalar, creating the property when absent
    pub fn set_value(&mut self, value: impl Into<DslExpr>) -> Result<(), PropertyError> {
        let expr = value.into();
        match self.element {
            None => {
                let id = self.tree.new_literal(&self.name, expr);
                self.tree.get_mut(id).property_type = self.property_type;
                self.tree.set_new_element(self.holder, id);
                self.element = Some(id);
                Ok(())
            }
            Some(id) => match &self.tree.get(id).kind {
                ElementKind::Expression(_) => {
                    self.tree.set_expr(id, expr);
                    Ok(())
                }
                other => Err(self.mismatch(other.describe(), "scalar")),
            },
        }
    }

    /// Write a bare reference expression such as `rootProject.ext.minSdk`
    pub fn set_reference(&mut self, reference: impl Into<String>) -> Result<(), PropertyError> {
        self.set_value(DslExpr::reference(reference))
    }

    // ---------------------------------------------------------------
    // Lists
    // ---------------------------------------------------------------

    /// Items of a list value; empty for anything else
    pub fn list_values(&self) -> Vec<ResolvedValue> {
        match self.value() {
            ResolvedValue::List(items) => items,
            _ => Vec::new(),
        }
    }

    /// Replace the whole list
    pub fn set_list<I, V>(&mut self, values: I) -> Result<(), PropertyError>
    where
        I: IntoIterator<Item = V>,
        V: Into<DslExpr>,
    {
        let list = self.ensure_list()?;
        for item in self.tree.live_children(list) {
            self.tree.remove_element(item);
        }
        for value in values {
            self.insert_item(list, None, value.into())?;
        }
        Ok(())
    }

    pub fn add_to_list(&mut self, value: impl Into<DslExpr>) -> Result<(), PropertyError> {
        let list = self.ensure_list()?;
        self.insert_item(list, None, value.into()).map(|_| ())
    }

    /// Insert before the `index`-th item; `index == len` appends
    pub fn add_list_value_at(&mut self, index: usize, value: impl Into<DslExpr>) -> Result<(), PropertyError> {
        let list = self.ensure_list()?;
        self.insert_item(list, Some(index), value.into()).map(|_| ())
    }

    /// Remove the first item equal to `value`
    pub fn remove_from_list(&mut self, value: impl Into<DslExpr>) -> Result<bool, PropertyError> {
        let Some(list) = self.existing_list()? else { return Ok(false) };
        let expr = value.into();
        match self.find_item(list, &expr) {
            Some(item) => {
                self.tree.remove_element(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the first item equal to `old` with `new`
    pub fn replace_in_list(&mut self, old: impl Into<DslExpr>, new: impl Into<DslExpr>) -> Result<bool, PropertyError> {
        let Some(list) = self.existing_list()? else { return Ok(false) };
        let old = old.into();
        match self.find_item(list, &old) {
            Some(item) => {
                self.tree.set_expr(item, new.into());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Model of the `index`-th live list item
    pub fn list_item(&mut self, index: usize) -> Option<PropertyModel<'_>> {
        let list = self.element.filter(|id| matches!(self.tree.get(*id).kind, ElementKind::List(_)))?;
        let item = self.tree.live_children(list).get(index).copied()?;
        Some(PropertyModel::for_element(&mut *self.tree, item))
    }

    /// Make the property an empty list, whatever it held before
    pub fn convert_to_empty_list(&mut self) -> Result<(), PropertyError> {
        match self.element.map(|id| (id, self.tree.get(id).kind.clone())) {
            None => {
                self.ensure_list()?;
            }
            Some((id, ElementKind::List(_))) => {
                for item in self.tree.live_children(id) {
                    self.tree.remove_element(item);
                }
            }
            Some((id, ElementKind::Expression(_) | ElementKind::Map(_))) => {
                self.tree.replace_kind(id, ElementKind::List(ListElement::default()));
            }
            Some((_, other)) => return Err(self.mismatch(other.describe(), "list")),
        }
        Ok(())
    }

    fn ensure_list(&mut self) -> Result<ElementId, PropertyError> {
        if let Some(list) = self.existing_list()? {
            return Ok(list);
        }
        let id = self.tree.new_list(&self.name);
        self.tree.get_mut(id).property_type = self.property_type;
        self.tree.set_new_element(self.holder, id);
        self.element = Some(id);
        Ok(id)
    }

    fn existing_list(&self) -> Result<Option<ElementId>, PropertyError> {
        match self.element {
            None => Ok(None),
            Some(id) => match &self.tree.get(id).kind {
                ElementKind::List(_) => Ok(Some(id)),
                other => Err(self.mismatch(other.describe(), "list")),
            },
        }
    }

    fn insert_item(&mut self, list: ElementId, index: Option<usize>, expr: DslExpr) -> Result<ElementId, PropertyError> {
        let index = index.unwrap_or_else(|| self.tree.live_children(list).len());
        let item = self.tree.new_literal("", expr);
        self.tree.add_new_element_at(list, index, item)?;
        Ok(item)
    }

    fn find_item(&self, list: ElementId, expr: &DslExpr) -> Option<ElementId> {
        self.tree
            .live_children(list)
            .into_iter()
            .find(|item| self.tree.get(*item).expr() == Some(expr))
    }

    fn is_list_item(&self) -> bool {
        self.element
            .and_then(|id| self.tree.parent(id))
            .is_some_and(|parent| matches!(self.tree.get(parent).kind, ElementKind::List(_)))
    }

    // ---------------------------------------------------------------
    // Maps
    // ---------------------------------------------------------------

    pub fn map_values(&self) -> IndexMap<String, ResolvedValue> {
        match self.value() {
            ResolvedValue::Map(entries) => entries,
            _ => IndexMap::new(),
        }
    }

    /// Set one map entry, creating the map when absent
    pub fn set_map_value(&mut self, key: &str, value: impl Into<DslExpr>) -> Result<(), PropertyError> {
        let map = self.ensure_map()?;
        let expr = value.into();
        let existing = self.tree.live_children(map).into_iter().rev().find(|id| self.tree.get(*id).name == key);
        match existing {
            Some(entry) if matches!(self.tree.get(entry).kind, ElementKind::Expression(_)) => {
                self.tree.set_expr(entry, expr);
            }
            _ => {
                let entry = self.tree.new_literal(key, expr);
                self.tree.set_new_element(map, entry);
            }
        }
        Ok(())
    }

    pub fn remove_map_value(&mut self, key: &str) -> Result<bool, PropertyError> {
        let map = match self.element {
            None => return Ok(false),
            Some(id) => match &self.tree.get(id).kind {
                ElementKind::Map(_) => id,
                other => return Err(self.mismatch(other.describe(), "map")),
            },
        };
        let entries: Vec<ElementId> = self
            .tree
            .live_children(map)
            .into_iter()
            .filter(|id| self.tree.get(*id).name == key)
            .collect();
        for entry in &entries {
            self.tree.remove_element(*entry);
        }
        Ok(!entries.is_empty())
    }

    /// Make the property an empty map, whatever it held before
    pub fn convert_to_empty_map(&mut self) -> Result<(), PropertyError> {
        match self.element.map(|id| (id, self.tree.get(id).kind.clone())) {
            None => {
                self.ensure_map()?;
            }
            Some((id, ElementKind::Map(_))) => {
                for entry in self.tree.live_children(id) {
                    self.tree.remove_element(entry);
                }
            }
            Some((id, ElementKind::Expression(_) | ElementKind::List(_))) => {
                self.tree.replace_kind(id, ElementKind::Map(MapElement::default()));
            }
            Some((_, other)) => return Err(self.mismatch(other.describe(), "map")),
        }
        Ok(())
    }

    fn ensure_map(&mut self) -> Result<ElementId, PropertyError> {
        match self.element {
            Some(id) => match &self.tree.get(id).kind {
                ElementKind::Map(_) => Ok(id),
                other => Err(self.mismatch(other.describe(), "map")),
            },
            None => {
                let id = self.tree.new_map(&self.name);
                self.tree.get_mut(id).property_type = self.property_type;
                self.tree.set_new_element(self.holder, id);
                self.element = Some(id);
                Ok(id)
            }
        }
    }

    // ---------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------

    /// Remove the property, including earlier declarations of the same name
    pub fn delete(&mut self) {
        let Some(id) = self.element.take() else { return };
        if self.tree.get(id).property_type == PropertyType::Derived {
            self.tree.remove_element(id);
            return;
        }
        let name = self.tree.get(id).name.clone();
        let property_type = self.property_type;
        let doomed: Vec<ElementId> = self
            .tree
            .live_children(self.holder)
            .into_iter()
            .filter(|child| {
                let element = self.tree.get(*child);
                element.name == name && element.property_type == property_type && !element.is_block()
            })
            .collect();
        for child in doomed {
            self.tree.remove_element(child);
        }
        if self.tree.get(id).is_live() {
            self.tree.remove_element(id);
        }
    }

    pub fn rename(&mut self, new_name: &str) -> Result<(), PropertyError> {
        if self.is_list_item() {
            return Err(PropertyError::CannotRename(self.fully_qualified_name()));
        }
        match self.element {
            Some(id) => {
                self.tree.rename_element(id, new_name);
                self.name = self.tree.get(id).name.clone();
            }
            None => self.name = self.tree.resolver().canonical(self.tree.holder_kind(self.holder), new_name),
        }
        Ok(())
    }

    /// Whether the property differs from the parsed document
    pub fn is_modified(&self) -> bool {
        self.element.is_some_and(|id| self.tree.subtree_modified(id))
    }

    fn mismatch(&self, existing: &'static str, attempted: &'static str) -> PropertyError {
        PropertyError::KindMismatch { name: self.fully_qualified_name(), existing, attempted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DslContext;
    use crate::element::ElementState;
    use crate::parser::DslParser;

    fn parse(text: &str) -> DslTree {
        DslParser::parse_string(text, DslContext::default()).unwrap()
    }

    fn block(tree: &DslTree, name: &str) -> ElementId {
        tree.find_block(tree.root(), name).unwrap()
    }

    #[test]
    fn test_read_and_set() {
        let mut tree = parse("android {\n  compileSdkVersion 33\n}");
        let android = block(&tree, "android");
        let mut property = PropertyModel::new(&mut tree, android, "compileSdk");
        assert_eq!(property.int_value(), Some(33));
        assert_eq!(property.value_type(), ValueType::Integer);
        assert_eq!(property.fully_qualified_name(), "android.compileSdk");

        property.set_value(34).unwrap();
        assert_eq!(property.int_value(), Some(34));
        assert!(property.is_modified());
    }

    #[test]
    fn test_set_absent_creates_element() {
        let mut tree = parse("android {\n}");
        let android = block(&tree, "android");
        let mut property = PropertyModel::new(&mut tree, android, "namespace");
        assert_eq!(property.value(), ResolvedValue::Absent);
        assert_eq!(property.value_type(), ValueType::None);
        property.set_value("com.example").unwrap();
        let id = property.element_id().unwrap();
        assert_eq!(tree.get(id).state, ElementState::New);
        assert_eq!(tree.find_property(android, "namespace"), Some(id));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut tree = parse("a {\n  x 1\n  l = ['p']\n  b {\n  }\n}");
        let a = block(&tree, "a");
        let mut scalar = PropertyModel::new(&mut tree, a, "x");
        assert!(matches!(
            scalar.add_to_list("v"),
            Err(PropertyError::KindMismatch { existing: "scalar", attempted: "list", .. })
        ));
        let mut list = PropertyModel::new(&mut tree, a, "l");
        assert!(matches!(
            list.set_value("v"),
            Err(PropertyError::KindMismatch { existing: "list", attempted: "scalar", .. })
        ));
        let b = tree.find_block(a, "b").unwrap();
        let mut nested = PropertyModel::for_element(&mut tree, b);
        assert!(nested.set_value(1).is_err());
        assert!(nested.set_list(["x"]).is_err());
    }

    #[test]
    fn test_list_operations_keep_order() {
        let mut tree = parse("a {\n  l = ['x', 'y', 'x']\n}");
        let a = block(&tree, "a");
        let mut list = PropertyModel::new(&mut tree, a, "l");
        list.add_to_list("z").unwrap();
        list.add_list_value_at(1, "w").unwrap();
        assert_eq!(list.value().strings(), vec!["x", "w", "y", "x", "z"]);

        assert!(list.remove_from_list("x").unwrap());
        assert_eq!(list.value().strings(), vec!["w", "y", "x", "z"]);
        assert!(list.replace_in_list("y", "q").unwrap());
        assert!(!list.replace_in_list("nope", "q").unwrap());
        assert_eq!(list.value().strings(), vec!["w", "q", "x", "z"]);

        assert!(matches!(list.add_list_value_at(9, "v"), Err(PropertyError::IndexOutOfBounds { index: 9, len: 4 })));
    }

    #[test]
    fn test_add_then_remove_restores_list() {
        let mut tree = parse("a {\n  l = ['x', 'y']\n}");
        let a = block(&tree, "a");
        let mut list = PropertyModel::new(&mut tree, a, "l");
        list.add_to_list("y").unwrap();
        assert!(list.remove_from_list("y").unwrap());
        assert_eq!(list.value().strings(), vec!["x", "y"]);
    }

    #[test]
    fn test_list_item_model() {
        let mut tree = parse("a {\n  l = ['x', 'y']\n}");
        let a = block(&tree, "a");
        let mut list = PropertyModel::new(&mut tree, a, "l");
        let mut item = list.list_item(1).unwrap();
        assert_eq!(item.name(), "1");
        assert_eq!(item.fully_qualified_name(), "a.l[1]");
        assert_eq!(item.property_type(), PropertyType::Derived);
        assert!(matches!(item.rename("z"), Err(PropertyError::CannotRename(_))));
        item.set_value("v").unwrap();
        assert_eq!(list.value().strings(), vec!["x", "v"]);
    }

    #[test]
    fn test_convert_to_empty_list() {
        let mut tree = parse("a {\n  x 1\n}");
        let a = block(&tree, "a");
        let mut property = PropertyModel::new(&mut tree, a, "x");
        property.convert_to_empty_list().unwrap();
        assert_eq!(property.value_type(), ValueType::List);
        property.add_to_list(2).unwrap();
        assert_eq!(property.value(), ResolvedValue::List(vec![ResolvedValue::from(2i64)]));
    }

    #[test]
    fn test_map_operations() {
        let mut tree = parse("a {\n  m = [k: 'v', j: 1]\n}");
        let a = block(&tree, "a");
        let mut map = PropertyModel::new(&mut tree, a, "m");
        map.set_map_value("k", "w").unwrap();
        map.set_map_value("n", true).unwrap();
        assert!(map.remove_map_value("j").unwrap());
        assert!(!map.remove_map_value("j").unwrap());
        let values = map.map_values();
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["k", "n"]);
        assert_eq!(values["k"], ResolvedValue::from("w"));

        let mut fresh = PropertyModel::new(&mut tree, a, "placeholders");
        fresh.convert_to_empty_map().unwrap();
        assert_eq!(fresh.value_type(), ValueType::Map);
    }

    #[test]
    fn test_delete_removes_every_declaration() {
        let mut tree = parse("android {\n  compileSdkVersion 31\n  compileSdk = 34\n}");
        let android = block(&tree, "android");
        let mut property = PropertyModel::new(&mut tree, android, "compileSdk");
        property.delete();
        assert!(!property.exists());
        assert!(tree.find_property(android, "compileSdk").is_none());
    }

    #[test]
    fn test_rename() {
        let mut tree = parse("a {\n  x 1\n}");
        let a = block(&tree, "a");
        let mut property = PropertyModel::new(&mut tree, a, "x");
        property.rename("y").unwrap();
        assert_eq!(property.name(), "y");
        assert!(tree.find_property(a, "y").is_some());
    }

    #[test]
    fn test_reference_value() {
        let mut tree = parse("def v = 3\na {\n  x 1\n}");
        let a = block(&tree, "a");
        let mut property = PropertyModel::new(&mut tree, a, "x");
        property.set_reference("v").unwrap();
        assert_eq!(property.raw_value(), ResolvedValue::Unresolved { reference: "v".into() });
        assert_eq!(property.int_value(), Some(3));
        assert_eq!(property.value_type(), ValueType::Reference);
    }

    #[test]
    fn test_dependencies() {
        let mut tree = parse("ext {\n  minSdk = 21\n  kotlin = '1.9'\n}\nandroid {\n  defaultConfig {\n    minSdkVersion rootProject.ext.minSdk\n    versionName \"v${kotlin}-$missing\"\n    resConfigs kotlin, 'en'\n    versionCode 3\n  }\n}");
        let ext = block(&tree, "ext");
        let min_sdk = tree.find_property(ext, "minSdk");
        let kotlin = tree.find_property(ext, "kotlin");
        let android = block(&tree, "android");
        let config = tree.find_block(android, "defaultConfig").unwrap();

        let dependencies = PropertyModel::new(&mut tree, config, "minSdkVersion").dependencies();
        assert_eq!(dependencies, vec![ValueDependency { reference: "rootProject.ext.minSdk".into(), target: min_sdk }]);

        let dependencies = PropertyModel::new(&mut tree, config, "versionName").dependencies();
        assert_eq!(
            dependencies,
            vec![
                ValueDependency { reference: "kotlin".into(), target: kotlin },
                ValueDependency { reference: "missing".into(), target: None },
            ]
        );

        let dependencies = PropertyModel::new(&mut tree, config, "resConfigs").dependencies();
        assert_eq!(dependencies, vec![ValueDependency { reference: "kotlin".into(), target: kotlin }]);
        assert!(PropertyModel::new(&mut tree, config, "versionCode").dependencies().is_empty());
        assert!(PropertyModel::new(&mut tree, config, "absent").dependencies().is_empty());
    }

    #[test]
    fn test_variable_model() {
        let mut tree = parse("def v = 3\n");
        let root = tree.root();
        let mut variable = PropertyModel::variable(&mut tree, root, "v");
        assert_eq!(variable.property_type(), PropertyType::Variable);
        variable.set_value(4).unwrap();
        assert_eq!(variable.int_value(), Some(4));
    }
}
