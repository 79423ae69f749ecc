//! Block Models
//!
//! Typed views over blocks of the element graph. A view holds the tree
//! mutably for its lifetime and finds child blocks and properties only
//! when asked; a missing block is created empty and stays out of the
//! document until something is written into it.

use crate::description::BlockKind;
use crate::element::{ElementId, ElementKind};
use crate::property::PropertyModel;
use crate::tree::DslTree;

/// Declares a typed view that derefs to [`BlockModel`]
macro_rules! typed_block {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<'a>(crate::blocks::BlockModel<'a>);

        impl<'a> $name<'a> {
            pub fn new(tree: &'a mut crate::tree::DslTree, id: crate::element::ElementId) -> Self {
                Self(crate::blocks::BlockModel::new(tree, id))
            }
        }

        impl<'a> std::ops::Deref for $name<'a> {
            type Target = crate::blocks::BlockModel<'a>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<'a> std::ops::DerefMut for $name<'a> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}

mod android;
mod dependencies;
mod ext;
mod jvm;
mod plugins;
mod settings;
mod source_set;

pub use android::{AndroidModel, BuildTypeModel, ProductFlavorModel};
pub use dependencies::{ArtifactDependency, ArtifactDependencySpec, DependenciesModel};
pub use ext::ExtModel;
pub use jvm::JavaApplicationModel;
pub use plugins::PluginsModel;
pub use settings::{module_path, SettingsModel};
pub use source_set::{SourceDirectoryModel, SourceSetModel};

/// Generic view of one block
pub struct BlockModel<'a> {
    tree: &'a mut DslTree,
    id: ElementId,
}

impl<'a> BlockModel<'a> {
    pub fn new(tree: &'a mut DslTree, id: ElementId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.tree.get(self.id).name
    }

    pub fn kind(&self) -> BlockKind {
        self.tree.holder_kind(self.id)
    }

    pub fn tree(&self) -> &DslTree {
        &*self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut DslTree {
        &mut *self.tree
    }

    /// Property of this block under any of its spellings
    pub fn property(&mut self, name: &str) -> PropertyModel<'_> {
        PropertyModel::new(&mut *self.tree, self.id, name)
    }

    /// Child block, created empty when absent
    pub fn block(&mut self, name: &str) -> BlockModel<'_> {
        let id = self.child_block(name);
        BlockModel::new(&mut *self.tree, id)
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.tree.find_block(self.id, name).is_some()
    }

    pub(crate) fn child_block(&mut self, name: &str) -> ElementId {
        self.tree.ensure_block(self.id, name)
    }

    /// Canonical names of the properties declared in this block
    pub fn property_names(&self) -> Vec<String> {
        self.tree
            .property_names(self.id)
            .into_iter()
            .filter(|name| self.tree.find_property(self.id, name).is_some())
            .collect()
    }

    /// Names of the child blocks of a named container such as `buildTypes`
    pub(crate) fn container_children(&self, container: &str) -> Vec<String> {
        let Some(container) = self.tree.find_block(self.id, container) else { return Vec::new() };
        self.tree
            .live_children(container)
            .into_iter()
            .filter(|child| matches!(self.tree.get(*child).kind, ElementKind::Block(_)))
            .map(|child| self.tree.get(child).name.clone())
            .collect()
    }

    /// Remove a child of a named container; returns whether it existed
    pub(crate) fn remove_container_child(&mut self, container: &str, name: &str) -> bool {
        let Some(container) = self.tree.find_block(self.id, container) else { return false };
        match self.tree.find_block(container, name) {
            Some(child) => {
                self.tree.remove_element(child);
                true
            }
            None => false,
        }
    }

    /// Child of a named container, created with the container when absent
    pub(crate) fn container_child(&mut self, container: &str, name: &str) -> ElementId {
        let container = self.child_block(container);
        self.tree.ensure_block(container, name)
    }

    /// Delete the block and everything in it
    pub fn delete(self) {
        self.tree.remove_element(self.id);
    }
}
