//! JVM application and library blocks: declarative `javaApplication` /
//! `javaLibrary`, and the `application` block of Groovy and Kotlin scripts

use crate::property::PropertyModel;

use super::dependencies::DependenciesModel;

typed_block!(
    /// `javaApplication`, `javaLibrary` or `application`
    JavaApplicationModel
);

impl JavaApplicationModel<'_> {
    pub fn java_version(&mut self) -> PropertyModel<'_> {
        self.property("javaVersion")
    }

    /// `mainClass`, or the older `mainClassName`
    pub fn main_class(&mut self) -> PropertyModel<'_> {
        self.property("mainClass")
    }

    pub fn dependencies(&mut self) -> DependenciesModel<'_> {
        let id = self.child_block("dependencies");
        DependenciesModel::new(self.tree_mut(), id)
    }
}
