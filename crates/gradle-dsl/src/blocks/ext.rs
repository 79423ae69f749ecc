//! Extra properties (`ext { }` in Groovy, `extra["name"]` in Kotlin)

use crate::property::PropertyModel;

typed_block!(
    /// The `ext` block; every property binds with `=`
    ExtModel
);

impl ExtModel<'_> {
    pub fn find_property(&mut self, name: &str) -> PropertyModel<'_> {
        self.property(name)
    }
}
