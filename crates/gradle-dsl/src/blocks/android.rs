//! `android { }` and its flavor and build type blocks

use crate::property::PropertyModel;

use super::source_set::SourceSetModel;

typed_block!(
    /// The `android` block
    AndroidModel
);

impl AndroidModel<'_> {
    pub fn namespace(&mut self) -> PropertyModel<'_> {
        self.property("namespace")
    }

    pub fn compile_sdk(&mut self) -> PropertyModel<'_> {
        self.property("compileSdk")
    }

    pub fn build_tools_version(&mut self) -> PropertyModel<'_> {
        self.property("buildToolsVersion")
    }

    pub fn flavor_dimensions(&mut self) -> PropertyModel<'_> {
        self.property("flavorDimensions")
    }

    pub fn default_config(&mut self) -> ProductFlavorModel<'_> {
        let id = self.child_block("defaultConfig");
        ProductFlavorModel::new(self.tree_mut(), id)
    }

    /// Names of the declared build types
    pub fn build_types(&self) -> Vec<String> {
        self.container_children("buildTypes")
    }

    pub fn build_type(&mut self, name: &str) -> BuildTypeModel<'_> {
        let id = self.container_child("buildTypes", name);
        BuildTypeModel::new(self.tree_mut(), id)
    }

    pub fn add_build_type(&mut self, name: &str) -> BuildTypeModel<'_> {
        self.build_type(name)
    }

    pub fn remove_build_type(&mut self, name: &str) -> bool {
        self.remove_container_child("buildTypes", name)
    }

    /// Names of the declared product flavors
    pub fn product_flavors(&self) -> Vec<String> {
        self.container_children("productFlavors")
    }

    pub fn product_flavor(&mut self, name: &str) -> ProductFlavorModel<'_> {
        let id = self.container_child("productFlavors", name);
        ProductFlavorModel::new(self.tree_mut(), id)
    }

    pub fn add_product_flavor(&mut self, name: &str) -> ProductFlavorModel<'_> {
        self.product_flavor(name)
    }

    pub fn remove_product_flavor(&mut self, name: &str) -> bool {
        self.remove_container_child("productFlavors", name)
    }

    /// Names of the declared source sets
    pub fn source_sets(&self) -> Vec<String> {
        self.container_children("sourceSets")
    }

    pub fn source_set(&mut self, name: &str) -> SourceSetModel<'_> {
        let id = self.container_child("sourceSets", name);
        SourceSetModel::new(self.tree_mut(), id)
    }
}

typed_block!(
    /// A product flavor, or `defaultConfig`
    ProductFlavorModel
);

impl ProductFlavorModel<'_> {
    pub fn application_id(&mut self) -> PropertyModel<'_> {
        self.property("applicationId")
    }

    pub fn min_sdk(&mut self) -> PropertyModel<'_> {
        self.property("minSdk")
    }

    pub fn target_sdk(&mut self) -> PropertyModel<'_> {
        self.property("targetSdk")
    }

    pub fn max_sdk(&mut self) -> PropertyModel<'_> {
        self.property("maxSdk")
    }

    pub fn version_code(&mut self) -> PropertyModel<'_> {
        self.property("versionCode")
    }

    pub fn version_name(&mut self) -> PropertyModel<'_> {
        self.property("versionName")
    }

    pub fn dimension(&mut self) -> PropertyModel<'_> {
        self.property("dimension")
    }

    pub fn test_instrumentation_runner(&mut self) -> PropertyModel<'_> {
        self.property("testInstrumentationRunner")
    }

    pub fn proguard_files(&mut self) -> PropertyModel<'_> {
        self.property("proguardFiles")
    }

    pub fn consumer_proguard_files(&mut self) -> PropertyModel<'_> {
        self.property("consumerProguardFiles")
    }

    pub fn manifest_placeholders(&mut self) -> PropertyModel<'_> {
        self.property("manifestPlaceholders")
    }

    pub fn matching_fallbacks(&mut self) -> PropertyModel<'_> {
        self.property("matchingFallbacks")
    }
}

typed_block!(
    /// One entry of `buildTypes`
    BuildTypeModel
);

impl BuildTypeModel<'_> {
    pub fn minify_enabled(&mut self) -> PropertyModel<'_> {
        self.property("minifyEnabled")
    }

    pub fn shrink_resources(&mut self) -> PropertyModel<'_> {
        self.property("shrinkResources")
    }

    pub fn debuggable(&mut self) -> PropertyModel<'_> {
        self.property("debuggable")
    }

    pub fn application_id_suffix(&mut self) -> PropertyModel<'_> {
        self.property("applicationIdSuffix")
    }

    pub fn version_name_suffix(&mut self) -> PropertyModel<'_> {
        self.property("versionNameSuffix")
    }

    pub fn proguard_files(&mut self) -> PropertyModel<'_> {
        self.property("proguardFiles")
    }

    pub fn manifest_placeholders(&mut self) -> PropertyModel<'_> {
        self.property("manifestPlaceholders")
    }
}
