//! Block Registry
//!
//! Maps block names to the kind of element that models them. Each kind
//! carries a table of the child blocks it knows about; names are unique
//! within one table.

use serde::Serialize;

/// Kind of a block element, which decides name resolution and aliasing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    /// The build file itself
    File,
    Plugins,
    Android,
    DefaultConfig,
    ProductFlavors,
    ProductFlavor,
    BuildTypes,
    BuildType,
    SourceSets,
    SourceSet,
    /// `java`, `res`, `jniLibs`, ... inside a source set
    SourceDirectory,
    /// `javaApplication`, `javaLibrary`, `application`
    JavaApplication,
    Dependencies,
    Ext,
    /// Any block without a registered model
    Generic,
}

/// Registration entry binding a child block name to its element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertiesElementDescription {
    pub name: &'static str,
    pub kind: BlockKind,
}

const fn describe(name: &'static str, kind: BlockKind) -> PropertiesElementDescription {
    PropertiesElementDescription { name, kind }
}

const FILE_CHILDREN: &[PropertiesElementDescription] = &[
    describe("plugins", BlockKind::Plugins),
    describe("android", BlockKind::Android),
    describe("dependencies", BlockKind::Dependencies),
    describe("ext", BlockKind::Ext),
    describe("javaApplication", BlockKind::JavaApplication),
    describe("javaLibrary", BlockKind::JavaApplication),
    describe("application", BlockKind::JavaApplication),
    describe("androidApplication", BlockKind::Android),
    describe("androidLibrary", BlockKind::Android),
];

const ANDROID_CHILDREN: &[PropertiesElementDescription] = &[
    describe("defaultConfig", BlockKind::DefaultConfig),
    describe("buildTypes", BlockKind::BuildTypes),
    describe("productFlavors", BlockKind::ProductFlavors),
    describe("sourceSets", BlockKind::SourceSets),
    describe("dependencies", BlockKind::Dependencies),
    describe("ext", BlockKind::Ext),
];

const SOURCE_SET_CHILDREN: &[PropertiesElementDescription] = &[
    describe("java", BlockKind::SourceDirectory),
    describe("kotlin", BlockKind::SourceDirectory),
    describe("res", BlockKind::SourceDirectory),
    describe("assets", BlockKind::SourceDirectory),
    describe("aidl", BlockKind::SourceDirectory),
    describe("renderscript", BlockKind::SourceDirectory),
    describe("jni", BlockKind::SourceDirectory),
    describe("jniLibs", BlockKind::SourceDirectory),
    describe("resources", BlockKind::SourceDirectory),
    describe("shaders", BlockKind::SourceDirectory),
    describe("mlModels", BlockKind::SourceDirectory),
];

const JAVA_APPLICATION_CHILDREN: &[PropertiesElementDescription] = &[
    describe("dependencies", BlockKind::Dependencies),
];

/// Blocks that may appear nested anywhere
const COMMON_CHILDREN: &[PropertiesElementDescription] = &[
    describe("ext", BlockKind::Ext),
];

impl BlockKind {
    /// Child blocks registered for this kind
    pub fn child_descriptions(&self) -> &'static [PropertiesElementDescription] {
        match self {
            BlockKind::File => FILE_CHILDREN,
            BlockKind::Android => ANDROID_CHILDREN,
            BlockKind::SourceSet => SOURCE_SET_CHILDREN,
            BlockKind::JavaApplication => JAVA_APPLICATION_CHILDREN,
            BlockKind::DefaultConfig
            | BlockKind::ProductFlavor
            | BlockKind::BuildType
            | BlockKind::SourceDirectory
            | BlockKind::Generic => COMMON_CHILDREN,
            BlockKind::Plugins
            | BlockKind::ProductFlavors
            | BlockKind::BuildTypes
            | BlockKind::SourceSets
            | BlockKind::Dependencies
            | BlockKind::Ext => &[],
        }
    }

    /// Kind of every child of a named container (`buildTypes { release {} }`)
    pub fn named_child_kind(&self) -> Option<BlockKind> {
        match self {
            BlockKind::BuildTypes => Some(BlockKind::BuildType),
            BlockKind::ProductFlavors => Some(BlockKind::ProductFlavor),
            BlockKind::SourceSets => Some(BlockKind::SourceSet),
            _ => None,
        }
    }

    /// Kind instantiated for a child block called `name`
    pub fn child_kind(&self, name: &str) -> BlockKind {
        self.child_descriptions()
            .iter()
            .find(|description| description.name == name)
            .map(|description| description.kind)
            .or_else(|| self.named_child_kind())
            .unwrap_or(BlockKind::Generic)
    }

    /// Whether children are keyed by user-chosen names
    pub fn is_named_container(&self) -> bool {
        self.named_child_kind().is_some()
    }

    /// Blocks whose properties always bind with `=`
    pub fn forces_assignment(&self) -> bool {
        matches!(self, BlockKind::Ext)
    }

    /// Blocks where repeated names are separate declarations, not overrides
    pub fn keeps_duplicates(&self) -> bool {
        matches!(self, BlockKind::Dependencies | BlockKind::Plugins)
    }
}
