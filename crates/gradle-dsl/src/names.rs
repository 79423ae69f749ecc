//! Property Name Resolution
//!
//! Maps the spellings used in build scripts to canonical property names
//! and back. Resolution is pure and total: spellings with no entry pass
//! through unchanged.

use r_droid_core::GradleDialect;
use serde::Serialize;

use crate::description::BlockKind;

/// How repeated declarations of a name combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Semantics {
    /// Each declaration replaces the previous one
    Set,
    /// Call-style declarations append to one list
    AugmentList,
    /// Call-style declarations merge into one map
    AugmentMap,
}

/// Number of values a spelling accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arity {
    Single,
    Vararg,
}

/// Dialects that use a spelling when writing new text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Written {
    Any,
    Groovy,
    Kotlin,
    /// Accepted when reading only
    Never,
}

#[derive(Debug)]
struct NameEntry {
    spelling: &'static str,
    canonical: &'static str,
    semantics: Semantics,
    arity: Arity,
    written: Written,
}

const fn entry(
    spelling: &'static str,
    canonical: &'static str,
    semantics: Semantics,
    arity: Arity,
    written: Written,
) -> NameEntry {
    NameEntry { spelling, canonical, semantics, arity, written }
}

const fn plain(name: &'static str) -> NameEntry {
    entry(name, name, Semantics::Set, Arity::Single, Written::Any)
}

use Arity::{Single, Vararg};
use Semantics::{AugmentList, AugmentMap, Set};

/// Top level of a script; `include` is the module list of a settings file
const FILE_NAMES: &[NameEntry] = &[
    entry("include", "include", AugmentList, Vararg, Written::Any),
];

const ANDROID_NAMES: &[NameEntry] = &[
    entry("compileSdkVersion", "compileSdk", Set, Single, Written::Never),
    plain("compileSdk"),
    plain("namespace"),
    plain("buildToolsVersion"),
    plain("ndkVersion"),
    entry("flavorDimensions", "flavorDimensions", AugmentList, Vararg, Written::Any),
    plain("resourcePrefix"),
];

const FLAVOR_NAMES: &[NameEntry] = &[
    plain("applicationId"),
    entry("minSdkVersion", "minSdk", Set, Single, Written::Never),
    plain("minSdk"),
    entry("targetSdkVersion", "targetSdk", Set, Single, Written::Never),
    plain("targetSdk"),
    entry("maxSdkVersion", "maxSdk", Set, Single, Written::Never),
    plain("maxSdk"),
    plain("versionCode"),
    plain("versionName"),
    plain("dimension"),
    plain("testInstrumentationRunner"),
    plain("applicationIdSuffix"),
    plain("versionNameSuffix"),
    plain("multiDexEnabled"),
    entry("proguardFile", "proguardFiles", AugmentList, Single, Written::Never),
    entry("proguardFiles", "proguardFiles", AugmentList, Vararg, Written::Any),
    entry("consumerProguardFile", "consumerProguardFiles", AugmentList, Single, Written::Never),
    entry("consumerProguardFiles", "consumerProguardFiles", AugmentList, Vararg, Written::Any),
    entry("testProguardFile", "testProguardFiles", AugmentList, Single, Written::Never),
    entry("testProguardFiles", "testProguardFiles", AugmentList, Vararg, Written::Any),
    entry("resConfig", "resConfigs", AugmentList, Single, Written::Never),
    entry("resConfigs", "resConfigs", AugmentList, Vararg, Written::Any),
    entry("manifestPlaceholders", "manifestPlaceholders", AugmentMap, Vararg, Written::Any),
    entry("matchingFallbacks", "matchingFallbacks", AugmentList, Vararg, Written::Any),
];

const BUILD_TYPE_NAMES: &[NameEntry] = &[
    entry("minifyEnabled", "minifyEnabled", Set, Single, Written::Groovy),
    entry("isMinifyEnabled", "minifyEnabled", Set, Single, Written::Kotlin),
    entry("debuggable", "debuggable", Set, Single, Written::Groovy),
    entry("isDebuggable", "debuggable", Set, Single, Written::Kotlin),
    entry("shrinkResources", "shrinkResources", Set, Single, Written::Groovy),
    entry("isShrinkResources", "shrinkResources", Set, Single, Written::Kotlin),
    entry("jniDebuggable", "jniDebuggable", Set, Single, Written::Groovy),
    entry("isJniDebuggable", "jniDebuggable", Set, Single, Written::Kotlin),
    plain("applicationIdSuffix"),
    plain("versionNameSuffix"),
    plain("multiDexEnabled"),
    entry("proguardFile", "proguardFiles", AugmentList, Single, Written::Never),
    entry("proguardFiles", "proguardFiles", AugmentList, Vararg, Written::Any),
    entry("consumerProguardFile", "consumerProguardFiles", AugmentList, Single, Written::Never),
    entry("consumerProguardFiles", "consumerProguardFiles", AugmentList, Vararg, Written::Any),
    entry("manifestPlaceholders", "manifestPlaceholders", AugmentMap, Vararg, Written::Any),
    entry("matchingFallbacks", "matchingFallbacks", AugmentList, Vararg, Written::Any),
];

const SOURCE_SET_NAMES: &[NameEntry] = &[
    plain("root"),
    entry("setRoot", "root", Set, Single, Written::Never),
];

const SOURCE_DIRECTORY_NAMES: &[NameEntry] = &[
    entry("srcDir", "srcDirs", AugmentList, Single, Written::Never),
    entry("srcDirs", "srcDirs", AugmentList, Vararg, Written::Any),
    entry("setSrcDirs", "srcDirs", Set, Vararg, Written::Never),
    entry("include", "include", AugmentList, Vararg, Written::Any),
    entry("exclude", "exclude", AugmentList, Vararg, Written::Any),
];

const JAVA_APPLICATION_NAMES: &[NameEntry] = &[
    plain("javaVersion"),
    plain("mainClass"),
    entry("mainClassName", "mainClass", Set, Single, Written::Never),
];

fn table(kind: BlockKind) -> &'static [NameEntry] {
    match kind {
        BlockKind::File => FILE_NAMES,
        BlockKind::Android => ANDROID_NAMES,
        BlockKind::DefaultConfig | BlockKind::ProductFlavor => FLAVOR_NAMES,
        BlockKind::BuildType => BUILD_TYPE_NAMES,
        BlockKind::SourceSet => SOURCE_SET_NAMES,
        BlockKind::SourceDirectory => SOURCE_DIRECTORY_NAMES,
        BlockKind::JavaApplication => JAVA_APPLICATION_NAMES,
        _ => &[],
    }
}

/// Outcome of resolving one spelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub canonical: String,
    pub semantics: Semantics,
    pub arity: Arity,
    /// Whether the spelling has a registered entry
    pub known: bool,
}

/// Canonical name for a block spelling (`extra` is Kotlin's `ext`)
pub fn canonical_block_name(spelling: &str) -> &str {
    match spelling {
        "extra" => "ext",
        other => other,
    }
}

/// Translates property spellings within a block kind
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl NameResolver {
    /// Resolve a source spelling to its canonical name
    pub fn resolve(&self, kind: BlockKind, spelling: &str) -> ResolvedName {
        match table(kind).iter().find(|entry| entry.spelling == spelling) {
            Some(entry) => ResolvedName {
                canonical: entry.canonical.to_string(),
                semantics: entry.semantics,
                arity: entry.arity,
                known: true,
            },
            None => ResolvedName {
                canonical: spelling.to_string(),
                semantics: Set,
                arity: Single,
                known: false,
            },
        }
    }

    /// Canonical name only
    pub fn canonical(&self, kind: BlockKind, spelling: &str) -> String {
        self.resolve(kind, spelling).canonical
    }

    /// Spelling used when writing `canonical` in `dialect`
    pub fn external_name(&self, kind: BlockKind, canonical: &str, dialect: GradleDialect) -> String {
        let wanted = match dialect {
            GradleDialect::Groovy => Written::Groovy,
            GradleDialect::Kotlin | GradleDialect::Declarative => Written::Kotlin,
        };
        table(kind)
            .iter()
            .filter(|entry| entry.canonical == canonical)
            .find(|entry| entry.written == Written::Any || entry.written == wanted)
            .map(|entry| entry.spelling.to_string())
            .unwrap_or_else(|| canonical.to_string())
    }

    /// Spelling that accepts several values, used when a single-value call outgrows it
    pub fn vararg_spelling(&self, kind: BlockKind, canonical: &str) -> Option<&'static str> {
        table(kind)
            .iter()
            .find(|entry| entry.canonical == canonical && entry.arity == Vararg && entry.written != Written::Never)
            .map(|entry| entry.spelling)
    }

    /// Whether a name collects its values into a list in this block
    pub fn is_list_property(&self, kind: BlockKind, canonical: &str) -> bool {
        table(kind)
            .iter()
            .any(|entry| entry.canonical == canonical && entry.semantics == AugmentList)
    }
}
