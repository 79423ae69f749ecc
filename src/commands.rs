//! CLI commands for R-Droid Gradle
//!
//! Each command loads one build file, works on its property model and,
//! when it changed something, saves the file again.

use std::path::PathBuf;
use anyhow::Result;
use tracing::info;

use r_droid_core::DslConfig;
use r_droid_gradle_dsl::{DslExpr, GradleBuildModel, ResolvedValue};

/// Turn a command line value into an expression: booleans, integers, else a string
///
/// Dotted numbers such as `1.0` stay strings; Gradle versions are written that way.
pub fn parse_value(text: &str, reference: bool) -> DslExpr {
    if reference {
        return DslExpr::reference(text);
    }
    match text {
        "true" => DslExpr::from(true),
        "false" => DslExpr::from(false),
        _ => match text.parse::<i64>() {
            Ok(value) => DslExpr::from(value),
            Err(_) => DslExpr::from(text),
        },
    }
}

fn to_json(value: &ResolvedValue) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print one property as JSON
pub struct GetCommand {
    pub file: PathBuf,
    pub path: String,
}

impl GetCommand {
    pub async fn execute(&self, config: &DslConfig) -> Result<String> {
        let mut model = GradleBuildModel::load(&self.file, config.clone()).await?;
        let value = model.property(&self.path).value();
        to_json(&value)
    }
}

/// Set a scalar property
pub struct SetCommand {
    pub file: PathBuf,
    pub path: String,
    pub value: String,
    pub reference: bool,
}

impl SetCommand {
    pub async fn execute(&self, config: &DslConfig) -> Result<()> {
        let mut model = GradleBuildModel::load(&self.file, config.clone()).await?;
        model.property(&self.path).set_value(parse_value(&self.value, self.reference))?;
        model.save().await?;
        info!("Set {} in {:?}", self.path, self.file);
        Ok(())
    }
}

/// Delete a property and its earlier declarations
pub struct DeleteCommand {
    pub file: PathBuf,
    pub path: String,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &DslConfig) -> Result<bool> {
        let mut model = GradleBuildModel::load(&self.file, config.clone()).await?;
        let mut property = model.property(&self.path);
        if !property.exists() {
            return Ok(false);
        }
        property.delete();
        model.save().await?;
        info!("Deleted {} from {:?}", self.path, self.file);
        Ok(true)
    }
}

/// Append to a list property
pub struct AddCommand {
    pub file: PathBuf,
    pub path: String,
    pub value: String,
}

impl AddCommand {
    pub async fn execute(&self, config: &DslConfig) -> Result<()> {
        let mut model = GradleBuildModel::load(&self.file, config.clone()).await?;
        model.property(&self.path).add_to_list(parse_value(&self.value, false))?;
        model.save().await?;
        Ok(())
    }
}

/// Remove the first matching item of a list property
pub struct RemoveCommand {
    pub file: PathBuf,
    pub path: String,
    pub value: String,
}

impl RemoveCommand {
    pub async fn execute(&self, config: &DslConfig) -> Result<bool> {
        let mut model = GradleBuildModel::load(&self.file, config.clone()).await?;
        let removed = model.property(&self.path).remove_from_list(parse_value(&self.value, false))?;
        if removed {
            model.save().await?;
        }
        Ok(removed)
    }
}

/// Print every property of a build file as JSON
pub struct DumpCommand {
    pub file: PathBuf,
}

impl DumpCommand {
    pub async fn execute(&self, config: &DslConfig) -> Result<String> {
        let model = GradleBuildModel::load(&self.file, config.clone()).await?;
        to_json(&model.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: &str = "android {\n    compileSdk 33\n    flavorDimensions 'tier'\n}\n";

    async fn build_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("build.gradle");
        tokio::fs::write(&path, BUILD).await.unwrap();
        path
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true", false), DslExpr::from(true));
        assert_eq!(parse_value("34", false), DslExpr::from(34));
        assert_eq!(parse_value("1.0", false), DslExpr::from("1.0"));
        assert_eq!(parse_value("1.2.0", false), DslExpr::from("1.2.0"));
        assert_eq!(parse_value("rootProject.ext.minSdk", true), DslExpr::reference("rootProject.ext.minSdk"));
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let file = build_file(&dir).await;
        let config = DslConfig::default();

        let set = SetCommand { file: file.clone(), path: "android.compileSdk".into(), value: "34".into(), reference: false };
        set.execute(&config).await.unwrap();
        let saved = tokio::fs::read_to_string(&file).await.unwrap();
        assert_eq!(saved, "android {\n    compileSdk 34\n    flavorDimensions 'tier'\n}\n");

        let get = GetCommand { file, path: "android.compileSdk".into() };
        assert_eq!(get.execute(&config).await.unwrap(), "34");
    }

    #[tokio::test]
    async fn test_set_dotted_number_is_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let file = build_file(&dir).await;
        let config = DslConfig::default();

        let set = SetCommand { file: file.clone(), path: "android.defaultConfig.versionName".into(), value: "1.0".into(), reference: false };
        set.execute(&config).await.unwrap();
        let saved = tokio::fs::read_to_string(&file).await.unwrap();
        assert!(saved.contains("versionName '1.0'"));

        let get = GetCommand { file, path: "android.defaultConfig.versionName".into() };
        assert_eq!(get.execute(&config).await.unwrap(), "\"1.0\"");
    }

    #[tokio::test]
    async fn test_list_commands() {
        let dir = tempfile::tempdir().unwrap();
        let file = build_file(&dir).await;
        let config = DslConfig::default();

        let add = AddCommand { file: file.clone(), path: "android.flavorDimensions".into(), value: "store".into() };
        add.execute(&config).await.unwrap();
        let remove = RemoveCommand { file: file.clone(), path: "android.flavorDimensions".into(), value: "tier".into() };
        assert!(remove.execute(&config).await.unwrap());

        let get = GetCommand { file: file.clone(), path: "android.flavorDimensions".into() };
        let value: serde_json::Value = serde_json::from_str(&get.execute(&config).await.unwrap()).unwrap();
        assert_eq!(value, serde_json::json!(["store"]));

        let delete = DeleteCommand { file: file.clone(), path: "android.flavorDimensions".into() };
        assert!(delete.execute(&config).await.unwrap());
        assert_eq!(tokio::fs::read_to_string(&file).await.unwrap(), "android {\n    compileSdk 33\n}\n");
    }

    #[tokio::test]
    async fn test_dump() {
        let dir = tempfile::tempdir().unwrap();
        let file = build_file(&dir).await;
        let dump = DumpCommand { file }.execute(&DslConfig::default()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&dump).unwrap();
        assert_eq!(value["android"]["compileSdk"], serde_json::json!(33));
    }
}
