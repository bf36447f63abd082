use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod plugin;

pub use plugin::{
    AdditionalField, DialogConfig, DialogDefinition, FieldDefinition, FieldKind, Features,
    PluginConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Editor configuration, one TOML document per host.
///
/// ```toml
/// [plugins.links]
/// features = ["modifylink", "unlink"]
///
/// [ui_settings.inline]
/// toolbar = ["links#modifylink", "-", "#find"]
///
/// [ui_settings.inline.popovers.find]
/// items = ["findreplace#find", "findreplace#replace"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plugins: BTreeMap<String, PluginConfig>,
    pub ui_settings: BTreeMap<String, ToolbarSettings>,
    /// Extra command → icon mappings layered over the built-in ones.
    pub icons: BTreeMap<String, String>,
    /// Extra command → CSS class mappings for toolbar items.
    pub additional_classes: BTreeMap<String, String>,
    pub spellcheck: SpellCheckConfig,
    pub undo: UndoConfig,
    pub find_replace: FindReplaceConfig,
}

/// Ordering and grouping of one toolbar (`uiSettings[toolbarId]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarSettings {
    /// Item ids in display order: `plugin#feature`, `#popover` or `-`.
    pub toolbar: Vec<String>,
    pub popovers: BTreeMap<String, PopoverSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopoverSettings {
    pub icon: Option<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellCheckConfig {
    pub url: String,
    pub method: HttpMethod,
    /// Additional attempts after the first failed request.
    pub retries: u32,
    pub charset: String,
    pub mode: String,
    /// Content path sent as the `cp` parameter.
    pub content_path: Option<String>,
}

impl Default for SpellCheckConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4502/libs/cq/ui/rte/spellcheck".to_string(),
            method: HttpMethod::Post,
            retries: 1,
            charset: "utf-8".to_string(),
            mode: "text".to_string(),
            content_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    pub max_steps: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_steps: 50 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindReplaceConfig {
    pub match_case: bool,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config = Self::from_toml_str(&content).map_err(|source| {
            ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/coral-rte");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Configuration for `plugin_id`, or an empty block if none was given.
    pub fn plugin(&self, plugin_id: &str) -> PluginConfig {
        self.plugins.get(plugin_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/coral-rte/config.toml"));
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.undo.max_steps, 50);
        assert_eq!(config.spellcheck.retries, 1);
        assert_eq!(config.spellcheck.method, HttpMethod::Post);
    }

    #[test]
    fn test_features_wildcard_and_list() {
        let config = Config::from_toml_str(
            r#"
[plugins.links]
features = "*"

[plugins.findreplace]
features = ["find"]
"#,
        )
        .unwrap();

        assert_eq!(config.plugins["links"].features, Some(Features::All));
        let find = config.plugin("findreplace");
        assert!(find.is_feature_enabled("find"));
        assert!(!find.is_feature_enabled("replace"));
        // Unconfigured plugins keep every feature
        assert!(config.plugin("spellcheck").is_feature_enabled("checktext"));
    }

    #[test]
    fn test_features_rejects_other_strings() {
        let result = Config::from_toml_str(
            r#"
[plugins.links]
features = "all"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ui_settings_and_dialog_overrides() {
        let config = Config::from_toml_str(
            r##"
[ui_settings.inline]
toolbar = ["links#modifylink", "-", "#find"]

[ui_settings.inline.popovers.find]
icon = "search"
items = ["findreplace#find", "findreplace#replace"]

[plugins.links.dialogs.link]
disabled_default_fields = ["target"]

[[plugins.links.dialogs.link.additional_fields]]
name = "rel"
label = "Relationship"
insert_before = "title"
"##,
        )
        .unwrap();

        let inline = &config.ui_settings["inline"];
        assert_eq!(inline.toolbar, vec!["links#modifylink", "-", "#find"]);
        assert_eq!(inline.popovers["find"].icon.as_deref(), Some("search"));

        let links = config.plugin("links");
        assert!(links.dialog("anchor").is_none());
        let dialog = links.dialog("link").unwrap();
        assert_eq!(dialog.disabled_default_fields, vec!["target"]);
        assert_eq!(dialog.additional_fields[0].field.name, "rel");
        assert_eq!(dialog.additional_fields[0].field.kind, FieldKind::Text);
        assert_eq!(
            dialog.additional_fields[0].insert_before.as_deref(),
            Some("title")
        );
    }

    #[test]
    fn test_plugin_config_merge_prefers_explicit_values() {
        let defaults = PluginConfig {
            features: Some(Features::All),
            tooltips: BTreeMap::from([
                ("unlink".to_string(), "Unlink".to_string()),
                ("modifylink".to_string(), "Hyperlink".to_string()),
            ]),
            dialogs: BTreeMap::from([
                ("link".to_string(), DialogConfig::default()),
                (
                    "anchor".to_string(),
                    DialogConfig {
                        disabled_default_fields: vec!["name".to_string()],
                        ..DialogConfig::default()
                    },
                ),
            ]),
        };
        let explicit = PluginConfig {
            features: None,
            tooltips: BTreeMap::from([("unlink".to_string(), "Remove link".to_string())]),
            dialogs: BTreeMap::from([(
                "link".to_string(),
                DialogConfig {
                    disabled_default_fields: vec!["target".to_string()],
                    ..DialogConfig::default()
                },
            )]),
        };

        let merged = explicit.merged_with(&defaults);

        assert_eq!(merged.features, Some(Features::All));
        assert_eq!(merged.tooltips["unlink"], "Remove link");
        assert_eq!(merged.tooltips["modifylink"], "Hyperlink");
        assert_eq!(
            merged.dialog("link").unwrap().disabled_default_fields,
            vec!["target"]
        );
        assert_eq!(
            merged.dialog("anchor").unwrap().disabled_default_fields,
            vec!["name"]
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "plugins = 3").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::default();
        test_config.undo.max_steps = 7;
        test_config.plugins.insert(
            "links".to_string(),
            PluginConfig {
                features: Some(Features::Only(vec!["unlink".to_string()])),
                ..PluginConfig::default()
            },
        );

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
