use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which features of a plugin are enabled.
///
/// In TOML this is either the string `"*"` or a list of feature names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FeaturesRepr", into = "FeaturesRepr")]
pub enum Features {
    All,
    Only(Vec<String>),
}

impl Features {
    pub fn is_enabled(&self, feature: &str) -> bool {
        match self {
            Features::All => true,
            Features::Only(list) => list.iter().any(|f| f == feature),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FeaturesRepr {
    Wildcard(String),
    List(Vec<String>),
}

impl TryFrom<FeaturesRepr> for Features {
    type Error = String;

    fn try_from(repr: FeaturesRepr) -> Result<Self, Self::Error> {
        match repr {
            FeaturesRepr::Wildcard(s) if s == "*" => Ok(Features::All),
            FeaturesRepr::Wildcard(s) => Err(format!(
                "features must be \"*\" or a list of feature names, got {s:?}"
            )),
            FeaturesRepr::List(list) => Ok(Features::Only(list)),
        }
    }
}

impl From<Features> for FeaturesRepr {
    fn from(features: Features) -> Self {
        match features {
            Features::All => FeaturesRepr::Wildcard("*".to_string()),
            Features::Only(list) => FeaturesRepr::List(list),
        }
    }
}

/// Per-plugin configuration block (`[plugins.<id>]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub features: Option<Features>,
    pub tooltips: BTreeMap<String, String>,
    /// Overrides keyed by dialog name (`[plugins.<id>.dialogs.<name>]`).
    pub dialogs: BTreeMap<String, DialogConfig>,
}

impl PluginConfig {
    /// Fill everything this config leaves unset from `defaults`.
    ///
    /// Tooltips and dialogs merge key by key with the explicit value winning.
    pub fn merged_with(&self, defaults: &PluginConfig) -> PluginConfig {
        let mut tooltips = defaults.tooltips.clone();
        tooltips.extend(self.tooltips.clone());
        let mut dialogs = defaults.dialogs.clone();
        dialogs.extend(self.dialogs.clone());
        PluginConfig {
            features: self.features.clone().or_else(|| defaults.features.clone()),
            tooltips,
            dialogs,
        }
    }

    pub fn dialog(&self, name: &str) -> Option<&DialogConfig> {
        self.dialogs.get(name)
    }

    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        self.features
            .as_ref()
            .is_none_or(|features| features.is_enabled(feature))
    }
}

/// Dialog override model: replace (`custom_dialog`), extend
/// (`additional_fields`) or trim (`disabled_default_fields`) a default dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub custom_dialog: Option<DialogDefinition>,
    pub default_dialog: Option<DialogDefinition>,
    pub additional_fields: Vec<AdditionalField>,
    pub disabled_default_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogDefinition {
    pub dialog_class: Option<String>,
    pub title: String,
    pub items: Option<Vec<FieldDefinition>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Checkbox,
    Select,
    Hidden,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    pub options: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: &str, kind: FieldKind, label: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            label: label.to_string(),
            options: Vec::new(),
        }
    }
}

/// A host supplied dialog field, optionally placed before a named field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalField {
    #[serde(flatten)]
    pub field: FieldDefinition,
    #[serde(default)]
    pub insert_before: Option<String>,
}
