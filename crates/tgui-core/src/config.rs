use std::path::Path;

use serde::Deserialize;

use crate::description::FormItem;
use crate::error::TguiResult;
use crate::fields_factory::FieldsFactory;

/// Bot configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Falls back to the environment when absent.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Sent after the collected answers once the form resolves.
    #[serde(default)]
    pub completion_message: Option<String>,

    pub form: FormItem,
}

impl BotConfig {
    pub fn from_yaml(yaml: &str) -> TguiResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> TguiResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Builds the form once so that structural faults surface before a
    /// conversation starts.
    pub fn validate(&self) -> TguiResult<()> {
        FieldsFactory::default().form(&self.form).map(|_| ())
    }
}
