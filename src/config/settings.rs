//! Per-tool settings handed to `Tool::configure`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::belt::{ToolError, ToolId};

/// The inputs a tool configures itself from.
///
/// Resolution order: the override (if any) replaces the defaults wholesale,
/// then keys from the tool's config-file section replace individual fields.
#[derive(Debug, Clone)]
pub struct Settings {
    tool: ToolId,
    overrides: Option<toml::Value>,
    file: Option<toml::Table>,
}

impl Settings {
    pub fn new(tool: ToolId, overrides: Option<toml::Value>, file: Option<toml::Table>) -> Self {
        Self {
            tool,
            overrides,
            file,
        }
    }

    /// Settings with neither override nor file section.
    pub fn defaults(tool: ToolId) -> Self {
        Self::new(tool, None, None)
    }

    pub fn tool(&self) -> ToolId {
        self.tool
    }

    pub fn overrides(&self) -> Option<&toml::Value> {
        self.overrides.as_ref()
    }

    pub fn file_section(&self) -> Option<&toml::Table> {
        self.file.as_ref()
    }

    /// Produce the tool's typed configuration.
    pub fn resolve<C>(&self) -> Result<C, ToolError>
    where
        C: Serialize + DeserializeOwned + Default,
    {
        let mut table = match &self.overrides {
            Some(toml::Value::Table(table)) => table.clone(),
            Some(other) => {
                return Err(ToolError::Settings(format!(
                    "override for `{}` must be a table, found {}",
                    self.tool,
                    other.type_str()
                )))
            }
            None => to_table(&C::default()).ok_or_else(|| {
                ToolError::Settings(format!("defaults for `{}` are not a table", self.tool))
            })?,
        };

        if let Some(section) = &self.file {
            for (key, value) in section {
                table.insert(key.clone(), value.clone());
            }
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ToolError::Settings(format!("`{}`: {}", self.tool, e)))
    }
}

/// Serialize a config struct into a TOML table, as returned by `Tool::describe`.
pub fn describe_config<C: Serialize>(config: &C) -> Option<toml::Table> {
    to_table(config)
}

fn to_table<C: Serialize>(config: &C) -> Option<toml::Table> {
    match toml::Value::try_from(config) {
        Ok(toml::Value::Table(table)) => Some(table),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        address: String,
        timeout_secs: u64,
        debug: bool,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                address: ":http".to_string(),
                timeout_secs: 60,
                debug: false,
            }
        }
    }

    const ID: ToolId = ToolId::new("sample");

    fn table(src: &str) -> toml::Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn defaults_without_inputs() {
        let sample: Sample = Settings::defaults(ID).resolve().unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn override_replaces_defaults_wholesale() {
        let overrides = toml::Value::Table(table("address = \"127.0.0.1:1\""));
        let sample: Sample = Settings::new(ID, Some(overrides), None).resolve().unwrap();
        assert_eq!(sample.address, "127.0.0.1:1");
        // Missing keys fall back to serde defaults, not to anything merged.
        assert_eq!(sample.timeout_secs, 60);
    }

    #[test]
    fn file_section_overlays_fields() {
        let overrides = toml::Value::Table(table("address = \"a\"\ntimeout_secs = 5"));
        let file = table("debug = true\ntimeout_secs = 9");
        let sample: Sample = Settings::new(ID, Some(overrides), Some(file)).resolve().unwrap();
        assert_eq!(sample.address, "a");
        assert_eq!(sample.timeout_secs, 9);
        assert!(sample.debug);
    }

    #[test]
    fn rejects_non_table_override() {
        let err = Settings::new(ID, Some(toml::Value::Integer(3)), None)
            .resolve::<Sample>()
            .unwrap_err();
        assert!(matches!(err, ToolError::Settings(_)));
        assert!(err.to_string().contains("must be a table"));
    }

    #[test]
    fn rejects_wrongly_typed_field() {
        let overrides = toml::Value::Table(table("timeout_secs = \"soon\""));
        let err = Settings::new(ID, Some(overrides), None)
            .resolve::<Sample>()
            .unwrap_err();
        assert!(matches!(err, ToolError::Settings(_)));
    }

    #[test]
    fn describes_config_as_table() {
        let described = describe_config(&Sample::default()).unwrap();
        assert_eq!(described.get("timeout_secs"), Some(&toml::Value::Integer(60)));
    }
}
