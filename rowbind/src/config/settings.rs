//! Options for a `Db` handle

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::defaults;
use crate::bind::{bind_type, BindType};
use crate::error::{Error, Result};
use crate::expand::EmptyListPolicy;
use crate::reflect::NameConvention;

/// Mapping and binding options applied by [`Db::with_options`](crate::Db::with_options)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// How field identifiers become column names
    #[serde(default = "default_naming")]
    pub naming: NameConvention,

    /// Permissive mode: drop result columns that have no destination field
    #[serde(default = "default_unsafe_columns")]
    pub unsafe_columns: bool,

    /// What an empty list argument turns into
    #[serde(default = "default_empty_lists")]
    pub empty_lists: EmptyListPolicy,

    /// Driver identity used to pick the placeholder dialect instead of the
    /// executor's own (useful for drivers speaking another database's wire
    /// protocol, e.g. `cockroach`)
    #[serde(default)]
    pub driver: Option<String>,
}

fn default_naming() -> NameConvention {
    defaults::NAMING
}
fn default_unsafe_columns() -> bool {
    defaults::UNSAFE_COLUMNS
}
fn default_empty_lists() -> EmptyListPolicy {
    defaults::EMPTY_LISTS
}

impl Default for Options {
    fn default() -> Self {
        Self {
            naming: default_naming(),
            unsafe_columns: default_unsafe_columns(),
            empty_lists: default_empty_lists(),
            driver: None,
        }
    }
}

impl Options {
    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let options: Options = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse options file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(options)
    }

    /// Load options using config-rs (file + environment variables)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        } else {
            builder = builder.add_source(File::with_name(defaults::FILE_NAME).required(false));
        }

        // ROWBIND_UNSAFE_COLUMNS, ROWBIND_EMPTY_LISTS, ...
        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let options: Options = builder.build()?.try_deserialize()?;
        Ok(options)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if let Some(driver) = &self.driver {
            if driver.trim().is_empty() {
                return Err(Error::Config("driver must not be empty when set".into()));
            }
        }
        Ok(())
    }

    /// The dialect forced by `driver`, if any.
    pub fn bind_type(&self) -> Option<BindType> {
        self.driver.as_deref().map(bind_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert!(matches!(options.naming, NameConvention::Lowercase));
        assert!(!options.unsafe_columns);
        assert_eq!(options.empty_lists, EmptyListPolicy::Reject);
        assert!(options.bind_type().is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options: Options = toml::from_str(
            r#"
            naming = "snake_case"
            driver = "postgres"
        "#,
        )
        .unwrap();
        assert!(matches!(options.naming, NameConvention::SnakeCase));
        assert!(!options.unsafe_columns);
        assert_eq!(options.bind_type(), Some(BindType::Dollar));
    }

    #[test]
    fn test_empty_driver_is_invalid() {
        let options = Options {
            driver: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unsafe_columns = true\nempty_lists = \"null\"").unwrap();
        let options = Options::from_file(file.path()).unwrap();
        assert!(options.unsafe_columns);
        assert_eq!(options.empty_lists, EmptyListPolicy::Null);
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unsafe_columns = \"maybe\"").unwrap();
        assert!(matches!(
            Options::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn test_load_with_environment_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rowbind.toml");
        std::fs::write(&path, "naming = \"identity\"\n").unwrap();

        std::env::set_var("ROWBIND_UNSAFE_COLUMNS", "true");
        let options = Options::load(Some(&path));
        std::env::remove_var("ROWBIND_UNSAFE_COLUMNS");

        let options = options.unwrap();
        assert!(matches!(options.naming, NameConvention::Identity));
        assert!(options.unsafe_columns);
    }
}
