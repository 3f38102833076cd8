//! Engine configuration file

use std::fs;
use std::path::{Path, PathBuf};

use docschema_completion::CompletionConfig;
use docschema_validation::ValidationConfig;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading inputs for a command
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No schema given; pass --schema or list schemas in the configuration file")]
    NoSchema,

    #[error("Unsupported document {0}: only JSON documents can be read")]
    UnsupportedDocument(PathBuf),
}

/// Settings shared by all commands.
///
/// ```yaml
/// schemas:
///   - schemas/common.yaml
///   - schemas/workflow.yaml
/// validation:
///   report_unknown_fields: true
/// completion:
///   max_items: 50
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Schemas used when a command names none; relative to the file
    pub schemas: Vec<PathBuf>,
    pub validation: ValidationConfig,
    pub completion: CompletionConfig,
}

impl EngineConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = read_text(path)?;
        let mut config: EngineConfig = serde_yaml::from_str(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(dir) = path.parent() {
            for schema in &mut config.schemas {
                if schema.is_relative() {
                    *schema = dir.join(&*schema);
                }
            }
        }
        Ok(config)
    }

    /// Schemas to load: the command line wins over the configuration
    pub fn schemas_for(&self, cli: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
        let schemas = if cli.is_empty() { &self.schemas } else { cli };
        if schemas.is_empty() {
            return Err(CliError::NoSchema);
        }
        Ok(schemas.to_vec())
    }
}

pub fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_resolves_schema_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docschema.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "schemas: [workflow.yaml]\ncompletion:\n  max_items: 5").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.schemas, vec![dir.path().join("workflow.yaml")]);
        assert_eq!(config.completion.max_items, 5);
        assert_eq!(config.validation, ValidationConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "validation: [1, 2]").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(CliError::Config { .. })));
    }

    #[test]
    fn test_cli_schemas_win() {
        let config = EngineConfig {
            schemas: vec![PathBuf::from("a.yaml")],
            ..EngineConfig::default()
        };
        assert_eq!(
            config.schemas_for(&[PathBuf::from("b.yaml")]).unwrap(),
            vec![PathBuf::from("b.yaml")]
        );
        assert_eq!(config.schemas_for(&[]).unwrap(), vec![PathBuf::from("a.yaml")]);
        assert!(matches!(
            EngineConfig::default().schemas_for(&[]),
            Err(CliError::NoSchema)
        ));
    }
}
