//! @acp:module "Configuration"
//! @acp:summary "Project configuration loading and defaults"
//! @acp:domain cli
//! @acp:layer config

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = ".cfmeta.config.json";

/// @acp:summary "Main cfmeta configuration structure"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// File patterns to include when an input is a directory (glob syntax)
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// File patterns to exclude (glob syntax)
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Output paths
    #[serde(default)]
    pub output: OutputConfig,

    /// Error handling configuration
    #[serde(default)]
    pub error_handling: ErrorHandling,

    /// Document-level flags written into functions.json
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Implementation limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Check the generated document against the bundled schema
    #[serde(default)]
    pub validate_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
            output: OutputConfig::default(),
            error_handling: ErrorHandling::default(),
            metadata: MetadataConfig::default(),
            limits: LimitsConfig::default(),
            validate_output: false,
        }
    }
}

impl Config {
    /// @acp:summary "Load config from a .cfmeta.config.json file"
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// @acp:summary "Save config to a file"
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// @acp:summary "Load from the given path, falling back to defaults when absent"
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn is_strict(&self) -> bool {
        self.error_handling.strictness == Strictness::Strict
    }
}

fn default_include() -> Vec<String> {
    vec![
        "**/*.ts".to_string(),
        "**/*.mts".to_string(),
        "**/*.cts".to_string(),
        "**/*.js".to_string(),
        "**/*.mjs".to_string(),
        "**/*.cjs".to_string(),
    ]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
        "**/coverage/**".to_string(),
        "**/.git/**".to_string(),
        "**/*.d.ts".to_string(),
        "**/*.test.ts".to_string(),
        "**/*.test.js".to_string(),
    ]
}

/// @acp:summary "Output file locations"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Metadata document path
    #[serde(default = "default_metadata_path")]
    pub metadata: PathBuf,

    /// Registration code path; not written when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metadata: default_metadata_path(),
            code: None,
        }
    }
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("functions.json")
}

/// @acp:summary "Error handling configuration"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandling {
    /// Strict mode fails the run on warnings too
    #[serde(default = "default_strictness")]
    pub strictness: Strictness,

    /// Maximum number of errors before output is withheld
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self {
            strictness: default_strictness(),
            max_errors: default_max_errors(),
        }
    }
}

fn default_strictness() -> Strictness {
    Strictness::Permissive
}

fn default_max_errors() -> usize {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Permissive,
    Strict,
}

/// @acp:summary "Document-level flags of functions.json"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataConfig {
    #[serde(default)]
    pub allow_custom_data_for_data_type_any: bool,

    #[serde(default)]
    pub allow_error_for_data_type_any: bool,
}

/// @acp:summary "Implementation limits"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsConfig {
    /// Source files larger than this are skipped
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size(),
        }
    }
}

fn default_max_file_size() -> usize {
    10
}
