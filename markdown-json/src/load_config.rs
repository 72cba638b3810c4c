/// `load_config` module: loads the YAML config file of a conversion run.
///
/// This is the only place where user-supplied YAML is parsed into the typed
/// [`CliConfig`]. Relative `source_dir` and `output_dir` entries are resolved
/// against the directory containing the config file, so a config behaves the
/// same regardless of the working directory it is invoked from.
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::{bail, Result};
use markdown_json_core::pipeline::Mode;
use markdown_json_core::render::MarkdownOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub mode: Mode,
    /// Name of the consolidated output document.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub flatten_index: bool,
    #[serde(default)]
    pub strip_title: bool,
    #[serde(default)]
    pub nest_single_output: bool,
    /// Renderer options.
    #[serde(default)]
    pub markdown: MarkdownOptions,
    /// Only convert files with these extensions; every file when absent.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if matches!(config.name.as_deref(), Some(name) if name.trim().is_empty()) {
        bail!("Invalid config {:?}: `name` must not be empty", path_ref);
    }

    let base = path_ref.parent().unwrap_or_else(|| Path::new(""));
    config.source_dir = resolve(base, &config.source_dir);
    config.output_dir = resolve(base, &config.output_dir);
    Ok(config)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
