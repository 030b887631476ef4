/// `load_config` module: loads the YAML config file into strongly-typed structs.
///
/// Secrets never live in this file. The Notion token is read from the
/// environment by [`crate::upload::NotionClient::new_from_env`].
///
/// # Errors
/// All errors use `anyhow::Error` with context and are surfaced at the CLI
/// boundary.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

pub const DEFAULT_EXTENSION: &str = "md";
pub const DEFAULT_STATE_FILE: &str = ".md-notion-state.json";
pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub source: SourceSection,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    pub notion: NotionSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    pub dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotionSection {
    pub parent_page_id: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_notion_version")]
    pub notion_version: String,
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_notion_version() -> String {
    DEFAULT_NOTION_VERSION.to_string()
}

/// Loads and validates a YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let mut config: CliConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    let parent = Uuid::parse_str(config.notion.parent_page_id.trim())
        .with_context(|| {
            format!(
                "notion.parent_page_id {:?} is not a valid page id",
                config.notion.parent_page_id
            )
        })?;
    config.notion.parent_page_id = parent.hyphenated().to_string();
    config.notion.api_base_url = config.notion.api_base_url.trim_end_matches('/').to_string();

    info!(
        source_dir = %config.source.dir.display(),
        state_file = %config.state_file.display(),
        parent_page_id = %config.notion.parent_page_id,
        "Parsed config YAML successfully"
    );
    Ok(config)
}
