use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "modsync.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    #[serde(default = "default_files_path")]
    pub files_path: String,
    #[serde(default = "default_version_path")]
    pub version_path: String,
    #[serde(default = "default_mods_dir")]
    pub mods_dir: PathBuf,
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    #[serde(default = "default_scripts_archive")]
    pub scripts_archive: String,
    #[serde(default = "default_exceptions_file")]
    pub exceptions_file: PathBuf,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_mod_extension")]
    pub mod_extension: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            manifest_path: default_manifest_path(),
            files_path: default_files_path(),
            version_path: default_version_path(),
            mods_dir: default_mods_dir(),
            scripts_dir: default_scripts_dir(),
            scripts_archive: default_scripts_archive(),
            exceptions_file: default_exceptions_file(),
            scratch_dir: default_scratch_dir(),
            mod_extension: default_mod_extension(),
        }
    }
}

impl UpdaterConfig {
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            let config = serde_json::from_str(&raw)
                .with_context(|| format!("parse config {}", path.display()))?;
            return Ok(config);
        }
        let config = UpdaterConfig::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, raw).with_context(|| format!("write config {}", path.display()))?;
        Ok(())
    }
}

fn default_server_url() -> String {
    "http://localhost:6969".to_string()
}

fn default_manifest_path() -> String {
    "/list".to_string()
}

fn default_files_path() -> String {
    "/dl".to_string()
}

fn default_version_path() -> String {
    "/version".to_string()
}

fn default_mods_dir() -> PathBuf {
    PathBuf::from("../mods")
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("../kubejs")
}

fn default_scripts_archive() -> String {
    "kubejs.zip".to_string()
}

fn default_exceptions_file() -> PathBuf {
    PathBuf::from("exceptions.json")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".modsync-tmp")
}

fn default_mod_extension() -> String {
    "jar".to_string()
}
