use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ExceptionStore {
    path: PathBuf,
}

impl ExceptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<BTreeSet<String>> {
        if !self.path.exists() {
            return Ok(BTreeSet::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read exception list {}", self.path.display()))?;
        let names: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("parse exception list {}", self.path.display()))?;
        Ok(names.into_iter().collect())
    }

    pub fn save(&self, names: &BTreeSet<String>) -> Result<()> {
        let list: Vec<&String> = names.iter().collect();
        let raw = serde_json::to_string_pretty(&list).context("serialize exception list")?;
        let staged = self.path.with_extension("json.tmp");
        fs::write(&staged, raw)
            .with_context(|| format!("write exception list {}", staged.display()))?;
        fs::rename(&staged, &self.path)
            .with_context(|| format!("replace exception list {}", self.path.display()))?;
        Ok(())
    }
}

pub fn validate_selection(
    selection: &BTreeSet<String>,
    candidates: &BTreeSet<String>,
    current: &BTreeSet<String>,
) -> Result<()> {
    for name in selection {
        if !candidates.contains(name) && !current.contains(name) {
            bail!("selection contains {name:?}, which was never offered");
        }
    }
    Ok(())
}
