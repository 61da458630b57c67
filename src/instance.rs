use crate::config::UpdaterConfig;
use anyhow::{bail, Result};
use std::path::Path;

const INSTANCE_MARKERS: [&str; 4] = ["mods", "config", "saves", "options.txt"];

pub fn looks_like_instance(dir: &Path) -> bool {
    INSTANCE_MARKERS
        .iter()
        .any(|marker| dir.join(marker).exists())
}

pub fn ensure_instance_layout(config: &UpdaterConfig, relaxed: bool) -> Result<()> {
    if relaxed {
        return Ok(());
    }
    let instance_root = match config.mods_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if looks_like_instance(instance_root) {
        return Ok(());
    }
    bail!(
        "{} does not look like a modpack instance (no mods/, config/, saves/ or options.txt); \
         run from the updater folder inside the instance, or pass --debug to skip this check",
        instance_root.display()
    );
}
