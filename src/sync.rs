use crate::config::UpdaterConfig;
use crate::digest;
use crate::inventory;
use crate::manifest::{Manifest, ManifestEntry};
use crate::progress::{self, ProgressCallback, SyncProgress, SyncStage};
use crate::reconcile::{self, Reconciliation};
use crate::server::ServerClient;
use crate::transfer;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub manifest: Manifest,
    pub inventory: BTreeSet<String>,
    pub outcome: Reconciliation,
}

impl SyncPlan {
    pub fn download_entries(&self) -> Vec<ManifestEntry> {
        let wanted = self.outcome.to_download();
        self.manifest
            .entries()
            .iter()
            .filter(|entry| wanted.contains(&entry.name))
            .cloned()
            .collect()
    }
}

pub fn build_plan(
    client: &ServerClient,
    config: &UpdaterConfig,
    exceptions: &BTreeSet<String>,
    verify_local: bool,
    progress: Option<&ProgressCallback>,
) -> Result<SyncPlan> {
    let manifest = client.fetch_manifest(progress)?;
    progress::report(progress, SyncProgress::new(SyncStage::ScanMods, 0, 1));
    let inventory = inventory::scan(&config.mods_dir, &config.mod_extension)?;
    progress::report(progress, SyncProgress::new(SyncStage::ScanMods, 1, 1));
    let local_digests = if verify_local {
        digest_local(&manifest, &inventory, &config.mods_dir, progress)?
    } else {
        BTreeMap::new()
    };
    Ok(plan_from_parts(manifest, inventory, exceptions, &local_digests))
}

pub fn plan_from_parts(
    manifest: Manifest,
    inventory: BTreeSet<String>,
    exceptions: &BTreeSet<String>,
    local_digests: &BTreeMap<String, String>,
) -> SyncPlan {
    let outcome = if local_digests.is_empty() {
        reconcile::reconcile(&manifest, &inventory, exceptions)
    } else {
        reconcile::reconcile_verified(&manifest, &inventory, exceptions, local_digests)
    };
    SyncPlan {
        manifest,
        inventory,
        outcome,
    }
}

fn digest_local(
    manifest: &Manifest,
    inventory: &BTreeSet<String>,
    mods_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<BTreeMap<String, String>> {
    let expected = manifest.names();
    let shared: Vec<&String> = inventory.intersection(&expected).collect();
    let count = shared.len();
    let mut digests = BTreeMap::new();
    for (index, name) in shared.into_iter().enumerate() {
        progress::report(
            progress,
            SyncProgress::new(SyncStage::CheckLocal, index, count).detail(name.clone()),
        );
        let value = digest::file_digest(&mods_dir.join(name))?;
        digests.insert(name.clone(), value);
    }
    progress::report(progress, SyncProgress::new(SyncStage::CheckLocal, count, count));
    Ok(digests)
}

pub fn delete_files(
    mods_dir: &Path,
    names: &BTreeSet<String>,
    progress: Option<&ProgressCallback>,
) -> Result<usize> {
    let count = names.len();
    for (index, name) in names.iter().enumerate() {
        progress::report(
            progress,
            SyncProgress::new(SyncStage::Delete, index, count).detail(name.clone()),
        );
        fs::remove_file(mods_dir.join(name)).with_context(|| format!("delete {name}"))?;
    }
    progress::report(progress, SyncProgress::new(SyncStage::Delete, count, count));
    Ok(count)
}

pub fn install(
    client: &ServerClient,
    config: &UpdaterConfig,
    plan: &SyncPlan,
    progress: Option<&ProgressCallback>,
) -> Result<usize> {
    let entries = plan.download_entries();
    if entries.is_empty() {
        return Ok(0);
    }
    let staged = transfer::stage_downloads(client, &entries, &config.scratch_dir, progress)?;
    let verified = staged.verify(progress)?;
    verified.promote(&config.mods_dir, progress)
}
