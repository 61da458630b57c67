use crate::digest;
use crate::errors::{ChecksumFailure, SyncError};
use crate::manifest::ManifestEntry;
use crate::progress::{self, ProgressCallback, SyncProgress, SyncStage};
use crate::server::ServerClient;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TransferJob {
    pub name: String,
    pub checksum: String,
    pub scratch_path: PathBuf,
}

pub fn prepare_scratch(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("clear scratch folder {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("create scratch folder {}", dir.display()))?;
    Ok(())
}

pub fn stage_downloads(
    client: &ServerClient,
    entries: &[ManifestEntry],
    scratch: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<StagedBatch> {
    let count = entries.len();
    let mut jobs = Vec::with_capacity(count);
    for (index, entry) in entries.iter().enumerate() {
        let scratch_path = scratch.join(&entry.name);
        client.download_to(&entry.name, &scratch_path, |done, total| {
            progress::report(
                progress,
                SyncProgress::new(SyncStage::Download, index, count)
                    .detail(entry.name.clone())
                    .bytes(done, total),
            );
        })?;
        jobs.push(TransferJob {
            name: entry.name.clone(),
            checksum: entry.checksum.clone(),
            scratch_path,
        });
        progress::report(progress, SyncProgress::new(SyncStage::Download, index + 1, count));
    }
    Ok(StagedBatch { jobs })
}

#[derive(Debug)]
pub struct StagedBatch {
    jobs: Vec<TransferJob>,
}

impl StagedBatch {
    pub fn verify(self, progress: Option<&ProgressCallback>) -> Result<VerifiedBatch> {
        let count = self.jobs.len();
        let mut mismatches = Vec::new();
        for (index, job) in self.jobs.iter().enumerate() {
            progress::report(
                progress,
                SyncProgress::new(SyncStage::Verify, index, count).detail(job.name.clone()),
            );
            let actual = digest::file_digest(&job.scratch_path)?;
            if actual != job.checksum {
                mismatches.push(ChecksumFailure {
                    name: job.name.clone(),
                    expected: job.checksum.clone(),
                    actual,
                });
            }
        }
        if !mismatches.is_empty() {
            // One bad file scraps the whole batch; nothing reaches the mods folder.
            for job in &self.jobs {
                let _ = fs::remove_file(&job.scratch_path);
            }
            return Err(SyncError::ChecksumMismatch(mismatches).into());
        }
        progress::report(progress, SyncProgress::new(SyncStage::Verify, count, count));
        Ok(VerifiedBatch { jobs: self.jobs })
    }
}

#[derive(Debug)]
pub struct VerifiedBatch {
    jobs: Vec<TransferJob>,
}

impl VerifiedBatch {
    pub fn promote(self, target: &Path, progress: Option<&ProgressCallback>) -> Result<usize> {
        let count = self.jobs.len();
        for (index, job) in self.jobs.iter().enumerate() {
            progress::report(
                progress,
                SyncProgress::new(SyncStage::Promote, index, count).detail(job.name.clone()),
            );
            let dest = target.join(&job.name);
            fs::rename(&job.scratch_path, &dest).with_context(|| {
                format!(
                    "move {} into {}",
                    job.scratch_path.display(),
                    target.display()
                )
            })?;
        }
        progress::report(progress, SyncProgress::new(SyncStage::Promote, count, count));
        Ok(count)
    }
}
