use crate::progress::{self, ProgressCallback, SyncProgress, SyncStage};
use crate::server::ServerClient;
use anyhow::{Context, Result};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::io;
use std::path::Path;
use time::{Date, Month, PrimitiveDateTime, Time as TimeOfDay};

#[derive(Debug, Clone, Copy)]
pub struct ReplaceReport {
    pub files: usize,
    pub bytes: u64,
}

// The script archive carries no manifest checksum, so this path trades
// verification for simplicity: fetch, wipe, extract.
pub fn replace(
    client: &ServerClient,
    archive_name: &str,
    target_dir: &Path,
    scratch: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<ReplaceReport> {
    let archive_path = scratch.join(archive_name);
    client.download_to(archive_name, &archive_path, |done, total| {
        progress::report(
            progress,
            SyncProgress::new(SyncStage::FetchArchive, 0, 1)
                .detail(archive_name.to_string())
                .bytes(done, total),
        );
    })?;
    let report = replace_from_archive(&archive_path, target_dir, progress)?;
    let _ = fs::remove_file(&archive_path);
    Ok(report)
}

// A failure between the wipe and the extraction leaves the target absent or
// partial; callers treat the scripts folder as server-owned and replaceable.
pub fn replace_from_archive(
    archive_path: &Path,
    target_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<ReplaceReport> {
    progress::report(progress, SyncProgress::new(SyncStage::ClearScripts, 0, 1));
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)
            .with_context(|| format!("remove old scripts folder {}", target_dir.display()))?;
    }
    progress::report(progress, SyncProgress::new(SyncStage::ClearScripts, 1, 1));
    extract_archive(archive_path, target_dir, progress)
}

pub fn extract_archive(
    path: &Path,
    dest: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<ReplaceReport> {
    let file =
        fs::File::open(path).with_context(|| format!("open archive {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("read archive {}", path.display()))?;
    fs::create_dir_all(dest)
        .with_context(|| format!("create scripts folder {}", dest.display()))?;

    let count = archive.len();
    let mut files = 0usize;
    let mut bytes = 0u64;
    for index in 0..count {
        let mut entry = archive.by_index(index).context("read archive entry")?;
        let entry_name = entry.name().to_string();
        progress::report(
            progress,
            SyncProgress::new(SyncStage::Extract, index, count).detail(entry_name),
        );
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .with_context(|| format!("create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let mut out_file = fs::File::create(&out_path)
            .with_context(|| format!("create {}", out_path.display()))?;
        let copied = io::copy(&mut entry, &mut out_file)
            .with_context(|| format!("extract {}", out_path.display()))?;
        files += 1;
        bytes += copied;
        if let Some(modified) = entry.last_modified() {
            if let Some(unix) = zip_time_to_unix(modified) {
                let _ = set_file_mtime(&out_path, FileTime::from_unix_time(unix, 0));
            }
        }
    }
    progress::report(progress, SyncProgress::new(SyncStage::Extract, count, count));
    Ok(ReplaceReport { files, bytes })
}

fn zip_time_to_unix(dt: zip::DateTime) -> Option<i64> {
    let month = Month::try_from(dt.month()).ok()?;
    let date = Date::from_calendar_date(dt.year() as i32, month, dt.day()).ok()?;
    let clock = TimeOfDay::from_hms(dt.hour(), dt.minute(), dt.second()).ok()?;
    Some(PrimitiveDateTime::new(date, clock).assume_utc().unix_timestamp())
}
