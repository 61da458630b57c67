use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    FetchManifest,
    ScanMods,
    CheckLocal,
    Delete,
    Download,
    Verify,
    Promote,
    FetchArchive,
    ClearScripts,
    Extract,
}

impl SyncStage {
    pub fn label(self) -> &'static str {
        match self {
            SyncStage::FetchManifest => "Fetching mod list",
            SyncStage::ScanMods => "Scanning mods folder",
            SyncStage::CheckLocal => "Checking installed mods",
            SyncStage::Delete => "Deleting",
            SyncStage::Download => "Downloading",
            SyncStage::Verify => "Verifying downloads",
            SyncStage::Promote => "Installing",
            SyncStage::FetchArchive => "Downloading script archive",
            SyncStage::ClearScripts => "Clearing old scripts",
            SyncStage::Extract => "Extracting scripts",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub stage: SyncStage,
    pub current: usize,
    pub total: usize,
    pub detail: Option<String>,
    pub bytes_done: Option<u64>,
    pub bytes_total: Option<u64>,
}

impl SyncProgress {
    pub fn new(stage: SyncStage, current: usize, total: usize) -> Self {
        Self {
            stage,
            current,
            total,
            detail: None,
            bytes_done: None,
            bytes_total: None,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bytes(mut self, done: u64, total: Option<u64>) -> Self {
        self.bytes_done = Some(done);
        self.bytes_total = total;
        self
    }
}

pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

pub fn report(progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(callback) = progress {
        callback(event);
    }
}
