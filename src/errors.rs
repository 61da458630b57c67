use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumFailure {
    pub name: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("update server unavailable ({0})")]
    ManifestUnavailable(String),
    #[error("mod manifest malformed ({0})")]
    ManifestMalformed(String),
    #[error("download failed for {name} ({reason})")]
    Download { name: String, reason: String },
    #[error("{}", checksum_summary(.0))]
    ChecksumMismatch(Vec<ChecksumFailure>),
    #[error("cancelled by user")]
    Cancelled,
}

fn checksum_summary(failures: &[ChecksumFailure]) -> String {
    let names: Vec<&str> = failures.iter().map(|failure| failure.name.as_str()).collect();
    format!("checksum mismatch for {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_every_file() {
        let err = SyncError::ChecksumMismatch(vec![
            ChecksumFailure {
                name: "alpha.jar".to_string(),
                expected: "aa".to_string(),
                actual: "bb".to_string(),
            },
            ChecksumFailure {
                name: "beta.jar".to_string(),
                expected: "cc".to_string(),
                actual: "dd".to_string(),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("alpha.jar"));
        assert!(message.contains("beta.jar"));
    }
}
