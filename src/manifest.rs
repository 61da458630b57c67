use crate::digest;
use crate::errors::SyncError;
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub checksum: String,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn parse(raw: &str) -> Result<Self> {
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(raw).map_err(|err| malformed(err.to_string()))?;
        Self::from_entries(entries)
    }

    pub fn from_entries(mut entries: Vec<ManifestEntry>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for entry in &mut entries {
            if entry.name.is_empty() {
                return Err(malformed("entry with empty file name".to_string()));
            }
            if !is_bare_file_name(&entry.name) {
                return Err(malformed(format!("unsafe file name {:?}", entry.name)));
            }
            entry.checksum = entry.checksum.to_lowercase();
            if !digest::is_hex_digest(&entry.checksum) {
                return Err(malformed(format!("bad checksum for {:?}", entry.name)));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(malformed(format!("duplicate entry {:?}", entry.name)));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn checksum_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.checksum.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn malformed(message: String) -> anyhow::Error {
    SyncError::ManifestMalformed(message).into()
}

fn is_bare_file_name(name: &str) -> bool {
    name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_SUM: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn entry(name: &str, checksum: &str) -> ManifestEntry {
        ManifestEntry {
            name: name.to_string(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn parses_a_server_listing() {
        let raw = format!(
            r#"[{{"name":"create.jar","checksum":"{GOOD_SUM}"}},{{"name":"jei.jar","checksum":"{GOOD_SUM}"}}]"#
        );
        let manifest = Manifest::parse(&raw).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.checksum_of("jei.jar"), Some(GOOD_SUM));
        assert_eq!(manifest.checksum_of("missing.jar"), None);
    }

    #[test]
    fn empty_listing_is_valid() {
        let manifest = Manifest::parse("[]").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn rejects_non_json() {
        let err = Manifest::parse("<html>502</html>").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::ManifestMalformed(_))
        ));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(Manifest::parse(r#"[{"name":"create.jar"}]"#).is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let entries = vec![entry("create.jar", GOOD_SUM), entry("create.jar", GOOD_SUM)];
        assert!(Manifest::from_entries(entries).is_err());
    }

    #[test]
    fn rejects_path_traversal_names() {
        for name in ["../evil.jar", "mods/evil.jar", "..", ".", r"a\b.jar", ""] {
            let entries = vec![entry(name, GOOD_SUM)];
            assert!(Manifest::from_entries(entries).is_err(), "accepted {name:?}");
        }
    }

    #[test]
    fn rejects_short_or_garbled_checksums() {
        assert!(Manifest::from_entries(vec![entry("a.jar", "abc123")]).is_err());
        assert!(Manifest::from_entries(vec![entry("a.jar", &"g".repeat(64))]).is_err());
    }

    #[test]
    fn checksums_are_normalized_to_lowercase() {
        let upper = GOOD_SUM.to_uppercase();
        let manifest = Manifest::from_entries(vec![entry("a.jar", &upper)]).unwrap();
        assert_eq!(manifest.checksum_of("a.jar"), Some(GOOD_SUM));
    }

    #[test]
    fn preserves_server_order() {
        let entries = vec![
            entry("zzz.jar", GOOD_SUM),
            entry("aaa.jar", GOOD_SUM),
            entry("mmm.jar", GOOD_SUM),
        ];
        let manifest = Manifest::from_entries(entries).unwrap();
        let names: Vec<&str> = manifest.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["zzz.jar", "aaa.jar", "mmm.jar"]);
    }
}
