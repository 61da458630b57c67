use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub fn scan(dir: &Path, extension: &str) -> Result<BTreeSet<String>> {
    fs::create_dir_all(dir).with_context(|| format!("create mods folder {}", dir.display()))?;
    let mut names = BTreeSet::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("read mods folder {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read mods folder {}", dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspect {:?}", entry.path()))?;
        if !file_type.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if has_extension(name, extension) {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("create.jar"), b"a").unwrap();
        fs::write(dir.path().join("JEI.JAR"), b"b").unwrap();
        fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        fs::write(dir.path().join("backup.jar.old"), b"d").unwrap();
        fs::create_dir(dir.path().join("nested.jar")).unwrap();

        let names = scan(dir.path(), "jar").unwrap();
        let expected: BTreeSet<String> =
            ["JEI.JAR".to_string(), "create.jar".to_string()].into();
        assert_eq!(names, expected);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("instance").join("mods");
        let names = scan(&mods, "jar").unwrap();
        assert!(names.is_empty());
        assert!(mods.is_dir());
    }

    #[test]
    fn extension_match_is_case_insensitive_and_suffix_only() {
        assert!(has_extension("a.jar", "jar"));
        assert!(has_extension("a.JaR", "jar"));
        assert!(!has_extension("jar", "jar"));
        assert!(!has_extension("a.jarx", "jar"));
        assert!(!has_extension("a.jar.disabled", "jar"));
    }
}
