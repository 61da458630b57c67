use crate::manifest::Manifest;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub missing: BTreeSet<String>,
    pub unneeded: BTreeSet<String>,
    pub kept: BTreeSet<String>,
    pub stale: BTreeSet<String>,
}

impl Reconciliation {
    pub fn to_download(&self) -> BTreeSet<String> {
        self.missing.union(&self.stale).cloned().collect()
    }

    pub fn to_delete(&self) -> BTreeSet<String> {
        let removable: BTreeSet<String> =
            self.unneeded.difference(&self.kept).cloned().collect();
        removable.union(&self.stale).cloned().collect()
    }

    pub fn is_converged(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty() && self.to_delete().is_empty()
    }
}

pub fn reconcile(
    manifest: &Manifest,
    inventory: &BTreeSet<String>,
    exceptions: &BTreeSet<String>,
) -> Reconciliation {
    reconcile_verified(manifest, inventory, exceptions, &BTreeMap::new())
}

pub fn reconcile_verified(
    manifest: &Manifest,
    inventory: &BTreeSet<String>,
    exceptions: &BTreeSet<String>,
    local_digests: &BTreeMap<String, String>,
) -> Reconciliation {
    let expected = manifest.names();
    let missing = expected.difference(inventory).cloned().collect();
    let unneeded: BTreeSet<String> = inventory.difference(&expected).cloned().collect();
    let kept = unneeded.intersection(exceptions).cloned().collect();
    let mut stale = BTreeSet::new();
    for name in inventory.intersection(&expected) {
        let Some(actual) = local_digests.get(name) else {
            continue;
        };
        if manifest.checksum_of(name) != Some(actual.as_str()) {
            stale.insert(name.clone());
        }
    }
    Reconciliation {
        missing,
        unneeded,
        kept,
        stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;

    const SUM_A: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const SUM_B: &str = "62311277164dead254940cea6032fafba0ef6c61582ada09ec28278cfa41f850";

    fn manifest(names: &[&str]) -> Manifest {
        let entries = names
            .iter()
            .map(|name| ManifestEntry {
                name: name.to_string(),
                checksum: SUM_A.to_string(),
            })
            .collect();
        Manifest::from_entries(entries).unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn splits_missing_and_unneeded() {
        let outcome = reconcile(
            &manifest(&["a.jar", "b.jar", "c.jar"]),
            &set(&["b.jar", "c.jar", "local.jar"]),
            &set(&[]),
        );
        assert_eq!(outcome.missing, set(&["a.jar"]));
        assert_eq!(outcome.unneeded, set(&["local.jar"]));
        assert!(outcome.kept.is_empty());
        assert!(outcome.stale.is_empty());
    }

    #[test]
    fn exceptions_shield_unneeded_files() {
        let outcome = reconcile(
            &manifest(&["a.jar"]),
            &set(&["a.jar", "optifine.jar", "extra.jar"]),
            &set(&["optifine.jar"]),
        );
        assert_eq!(outcome.kept, set(&["optifine.jar"]));
        assert_eq!(outcome.to_delete(), set(&["extra.jar"]));
    }

    #[test]
    fn exception_toggles_whether_a_local_mod_is_deleted() {
        let m = manifest(&["a.jar", "b.jar"]);
        let inventory = set(&["b.jar", "c.jar"]);

        let shielded = reconcile(&m, &inventory, &set(&["c.jar"]));
        assert_eq!(shielded.missing, set(&["a.jar"]));
        assert_eq!(shielded.unneeded, set(&["c.jar"]));
        assert!(shielded.to_delete().is_empty());

        let unshielded = reconcile(&m, &inventory, &set(&[]));
        assert_eq!(unshielded.to_delete(), set(&["c.jar"]));
    }

    #[test]
    fn exception_for_a_manifest_file_has_no_effect() {
        let outcome = reconcile(&manifest(&["a.jar"]), &set(&["a.jar"]), &set(&["a.jar"]));
        assert!(outcome.kept.is_empty());
        assert!(outcome.is_converged());
    }

    #[test]
    fn converged_directory_yields_empty_plan() {
        let outcome = reconcile(
            &manifest(&["a.jar", "b.jar"]),
            &set(&["a.jar", "b.jar"]),
            &set(&[]),
        );
        assert!(outcome.is_converged());
        assert!(outcome.to_download().is_empty());
        assert!(outcome.to_delete().is_empty());
    }

    #[test]
    fn empty_manifest_marks_everything_unneeded() {
        let outcome = reconcile(&manifest(&[]), &set(&["a.jar", "b.jar"]), &set(&[]));
        assert_eq!(outcome.unneeded, set(&["a.jar", "b.jar"]));
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn corrupted_file_is_both_deleted_and_redownloaded() {
        let mut digests = BTreeMap::new();
        digests.insert("a.jar".to_string(), SUM_B.to_string());
        digests.insert("b.jar".to_string(), SUM_A.to_string());
        let outcome = reconcile_verified(
            &manifest(&["a.jar", "b.jar"]),
            &set(&["a.jar", "b.jar"]),
            &set(&[]),
            &digests,
        );
        assert_eq!(outcome.stale, set(&["a.jar"]));
        assert_eq!(outcome.to_download(), set(&["a.jar"]));
        assert_eq!(outcome.to_delete(), set(&["a.jar"]));
    }

    #[test]
    fn exceptions_do_not_shield_corrupted_manifest_files() {
        let mut digests = BTreeMap::new();
        digests.insert("a.jar".to_string(), SUM_B.to_string());
        let outcome = reconcile_verified(
            &manifest(&["a.jar"]),
            &set(&["a.jar"]),
            &set(&["a.jar"]),
            &digests,
        );
        assert_eq!(outcome.to_delete(), set(&["a.jar"]));
    }

    #[test]
    fn undigested_files_are_trusted() {
        let outcome = reconcile_verified(
            &manifest(&["a.jar"]),
            &set(&["a.jar"]),
            &set(&[]),
            &BTreeMap::new(),
        );
        assert!(outcome.stale.is_empty());
        assert!(outcome.is_converged());
    }

    #[test]
    fn reconcile_is_idempotent_after_apply() {
        let m = manifest(&["a.jar", "b.jar"]);
        let outcome = reconcile(&m, &set(&["b.jar", "junk.jar"]), &set(&[]));

        let mut applied = set(&["b.jar", "junk.jar"]);
        for name in outcome.to_delete() {
            applied.remove(&name);
        }
        for name in outcome.to_download() {
            applied.insert(name);
        }

        let second = reconcile(&m, &applied, &set(&[]));
        assert!(second.is_converged());
    }

    #[test]
    fn missing_never_overlaps_unneeded() {
        let outcome = reconcile(
            &manifest(&["a.jar", "b.jar"]),
            &set(&["b.jar", "c.jar"]),
            &set(&["c.jar", "ghost.jar"]),
        );
        assert!(outcome.missing.is_disjoint(&outcome.unneeded));
        assert!(outcome.kept.is_subset(&outcome.unneeded));
    }
}
