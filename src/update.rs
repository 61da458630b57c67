use crate::config::UpdaterConfig;
use crate::server;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
}

pub fn check_remote_version(config: &UpdaterConfig, current: &str) -> Result<Option<String>> {
    // Short timeouts here; the banner check must never stall a run.
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(10))
        .timeout_write(Duration::from_secs(10))
        .build();
    let url = server::join_url(&config.server_url, &config.version_path);
    let response = agent
        .get(&url)
        .set("User-Agent", server::USER_AGENT)
        .call()
        .context("fetch server version")?;
    let info: VersionInfo = response.into_json().context("decode server version")?;
    let latest = normalize_version(&info.version);
    if is_newer_version(&latest, current) {
        Ok(Some(latest))
    } else {
        Ok(None)
    }
}

fn normalize_version(tag: &str) -> String {
    tag.trim().trim_start_matches('v').to_string()
}

fn is_newer_version(latest: &str, current: &str) -> bool {
    match (parse_version(latest), parse_version(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => false,
    }
}

fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let mut parts = raw.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tags_are_normalized() {
        assert_eq!(normalize_version("v1.2.3"), "1.2.3");
        assert_eq!(normalize_version(" 1.2.3 "), "1.2.3");
    }

    #[test]
    fn newer_versions_are_detected() {
        assert!(is_newer_version("1.2.3", "1.2.2"));
        assert!(is_newer_version("2.0.0", "1.9.9"));
        assert!(!is_newer_version("1.2.3", "1.2.3"));
        assert!(!is_newer_version("1.2.2", "1.2.3"));
    }

    #[test]
    fn garbage_versions_never_count_as_newer() {
        assert!(!is_newer_version("latest", "1.2.3"));
        assert!(!is_newer_version("1.2", "1.2.3"));
        assert!(!is_newer_version("1.2.3.4", "1.2.3"));
    }
}
