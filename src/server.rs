use crate::config::UpdaterConfig;
use crate::errors::SyncError;
use crate::manifest::Manifest;
use crate::progress::{self, ProgressCallback, SyncProgress, SyncStage};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

pub(crate) const USER_AGENT: &str = concat!("modsync/", env!("CARGO_PKG_VERSION"));

// No read timeout on the agent: mod downloads can legitimately take minutes
// on slow links, and the manifest fetch reports slowness instead of aborting.
const SLOW_FETCH_AFTER: Duration = Duration::from_secs(10);

pub const SLOW_FETCH_NOTICE: &str = "This is taking longer than usual, still waiting...";

pub struct ServerClient {
    agent: ureq::Agent,
    base: String,
    manifest_path: String,
    files_path: String,
    slow_after: Duration,
}

impl ServerClient {
    pub fn new(config: &UpdaterConfig) -> Self {
        Self::with_slow_after(config, SLOW_FETCH_AFTER)
    }

    fn with_slow_after(config: &UpdaterConfig, slow_after: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base: config.server_url.trim_end_matches('/').to_string(),
            manifest_path: config.manifest_path.clone(),
            files_path: config.files_path.clone(),
            slow_after,
        }
    }

    pub fn manifest_url(&self) -> String {
        join_url(&self.base, &self.manifest_path)
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/{}", join_url(&self.base, &self.files_path), name)
    }

    pub fn fetch_manifest(&self, progress: Option<&ProgressCallback>) -> Result<Manifest> {
        progress::report(progress, SyncProgress::new(SyncStage::FetchManifest, 0, 1));
        let agent = self.agent.clone();
        let url = self.manifest_url();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(fetch_manifest_body(&agent, &url));
        });
        let received = match rx.recv_timeout(self.slow_after) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                progress::report(
                    progress,
                    SyncProgress::new(SyncStage::FetchManifest, 0, 1).detail(SLOW_FETCH_NOTICE),
                );
                rx.recv().context("manifest fetch worker exited")?
            }
            Err(RecvTimeoutError::Disconnected) => bail!("manifest fetch worker exited"),
        };
        let manifest = Manifest::parse(&received?)?;
        progress::report(progress, SyncProgress::new(SyncStage::FetchManifest, 1, 1));
        Ok(manifest)
    }

    pub fn download_to(
        &self,
        name: &str,
        dest: &Path,
        mut on_bytes: impl FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        let url = self.file_url(name);
        let response = self
            .agent
            .get(&url)
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|err| SyncError::Download {
                name: name.to_string(),
                reason: failure_reason(err),
            })?;
        let total = response
            .header("Content-Length")
            .and_then(|value| value.parse::<u64>().ok());
        let mut reader = response.into_reader();
        let mut file =
            File::create(dest).with_context(|| format!("create {}", dest.display()))?;
        let mut received = 0u64;
        let mut buffer = [0u8; 64 * 1024];
        loop {
            // A failed read here is the connection dying, not a disk problem.
            let read = reader.read(&mut buffer).map_err(|err| SyncError::Download {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .with_context(|| format!("write {}", dest.display()))?;
            received += read as u64;
            on_bytes(received, total);
        }
        Ok(received)
    }
}

fn fetch_manifest_body(agent: &ureq::Agent, url: &str) -> Result<String> {
    let response = agent
        .get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|err| SyncError::ManifestUnavailable(failure_reason(err)))?;
    let body = response
        .into_string()
        .map_err(|err| SyncError::ManifestUnavailable(err.to_string()))?;
    Ok(body)
}

fn failure_reason(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, _) => format!("server answered HTTP {code}"),
        other => other.to_string(),
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    fn client_for(url: &str) -> ServerClient {
        let mut config = UpdaterConfig::default();
        config.server_url = url.to_string();
        ServerClient::new(&config)
    }

    #[test]
    fn urls_are_joined_without_doubled_slashes() {
        assert_eq!(join_url("http://host:6969", "/list"), "http://host:6969/list");
        assert_eq!(join_url("http://host:6969/", "list"), "http://host:6969/list");
        assert_eq!(join_url("http://host:6969/", "/list"), "http://host:6969/list");
    }

    #[test]
    fn file_urls_follow_the_configured_paths() {
        let client = client_for("http://packs.example.net:6969/");
        assert_eq!(
            client.manifest_url(),
            "http://packs.example.net:6969/list"
        );
        assert_eq!(
            client.file_url("create.jar"),
            "http://packs.example.net:6969/dl/create.jar"
        );
    }

    #[test]
    fn unreachable_server_maps_to_manifest_unavailable() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(200))
            .build();
        let err = fetch_manifest_body(&agent, "http://192.0.2.1:6969/list").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::ManifestUnavailable(_))
        ));
    }

    #[test]
    fn stalled_manifest_fetch_warns_once_and_still_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let checksum = "ab".repeat(32);
        let payload = format!("[{{\"name\":\"alpha.jar\",\"checksum\":\"{checksum}\"}}]");
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request);
            thread::sleep(Duration::from_millis(700));
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{payload}",
                payload.len()
            );
            socket.write_all(response.as_bytes()).unwrap();
        });

        let mut config = UpdaterConfig::default();
        config.server_url = format!("http://{address}");
        let client = ServerClient::with_slow_after(&config, Duration::from_millis(150));

        let seen: Arc<Mutex<Vec<SyncProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        });

        let manifest = client.fetch_manifest(Some(&progress)).unwrap();
        server.join().unwrap();

        assert_eq!(manifest.checksum_of("alpha.jar"), Some(checksum.as_str()));
        let seen = seen.lock().unwrap();
        let warnings = seen
            .iter()
            .filter(|event| event.detail.as_deref() == Some(SLOW_FETCH_NOTICE))
            .count();
        assert_eq!(warnings, 1);
    }
}
