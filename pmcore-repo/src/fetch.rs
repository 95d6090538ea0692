//! Mirror-failover fetching.
//!
//! A repo's `baseurl`/`mirrorlist`/`metalink` triple resolves to an ordered
//! list of [`Mirror`]s. [`fetch_to_file`] tries each in turn; per the
//! refresh protocol, the first transport error is what ultimately surfaces
//! if every mirror fails, while a later, successful mirror still carries the
//! last error forward as context for any failure that happens afterward
//! (e.g. a checksum mismatch discovered once the file is on disk).

use std::path::Path;

/// One source to try for a given remote file.
#[derive(Clone, Debug)]
pub enum Mirror {
    Http(String),
    /// A `file://`-rooted or plain filesystem path, used by local-kind
    /// repos and by tests that want no real network access.
    File(std::path::PathBuf),
}

/// The result of a (possibly multi-mirror) fetch attempt: the bytes that
/// were retrieved, plus the most recent mirror failure seen before success,
/// if any.
pub struct FetchOutcome {
    pub bytes: Vec<u8>,
    pub last_error: Option<String>,
}

/// Fetches `relative` from each mirror in `mirrors`, trying them in order.
pub async fn fetch_to_file(
    client: &reqwest::Client,
    mirrors: &[Mirror],
    relative: &str,
) -> Result<FetchOutcome, String> {
    let mut last_error: Option<String> = None;

    for mirror in mirrors {
        let attempt = match mirror {
            Mirror::Http(base) => fetch_http(client, base, relative).await,
            Mirror::File(root) => fetch_file(root, relative).await,
        };
        match attempt {
            Ok(bytes) => return Ok(FetchOutcome { bytes, last_error }),
            Err(detail) => last_error = Some(detail),
        }
    }

    Err(last_error.unwrap_or_else(|| "no mirrors configured".to_string()))
}

async fn fetch_http(client: &reqwest::Client, base: &str, relative: &str) -> Result<Vec<u8>, String> {
    let url = format!("{}/{}", base.trim_end_matches('/'), relative);
    let response = client.get(&url).send().await.map_err(|e| format!("{url}: {e}"))?;
    let response = response.error_for_status().map_err(|e| format!("{url}: {e}"))?;
    response.bytes().await.map(|b| b.to_vec()).map_err(|e| format!("{url}: {e}"))
}

async fn fetch_file(root: &Path, relative: &str) -> Result<Vec<u8>, String> {
    let path = root.join(relative);
    tokio::fs::read(&path).await.map_err(|e| format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn falls_back_to_second_mirror() {
        let good = tempdir().unwrap();
        std::fs::write(good.path().join("repomd.xml"), b"good").unwrap();
        let missing = tempdir().unwrap();

        let client = reqwest::Client::new();
        let mirrors = vec![
            Mirror::File(missing.path().to_path_buf()),
            Mirror::File(good.path().to_path_buf()),
        ];
        let outcome = fetch_to_file(&client, &mirrors, "repomd.xml").await.unwrap();
        assert_eq!(outcome.bytes, b"good");
        assert!(outcome.last_error.is_some());
    }

    #[tokio::test]
    async fn every_mirror_failing_is_an_error() {
        let missing = tempdir().unwrap();
        let client = reqwest::Client::new();
        let mirrors = vec![Mirror::File(missing.path().to_path_buf())];
        assert!(fetch_to_file(&client, &mirrors, "repomd.xml").await.is_err());
    }
}
