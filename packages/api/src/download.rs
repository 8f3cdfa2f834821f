//! Streaming archive download.
//!
//! Reads archives can run to several gigabytes, so the body goes to disk
//! chunk by chunk. Bytes land in `{dest}.part` first and the file is
//! renamed into place only once the body has been fully written, so an
//! interrupted transfer never leaves a truncated archive under the final
//! name.

use std::path::{Path, PathBuf};

use futures::StreamExt as _;
use tokio::io::AsyncWriteExt as _;

use crate::ApiError;
use crate::progress::ProgressCallback;

const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Streams `url` into `dest`, returning the number of bytes written.
///
/// The parent directory is created if needed and an existing `dest` is
/// replaced. Archive links are pre-signed, so no `Authorization` header
/// is sent. `progress` gets the `Content-Length` (when the server sends
/// one) and every chunk size.
///
/// # Errors
///
/// Returns [`ApiError::HttpStatus`] for a non-success response,
/// [`ApiError::Http`] if the transfer breaks off, and [`ApiError::Io`] if
/// the file cannot be written.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: &dyn ProgressCallback,
) -> Result<u64, ApiError> {
    log::debug!("GET {url}");

    if let Some(dir) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(|e| io_err(dir, e))?;
    }

    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    match resp.content_length() {
        Some(len) => {
            progress.set_total(len);
            log::info!("Downloading {} ({})", dest.display(), mib(len));
        }
        None => log::info!("Downloading {} (size unknown)", dest.display()),
    }

    let part = part_path(dest);
    match write_staged(resp, &part, dest, progress).await {
        Ok(written) => {
            log::info!("Saved {} ({})", dest.display(), mib(written));
            Ok(written)
        }
        Err(e) => {
            discard_partial(&part).await;
            Err(e)
        }
    }
}

/// Writes the response body to `part`, then renames it to `dest`.
async fn write_staged(
    resp: reqwest::Response,
    part: &Path,
    dest: &Path,
    progress: &dyn ProgressCallback,
) -> Result<u64, ApiError> {
    let mut out = tokio::fs::File::create(part)
        .await
        .map_err(|e| io_err(part, e))?;

    let mut body = resp.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await.map_err(|e| io_err(part, e))?;
        written += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    }

    out.flush().await.map_err(|e| io_err(part, e))?;
    drop(out);

    tokio::fs::rename(part, dest)
        .await
        .map_err(|e| io_err(dest, e))?;

    Ok(written)
}

/// Removes a staging file left by a failed transfer.
async fn discard_partial(part: &Path) {
    match tokio::fs::remove_file(part).await {
        Ok(()) => log::debug!("Removed partial download {}", part.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial download {}: {e}", part.display()),
    }
}

/// `{dest}.part`, the staging name used while a transfer is in flight.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[allow(clippy::cast_precision_loss)]
fn mib(bytes: u64) -> String {
    format!("{:.1} MiB", bytes as f64 / BYTES_PER_MIB)
}

fn io_err(path: &Path, source: std::io::Error) -> ApiError {
    ApiError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    use super::*;
    use crate::progress::NullProgress;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/data/ABC123/ABC123_reads.zip")),
            PathBuf::from("/data/ABC123/ABC123_reads.zip.part")
        );
    }

    #[test]
    fn formats_sizes_in_mib() {
        assert_eq!(mib(0), "0.0 MiB");
        assert_eq!(mib(3 * 1_048_576 / 2), "1.5 MiB");
    }

    /// Serves one canned HTTP response on a local port and returns its URL.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(&response).await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}/archive.zip")
    }

    fn fresh_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&tmp);
        tmp
    }

    #[tokio::test]
    async fn complete_body_is_renamed_into_place() {
        let tmp = fresh_dir("seqfetch_download_complete");
        let dest = tmp.join("ABC123_results.zip");
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(b"0123456789");
        let url = serve_once(response).await;

        let written = download_file(&reqwest::Client::new(), &url, &dest, &NullProgress)
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789");
        assert!(!part_path(&dest).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn truncated_body_removes_staging_file() {
        let tmp = fresh_dir("seqfetch_download_truncated");
        let dest = tmp.join("ABC123_reads.zip");
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(b"0123456789");
        let url = serve_once(response).await;

        let err = download_file(&reqwest::Client::new(), &url, &dest, &NullProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Http(_)), "{err}");
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn error_status_writes_nothing() {
        let tmp = fresh_dir("seqfetch_download_status");
        let dest = tmp.join("ABC123_reads.zip");
        let url = serve_once(
            b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        )
        .await;

        let err = download_file(&reqwest::Client::new(), &url, &dest, &NullProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::HttpStatus { status: 403, .. }), "{err}");
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn unreachable_host_leaves_nothing_behind() {
        let tmp = std::env::temp_dir().join("seqfetch_download_unreachable");
        let _ = std::fs::remove_dir_all(&tmp);
        let dest = tmp.join("ABC123_results.zip");

        let err = download_file(
            &reqwest::Client::new(),
            "http://127.0.0.1:1/archive.zip",
            &dest,
            &NullProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::Http(_)), "{err}");
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
