//! Image encoding for build requests.
//!
//! Local files become self-contained `{name, data}` payloads where `data` is a
//! base64 `data:` URI, ready to embed in the JSON request body.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::errors::BuildError;

/// One encoded image as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub name: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
}

/// Encode raw bytes, guessing the MIME type from `name`.
pub fn encode_image_bytes(name: &str, bytes: &[u8]) -> EncodedImage {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    EncodedImage {
        name: name.to_string(),
        data: format!("data:{};base64,{}", mime.essence_str(), BASE64.encode(bytes)),
    }
}

/// Read and encode every file concurrently.
///
/// The result keeps the order of `paths` no matter which read finishes
/// first. Any unreadable file fails the whole batch; no partial result is
/// returned.
pub async fn encode_images(paths: &[PathBuf]) -> Result<Vec<EncodedImage>, BuildError> {
    encode_with(paths, |path| tokio::fs::read(path)).await
}

/// [`encode_images`] over an arbitrary async reader.
async fn encode_with<F, Fut>(paths: &[PathBuf], read: F) -> Result<Vec<EncodedImage>, BuildError>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = std::io::Result<Vec<u8>>>,
{
    try_join_all(paths.iter().map(|path| {
        let pending = read(path.clone());
        async move {
            let bytes = pending.await.map_err(|source| BuildError::ImageRead {
                path: path.clone(),
                source,
            })?;
            Ok::<_, BuildError>(encode_file(path, &bytes))
        }
    }))
    .await
}

fn encode_file(path: &Path, bytes: &[u8]) -> EncodedImage {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(image = %name, bytes = bytes.len(), "encoded image");
    encode_image_bytes(&name, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn encodes_png_as_data_uri() {
        let img = encode_image_bytes("logo.png", b"abc");
        assert_eq!(img.name, "logo.png");
        assert_eq!(img.data, "data:image/png;base64,YWJj");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let img = encode_image_bytes("blob.zzqx", b"\x00\x01");
        assert!(img.data.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let img = encode_image_bytes("a.jpg", b"x");
        let json = serde_json::to_value(&img).unwrap();
        assert_eq!(json["name"], "a.jpg");
        assert!(json["data"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn reads_files_from_disk() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, size) in [("big.png", 512 * 1024), ("tiny.gif", 1)] {
            let path = dir.path().join(name);
            fs::write(&path, vec![7u8; size]).unwrap();
            paths.push(path);
        }

        let images = encode_images(&paths).await.unwrap();
        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["big.png", "tiny.gif"]);
        assert!(images[1].data.starts_with("data:image/gif;base64,"));
    }

    #[tokio::test(start_paused = true)]
    async fn output_order_ignores_completion_order() {
        use std::sync::{Arc, Mutex};
        use std::time::Duration;

        let finished: Arc<Mutex<Vec<String>>> = Arc::default();
        let paths: Vec<PathBuf> = ["first.png", "second.gif", "third.jpg"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let read = |path: PathBuf| {
            let finished = Arc::clone(&finished);
            async move {
                let name = path.to_string_lossy().into_owned();
                // The first selection finishes last.
                let delay = match name.as_str() {
                    "first.png" => 300,
                    "second.gif" => 100,
                    _ => 200,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                finished.lock().unwrap().push(name.clone());
                Ok::<_, std::io::Error>(name.into_bytes())
            }
        };

        let images = encode_with(&paths, read).await.unwrap();

        assert_eq!(
            *finished.lock().unwrap(),
            vec!["second.gif", "third.jpg", "first.png"]
        );
        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["first.png", "second.gif", "third.jpg"]);
        assert_eq!(images[0], encode_image_bytes("first.png", b"first.png"));
    }

    #[tokio::test(start_paused = true)]
    async fn late_failure_still_fails_the_batch() {
        use std::time::Duration;

        let paths = vec![PathBuf::from("ok.png"), PathBuf::from("broken.png")];
        let read = |path: PathBuf| async move {
            if path.ends_with("broken.png") {
                tokio::time::sleep(Duration::from_millis(500)).await;
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(b"fine".to_vec())
        };

        let err = encode_with(&paths, read).await.unwrap_err();
        assert!(matches!(err, BuildError::ImageRead { ref path, .. } if path.ends_with("broken.png")));
    }

    #[tokio::test]
    async fn empty_selection_is_empty() {
        assert!(encode_images(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_missing_file_fails_the_batch() {
        let dir = tempdir().unwrap();
        let ok = dir.path().join("ok.png");
        fs::write(&ok, b"fine").unwrap();
        let missing = dir.path().join("missing.png");

        let err = encode_images(&[ok, missing.clone()]).await.unwrap_err();
        match err {
            BuildError::ImageRead { path, .. } => assert_eq!(path, missing),
            other => panic!("Expected ImageRead, got {other:?}"),
        }
    }
}
