use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use rand::Rng;
use time::OffsetDateTime;
use tracing::debug;

/// One binary file received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name supplied by the client. Used only to recover an extension; it
    /// never reaches the filesystem.
    pub file_name: String,
    pub body: Bytes,
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Stores the file under a generated name and returns that name.
    async fn save(&self, file: UploadedFile) -> anyhow::Result<String>;
}

/// Disk-backed store writing into the configured upload directory, which is
/// also what the static `/uploads` route serves.
pub struct DiskUploads {
    dir: PathBuf,
}

impl DiskUploads {
    pub async fn new(dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

#[async_trait]
impl UploadStore for DiskUploads {
    async fn save(&self, file: UploadedFile) -> anyhow::Result<String> {
        let name = generated_name(&file.file_name);
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &file.body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;
        debug!(name = %name, bytes = file.body.len(), "upload stored");
        Ok(name)
    }
}

/// Collision-resistant filename: millisecond timestamp plus a random suffix,
/// keeping only a sanitized extension from the client name.
fn generated_name(original: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    match sanitized_extension(original) {
        Some(ext) => format!("{millis}-{suffix}.{ext}"),
        None => format!("{millis}-{suffix}"),
    }
}

fn sanitized_extension(original: &str) -> Option<String> {
    let ext: String = Path::new(original)
        .extension()?
        .to_str()?
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_keep_the_extension() {
        let name = generated_name("clip.MP4");
        assert!(name.ends_with(".mp4"), "got {name}");
    }

    #[test]
    fn generated_names_differ_between_calls() {
        assert_ne!(generated_name("a.mp4"), generated_name("a.mp4"));
    }

    #[test]
    fn generated_names_never_contain_path_parts() {
        for hostile in ["../../etc/passwd", "..\\..\\boot.ini", "/tmp/x.sh", "a/b/c.mp4"] {
            let name = generated_name(hostile);
            assert!(!name.contains('/'), "got {name}");
            assert!(!name.contains('\\'), "got {name}");
            assert!(!name.contains(".."), "got {name}");
        }
    }

    #[test]
    fn extension_is_sanitized_or_dropped() {
        assert_eq!(sanitized_extension("movie.mp4").as_deref(), Some("mp4"));
        assert_eq!(sanitized_extension("shout.WEBM").as_deref(), Some("webm"));
        assert_eq!(sanitized_extension("evil.m%p4").as_deref(), Some("mp4"));
        assert_eq!(sanitized_extension("noext"), None);
        assert_eq!(sanitized_extension(""), None);
        // non-ASCII extensions are stripped entirely
        assert_eq!(sanitized_extension("clip.видео"), None);
    }

    #[tokio::test]
    async fn disk_round_trip_returns_identical_bytes() {
        let dir = std::env::temp_dir().join(format!("reelhub-uploads-{}", uuid::Uuid::new_v4()));
        let store = DiskUploads::new(&dir).await.expect("create store");

        let body = Bytes::from_static(b"\x00\x01binary reel payload\xff");
        let name = store
            .save(UploadedFile {
                file_name: "reel.mp4".into(),
                body: body.clone(),
            })
            .await
            .expect("save upload");

        let read_back = tokio::fs::read(dir.join(&name)).await.expect("read upload");
        assert_eq!(read_back, body);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
