//! services/api/src/adapters/files.rs
//!
//! Reads image files from disk for the command-line entry point.

use std::path::{Path, PathBuf};

use boardvision_core::domain::ImageAsset;
use boardvision_core::ingestion::{ingest_batch, mime_from_file_name, RawUpload};
use boardvision_core::ports::{PortError, PortResult};

async fn read_upload(path: PathBuf) -> PortResult<RawUpload> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| PortError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = mime_from_file_name(&file_name)
        .unwrap_or("application/octet-stream")
        .to_string();
    Ok(RawUpload {
        file_name,
        mime_type,
        bytes,
    })
}

/// Reads every path concurrently. One unreadable file fails the whole batch.
pub async fn read_image_files<P: AsRef<Path>>(paths: &[P]) -> PortResult<Vec<ImageAsset>> {
    ingest_batch(paths.iter().map(|p| read_upload(p.as_ref().to_path_buf()))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_images_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("board.png");
        std::fs::File::create(&png).unwrap().write_all(&[0x89, b'P', b'N', b'G']).unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hello").unwrap();

        let assets = read_image_files(&[png, txt]).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].mime_type, "image/png");
        assert_eq!(assets[0].raw_base64, "iVBORw==");
    }

    #[tokio::test]
    async fn test_missing_file_fails_batch() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        std::fs::write(&png, [1u8, 2, 3]).unwrap();
        let missing = dir.path().join("missing.jpg");

        let outcome = read_image_files(&[png, missing]).await;
        assert!(matches!(outcome, Err(PortError::InvalidInput(_))));
    }
}
