//! crates/boardvision_core/src/ingestion.rs
//!
//! Turns selected files into `ImageAsset`s.
//!
//! A batch is all-or-nothing: every read is started at once and the batch is
//! only produced after all of them settle. If any read fails the whole batch
//! fails and nothing is merged into the pending uploads.

use std::future::Future;

use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::try_join_all;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ImageAsset;
use crate::ports::PortResult;

/// The bytes of one selected file and the MIME type it declared.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Guesses an image MIME type from a file name's extension.
pub fn mime_from_file_name(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

impl ImageAsset {
    pub fn from_upload(upload: RawUpload) -> Self {
        let mime_type = upload.mime_type.trim().to_ascii_lowercase();
        let raw_base64 = STANDARD.encode(&upload.bytes);
        let preview_ref = format!("data:{};base64,{}", mime_type, raw_base64);
        Self {
            id: Uuid::new_v4(),
            raw_base64,
            mime_type,
            preview_ref,
        }
    }
}

/// Runs every pending read concurrently and converts the image files.
///
/// Non-image files are skipped. The first failing read fails the batch.
pub async fn ingest_batch<I, F>(reads: I) -> PortResult<Vec<ImageAsset>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = PortResult<RawUpload>>,
{
    let uploads = try_join_all(reads).await?;
    let total = uploads.len();

    let assets: Vec<ImageAsset> = uploads
        .into_iter()
        .filter(|upload| {
            let keep = is_image_mime(&upload.mime_type);
            if !keep {
                debug!(
                    "Skipping non-image file '{}' ({})",
                    upload.file_name, upload.mime_type
                );
            }
            keep
        })
        .map(ImageAsset::from_upload)
        .collect();

    info!("Ingested {} of {} selected files", assets.len(), total);
    Ok(assets)
}

/// The pending set without the asset `id`.
pub fn without_asset(assets: &[ImageAsset], id: Uuid) -> Vec<ImageAsset> {
    assets.iter().filter(|a| a.id != id).cloned().collect()
}
