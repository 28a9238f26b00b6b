//! # Local Media Store
//!
//! Filesystem implementation of `MediaStore`: image uploads land under a
//! sharded random-id path inside a public static-serving root.

use async_trait::async_trait;
use domains::{AppError, MediaStore, Result};
use mime::Mime;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g. "./data/media").
    root: PathBuf,
    /// Public URL prefix (e.g. "/static/media").
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root, url_prefix }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload as `<aa>/<uuid>.<ext>` where `aa` is the id's first
    /// two hex chars. Only image MIME types are accepted, and the payload
    /// must actually decode as a known image format.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> Result<String> {
        let mime: Mime = content_type
            .parse()
            .map_err(|_| AppError::validation("image", "Unrecognized content type."))?;
        if mime.type_() != mime::IMAGE {
            return Err(AppError::validation(
                "image",
                "Only image uploads are accepted.",
            ));
        }
        let format = image::guess_format(&data)
            .map_err(|_| AppError::validation("image", "The payload is not a valid image."))?;

        let ext = format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin");
        let name = Uuid::new_v4().simple().to_string();
        let rel = format!("{}/{}.{}", &name[..2], name, ext);

        let target = self.root.join(&rel);
        let parent = target
            .parent()
            .ok_or_else(|| AppError::Internal("media root has no parent".into()))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?;
        fs::write(&target, &data)
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?;

        Ok(rel)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LocalMediaStore {
        let dir = std::env::temp_dir().join(format!("warren-media-{}", Uuid::new_v4()));
        LocalMediaStore::new(dir, "/static/media".into())
    }

    // Smallest valid 1x1 PNG.
    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
        0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
        0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
        0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    #[tokio::test]
    async fn saves_a_png_under_a_sharded_path() {
        let store = store();
        let rel = store.save_upload(PNG.to_vec(), "image/png").await.unwrap();
        assert!(rel.ends_with(".png"));
        assert_eq!(&rel[2..3], "/");
        assert!(store.root.join(&rel).exists());
    }

    #[tokio::test]
    async fn rejects_non_image_content_types() {
        let store = store();
        let result = store.save_upload(PNG.to_vec(), "text/plain").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_payloads_that_are_not_images() {
        let store = store();
        let result = store
            .save_upload(b"definitely not a png".to_vec(), "image/png")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn public_url_joins_prefix_and_path() {
        let store = store();
        assert_eq!(
            store.public_url("ab/abcd.png"),
            "/static/media/ab/abcd.png"
        );
    }
}
