//! Tyre image storage in an S3-compatible object store. Objects are named by
//! the sha256 of their content, so re-uploads of the same image collapse.
use std::sync::Arc;

use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore, PutPayload};
use sha2::{Digest as _, Sha256};

use crate::constants::s3::{S3_ACCESS_KEY, S3_BUCKET, S3_HOST, S3_PORT, S3_SECRET_KEY};

const IMAGE_PREFIX: &str = "images";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImageFileType {
    Png,
    Jpg,
    Gif,
}

impl ImageFileType {
    /// Sniff the type from magic bytes; the client's content type is ignored.
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, ..] => Some(Self::Png),
            [0xff, 0xd8, 0xff, ..] => Some(Self::Jpg),
            [0x47, 0x49, 0x46, 0x38, 0x37 | 0x39, 0x61, ..] => Some(Self::Gif),
            _ => None,
        }
    }
    const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Gif => "gif",
        }
    }
}

fn object_path(image: &[u8]) -> Result<String, errors::StoreImageError> {
    let file_type =
        ImageFileType::from_bytes(image).ok_or(errors::StoreImageError::InvalidFileType)?;
    let hash = Sha256::digest(image);
    Ok(format!("{IMAGE_PREFIX}/{hash:x}.{}", file_type.extension()))
}

/// Join the public base URI and an object path.
fn public_url(external_uri: &str, object_path: &str) -> String {
    format!("{}/{object_path}", external_uri.trim_end_matches('/'))
}

/// Connect to the configured S3-compatible store. `None` when `S3_HOST` is
/// unset.
pub fn connect_store() -> Result<Option<Arc<dyn ObjectStore>>, errors::StorageError> {
    let Some(host) = S3_HOST.as_deref() else {
        return Ok(None);
    };
    let store = AmazonS3Builder::new()
        .with_endpoint(format!("http://{host}:{}", *S3_PORT))
        .with_allow_http(true)
        .with_bucket_name(S3_BUCKET.as_str())
        .with_access_key_id(S3_ACCESS_KEY.as_str())
        .with_secret_access_key(S3_SECRET_KEY.as_str())
        .with_region("us-east-1")
        .build()?;
    Ok(Some(Arc::new(store)))
}

/// Store an image and return the public URL it is served from.
pub async fn store_image(
    store: Arc<dyn ObjectStore>,
    external_uri: &str,
    image: Vec<u8>,
) -> Result<String, errors::StoreImageError> {
    if image.is_empty() {
        return Err(errors::StoreImageError::Empty);
    }
    let path = object_path(&image)?;
    store
        .put(&Path::from(path.as_str()), PutPayload::from(image))
        .await
        .map_err(errors::StorageError::from)?;
    tracing::debug!(%path, "Stored image");
    Ok(public_url(external_uri, &path))
}

pub mod errors {
    use thiserror::Error;
    #[derive(Debug, Error)]
    pub enum StoreImageError {
        #[error("Image must be a PNG, JPG or GIF")]
        InvalidFileType,
        #[error("Image is empty")]
        Empty,
        #[error(transparent)]
        StorageError(#[from] StorageError),
    }

    #[derive(Debug, Error)]
    #[error(transparent)]
    pub struct StorageError(#[from] object_store::Error);
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn sniffs_supported_types() {
        assert_eq!(ImageFileType::from_bytes(&PNG_HEADER), Some(ImageFileType::Png));
        assert_eq!(
            ImageFileType::from_bytes(&[0xff, 0xd8, 0xff, 0xe0, 0, 0x10]),
            Some(ImageFileType::Jpg)
        );
        assert_eq!(ImageFileType::from_bytes(b"GIF89a\x01\x00"), Some(ImageFileType::Gif));
        assert_eq!(ImageFileType::from_bytes(b"%PDF-1.7"), None);
    }

    #[test]
    fn paths_are_content_addressed() {
        let first = object_path(&PNG_HEADER).expect("png");
        let again = object_path(&PNG_HEADER).expect("png");
        assert_eq!(first, again);
        assert!(first.starts_with("images/"));
        assert!(first.ends_with(".png"));
        assert_eq!(first.len(), "images/".len() + 64 + ".png".len());
    }

    #[test]
    fn public_url_joins_cleanly() {
        assert_eq!(
            public_url("https://cdn.tyrefusion.in/", "images/ab.png"),
            "https://cdn.tyrefusion.in/images/ab.png"
        );
        assert_eq!(public_url("", "images/ab.png"), "/images/ab.png");
    }

    #[tokio::test]
    async fn stores_into_object_store() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let url = store_image(Arc::clone(&store), "https://cdn.example", PNG_HEADER.to_vec())
            .await
            .expect("stored");
        let path = url.trim_start_matches("https://cdn.example/");
        let stored = store
            .get(&Path::from(path))
            .await
            .expect("present")
            .bytes()
            .await
            .expect("readable");
        assert_eq!(&stored[..], &PNG_HEADER[..]);
        assert!(matches!(
            store_image(store, "", b"not an image".to_vec()).await,
            Err(errors::StoreImageError::InvalidFileType)
        ));
    }
}
