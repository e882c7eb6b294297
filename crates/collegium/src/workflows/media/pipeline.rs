use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::warn;
use uuid::Uuid;

use super::store::{ImageStore, StorageError};
use crate::workflows::Fault;

pub const MAX_IMAGES_PER_GROUP: usize = 10;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_EDGE_PX: u32 = 1200;
pub const JPEG_QUALITY: u8 = 80;

/// The two image groups a submission carries. Caps apply per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageGroup {
    Campus,
    Accommodation,
}

impl ImageGroup {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Campus => "campus",
            Self::Accommodation => "accommodation",
        }
    }
}

/// One uploaded file as received from the multipart boundary.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Public paths produced by a successful ingest, in upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredImages {
    pub images: Vec<String>,
    pub accommodation_images: Vec<String>,
}

/// Error raised by the image pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("too many {group} images, limit is 10 per submission")]
    TooMany { group: &'static str },
    #[error("{filename} exceeds the 10 MiB upload limit")]
    TooLarge { filename: String },
    #[error("{filename} must be a jpg, jpeg, or png with a matching content type")]
    UnsupportedType { filename: String },
    #[error("{filename} could not be decoded: {source}")]
    Decode {
        filename: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{filename} could not be re-encoded: {source}")]
    Encode {
        filename: String,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MediaError {
    pub fn fault(&self) -> Fault {
        match self {
            Self::TooMany { .. }
            | Self::TooLarge { .. }
            | Self::UnsupportedType { .. }
            | Self::Decode { .. } => Fault::Validation,
            Self::Encode { .. } | Self::Storage(_) => Fault::Upstream,
        }
    }
}

/// Process and store both image groups, all or nothing. Checks that never
/// touch the store run first for every file; if anything fails after writes
/// have begun, the files written so far are scrubbed before returning.
pub fn ingest<S>(
    store: &S,
    campus: Vec<ImageUpload>,
    accommodation: Vec<ImageUpload>,
) -> Result<StoredImages, MediaError>
where
    S: ImageStore + ?Sized,
{
    check_group(ImageGroup::Campus, &campus)?;
    check_group(ImageGroup::Accommodation, &accommodation)?;

    let mut written = Vec::new();
    let images = match store_group(store, ImageGroup::Campus, campus, &mut written) {
        Ok(paths) => paths,
        Err(error) => {
            scrub(store, &written);
            return Err(error);
        }
    };
    let accommodation_images =
        match store_group(store, ImageGroup::Accommodation, accommodation, &mut written) {
            Ok(paths) => paths,
            Err(error) => {
                scrub(store, &written);
                return Err(error);
            }
        };

    Ok(StoredImages {
        images,
        accommodation_images,
    })
}

/// Best-effort removal used for rollback and record deletion. A missing file
/// is fine; other failures are logged and suppressed.
pub fn scrub<S>(store: &S, paths: &[String])
where
    S: ImageStore + ?Sized,
{
    for path in paths {
        if let Err(error) = store.delete(path) {
            warn!(%path, %error, "image cleanup failed");
        }
    }
}

fn check_group(group: ImageGroup, uploads: &[ImageUpload]) -> Result<(), MediaError> {
    if uploads.len() > MAX_IMAGES_PER_GROUP {
        return Err(MediaError::TooMany { group: group.tag() });
    }
    for upload in uploads {
        if upload.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(MediaError::TooLarge {
                filename: upload.filename.clone(),
            });
        }
        if !type_rule_ok(upload) {
            return Err(MediaError::UnsupportedType {
                filename: upload.filename.clone(),
            });
        }
    }
    Ok(())
}

fn store_group<S>(
    store: &S,
    group: ImageGroup,
    uploads: Vec<ImageUpload>,
    written: &mut Vec<String>,
) -> Result<Vec<String>, MediaError>
where
    S: ImageStore + ?Sized,
{
    let mut paths = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let bytes = transcode(&upload)?;
        let path = store.store(&bytes, &unique_name(group))?;
        written.push(path.clone());
        paths.push(path);
    }
    Ok(paths)
}

/// Declared-type rule: the extension and the content type must both name a
/// supported format and agree with each other.
fn type_rule_ok(upload: &ImageUpload) -> bool {
    let Some((_, extension)) = upload.filename.rsplit_once('.') else {
        return false;
    };
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => upload.content_type == mime::IMAGE_JPEG.as_ref(),
        "png" => upload.content_type == mime::IMAGE_PNG.as_ref(),
        _ => false,
    }
}

/// Decode, shrink anything larger than 1200 px on either edge to fit inside
/// 1200x1200 (never upscaling), and re-encode as quality-80 JPEG.
fn transcode(upload: &ImageUpload) -> Result<Vec<u8>, MediaError> {
    let decoded = image::load_from_memory(&upload.bytes).map_err(|source| MediaError::Decode {
        filename: upload.filename.clone(),
        source,
    })?;

    let bounded = if decoded.width() > MAX_EDGE_PX || decoded.height() > MAX_EDGE_PX {
        decoded.resize(MAX_EDGE_PX, MAX_EDGE_PX, FilterType::Lanczos3)
    } else {
        decoded
    };

    let mut encoded = Vec::new();
    bounded
        .to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(
            &mut Cursor::new(&mut encoded),
            JPEG_QUALITY,
        ))
        .map_err(|source| MediaError::Encode {
            filename: upload.filename.clone(),
            source,
        })?;
    Ok(encoded)
}

fn unique_name(group: ImageGroup) -> String {
    format!("{}-{}.jpg", group.tag(), Uuid::new_v4())
}
