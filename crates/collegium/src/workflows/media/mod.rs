//! Image intake, processing, and storage.
//!
//! Uploads are validated (count, size, declared type), shrunk to fit inside
//! 1200x1200, re-encoded as JPEG, and written through the [`ImageStore`]
//! boundary. Ingest is all or nothing per request.

pub mod pipeline;
pub mod store;

pub use pipeline::{
    ingest, scrub, ImageGroup, ImageUpload, MediaError, StoredImages, JPEG_QUALITY, MAX_EDGE_PX,
    MAX_IMAGES_PER_GROUP, MAX_UPLOAD_BYTES,
};
pub use store::{DeleteOutcome, FsImageStore, ImageStore, InMemoryImageStore, StorageError};
