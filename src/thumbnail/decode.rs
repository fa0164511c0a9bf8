//! Image decoding for the thumbnail tiers
//!
//! Originals are decoded at full resolution and dropped as soon as the
//! scaled copy exists. Disk tier files are plain PNGs.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

use super::Thumbnail;
use crate::error::ThumbnailError;

/// Decode an original image, guessing its format from the content
pub fn decode_original(path: &Path) -> Result<DynamicImage, ThumbnailError> {
    let io_err = |source: io::Error| ThumbnailError::Io {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?;

    reader.decode().map_err(|source| ThumbnailError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a cached thumbnail. Returns `Ok(None)` if it is not on disk.
pub fn read_cached(path: &Path) -> Result<Option<Thumbnail>, ThumbnailError> {
    let mut reader = match ImageReader::open(path) {
        Ok(reader) => reader,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ThumbnailError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    reader.set_format(ImageFormat::Png);
    let img = reader.decode().map_err(|source| ThumbnailError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(img.to_rgba8()))
}

/// Write a thumbnail as PNG.
///
/// The file is written under a unique temporary name and renamed into
/// place, so concurrent readers and writers only ever see complete files.
pub fn write_cached(path: &Path, thumbnail: &Thumbnail) -> Result<(), ThumbnailError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ThumbnailError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

    thumbnail
        .save_with_format(&tmp_path, ImageFormat::Png)
        .map_err(|source| ThumbnailError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        ThumbnailError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
