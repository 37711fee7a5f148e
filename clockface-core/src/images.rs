//! Background Image Loading
//!
//! Each request is tagged with a generation token. A completion is applied
//! only when its token is still the current one; anything older is dropped.

use std::fs;
use std::path::Path;

use base64::Engine;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Largest accepted source image, in bytes
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Image exceeds the 5 MB limit ({0} bytes)")]
    TooLarge(usize),

    #[error("Not an image resource: {0}")]
    UnsupportedType(String),

    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),

    #[error("Failed to read image: {0}")]
    Io(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// No image configured
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// A decoded image together with its original encoded bytes.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `data:` URI of the original bytes
    pub fn data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime, encoded)
    }
}

/// Resolves image references found in a scene.
pub trait ImageStore {
    fn resolve(&self, href: &str) -> Option<&LoadedImage>;
}

/// Handed out for every new load; pass the token back to [`ImageLoader::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub token: u64,
    pub url: String,
}

#[derive(Debug, Default)]
pub struct ImageLoader {
    token: u64,
    url: String,
    status: Option<ImageStatus>,
    loaded: Option<LoadedImage>,
    last_error: Option<ImageError>,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the loader at `url`.
    ///
    /// Returns a ticket when a new load must be started. Requesting the URL
    /// that is already current is a no-op.
    pub fn request(&mut self, url: &str) -> Option<LoadTicket> {
        if self.status.is_some() && self.url == url {
            return None;
        }

        self.token += 1;
        self.url = url.to_string();
        self.loaded = None;
        self.last_error = None;

        if url.is_empty() {
            self.status = Some(ImageStatus::Idle);
            return None;
        }

        self.status = Some(ImageStatus::Loading);
        debug!(token = self.token, url, "image load requested");
        Some(LoadTicket {
            token: self.token,
            url: self.url.clone(),
        })
    }

    /// Apply the outcome of a load. Returns `false` for a superseded token.
    pub fn complete(&mut self, token: u64, result: Result<LoadedImage, ImageError>) -> bool {
        if token != self.token || self.status != Some(ImageStatus::Loading) {
            debug!(token, current = self.token, "stale image load ignored");
            return false;
        }

        match result {
            Ok(image) => {
                debug!(url = %self.url, width = image.width(), height = image.height(), "image loaded");
                self.loaded = Some(image);
                self.status = Some(ImageStatus::Loaded);
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "background image failed to load");
                self.last_error = Some(e);
                self.status = Some(ImageStatus::Failed);
            }
        }
        true
    }

    pub fn status(&self) -> ImageStatus {
        self.status.unwrap_or(ImageStatus::Idle)
    }

    /// Status as seen by a renderer configured with `url`
    pub fn status_for(&self, url: &str) -> ImageStatus {
        if url.is_empty() {
            ImageStatus::Idle
        } else if self.url == url {
            self.status()
        } else {
            ImageStatus::Loading
        }
    }

    pub fn current_url(&self) -> &str {
        &self.url
    }

    pub fn last_error(&self) -> Option<&ImageError> {
        self.last_error.as_ref()
    }
}

impl ImageStore for ImageLoader {
    fn resolve(&self, href: &str) -> Option<&LoadedImage> {
        if href == self.url {
            self.loaded.as_ref()
        } else {
            None
        }
    }
}

/// Read and decode an image reference.
///
/// Accepts `data:` URIs, `file://` URLs and plain filesystem paths.
pub fn fetch(url: &str) -> Result<LoadedImage, ImageError> {
    if let Some(rest) = url.strip_prefix("data:") {
        return decode(read_data_uri(rest)?);
    }
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("blob:") {
        return Err(ImageError::UnsupportedSource(url.to_string()));
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    decode(read_file(Path::new(path))?)
}

/// Validate and decode encoded image bytes.
pub fn decode(bytes: Vec<u8>) -> Result<LoadedImage, ImageError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(bytes.len()));
    }

    let format = image::guess_format(&bytes)
        .map_err(|_| ImageError::UnsupportedType("unrecognized image data".to_string()))?;
    let pixels = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::Decode(e.to_string()))?
        .to_rgba8();

    Ok(LoadedImage {
        mime: format.to_mime_type(),
        bytes,
        pixels,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, ImageError> {
    let meta = fs::metadata(path).map_err(|e| ImageError::Io(e.to_string()))?;
    if meta.len() > MAX_IMAGE_BYTES as u64 {
        return Err(ImageError::TooLarge(meta.len() as usize));
    }
    fs::read(path).map_err(|e| ImageError::Io(e.to_string()))
}

fn read_data_uri(rest: &str) -> Result<Vec<u8>, ImageError> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::UnsupportedSource("malformed data URI".to_string()))?;

    let mime = header.split(';').next().unwrap_or_default();
    if !mime.starts_with("image/") {
        return Err(ImageError::UnsupportedType(mime.to_string()));
    }
    if !header.ends_with(";base64") {
        return Err(ImageError::UnsupportedSource("data URI is not base64".to_string()));
    }

    // base64 inflates by 4/3; reject oversized payloads before decoding
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 2 {
        return Err(ImageError::TooLarge(payload.len() / 4 * 3));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ImageError::Decode(e.to_string()))
}
