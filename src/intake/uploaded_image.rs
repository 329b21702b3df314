// src/intake/uploaded_image.rs
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Longest edge of the on-screen preview, in pixels.
const PREVIEW_MAX_EDGE: u32 = 512;

/// MIME type assumed for base64 payloads that carry no data URI prefix.
pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Downscaled pixels for display plus the texture uploaded from them.
///
/// The texture is created on first draw and freed by `release` or on drop.
pub struct Preview {
    pixels: egui::ColorImage,
    texture: Option<egui::TextureHandle>,
}

impl Preview {
    pub fn from_image(image: &DynamicImage) -> Self {
        Self::with_max_edge(image, PREVIEW_MAX_EDGE)
    }

    pub fn with_max_edge(image: &DynamicImage, max_edge: u32) -> Self {
        let thumb = if image.width() > max_edge || image.height() > max_edge {
            image.thumbnail(max_edge, max_edge)
        } else {
            image.clone()
        };
        let size = [thumb.width() as usize, thumb.height() as usize];
        let pixels = egui::ColorImage::from_rgba_unmultiplied(
            size,
            thumb.to_rgba8().as_flat_samples().as_slice(),
        );
        Self { pixels, texture: None }
    }

    pub fn size(&self) -> [usize; 2] {
        self.pixels.size
    }

    /// Width over height of the preview.
    pub fn aspect_ratio(&self) -> f32 {
        let [w, h] = self.size();
        if h == 0 { 1.0 } else { w as f32 / h as f32 }
    }

    /// Returns the GPU texture, uploading it on first use.
    pub fn texture(&mut self, ctx: &egui::Context, name: &str) -> egui::TextureHandle {
        self.texture
            .get_or_insert_with(|| {
                ctx.load_texture(name, self.pixels.clone(), egui::TextureOptions::LINEAR)
            })
            .clone()
    }

    /// Frees the GPU texture. The pixels stay so it can be uploaded again.
    pub fn release(&mut self) {
        if let Some(texture) = self.texture.take() {
            debug!("Releasing preview texture {:?}", texture.id());
        }
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        self.release();
    }
}

/// A photo picked by the user, ready for display and transmission.
pub struct UploadedImage {
    path: PathBuf,
    file_name: String,
    mime_type: &'static str,
    data_uri: String,
    preview: Preview,
}

impl UploadedImage {
    /// Read and decode an image file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_bytes(path, &bytes)
    }

    /// Build from raw file bytes. Fails if the bytes are not a decodable image.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)
            .map_err(|_| anyhow!("unrecognised image format"))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .context("failed to decode image")?;

        let mime_type = mime_type_for(format);
        let data_uri = format!(
            "data:{};base64,{}",
            mime_type,
            general_purpose::STANDARD.encode(bytes)
        );
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(
            "Loaded {} ({}, {}x{})",
            file_name,
            mime_type,
            decoded.width(),
            decoded.height()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            mime_type,
            data_uri,
            preview: Preview::from_image(&decoded),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// The `data:<mime>;base64,...` payload sent to the generator.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut Preview {
        &mut self.preview
    }

    /// Consume the image, freeing its preview texture now.
    pub fn discard(mut self) {
        self.preview.release();
    }
}

fn mime_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Split a `data:<mime>;base64,` prefix off a payload, if present.
fn split_data_uri(input: &str) -> Option<(&str, &str)> {
    let rest = input.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    Some((mime, payload))
}

/// Strip any data URI prefix, leaving raw base64.
///
/// Base64 never contains `:`, so stripping an already stripped string is a
/// no-op.
pub fn strip_data_uri(input: &str) -> &str {
    split_data_uri(input).map_or(input, |(_, payload)| payload)
}

/// MIME type declared by a data URI, or the JPEG fallback for raw base64.
pub fn mime_type_of(input: &str) -> &str {
    match split_data_uri(input) {
        Some((mime, _)) if !mime.is_empty() => mime,
        _ => FALLBACK_MIME_TYPE,
    }
}
