use anyhow::{Context, Result};

/// Decoded baked-lighting image, ready for upload.
///
/// Pixels are kept in the file's row order (no vertical flip; the scene's
/// UVs were authored for it) and uploaded as sRGB because the bake is
/// display-referred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedTexture {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first.
    pub rgba: Vec<u8>,
}

impl BakedTexture {
    /// Decodes PNG or JPEG bytes pulled from the archive.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .context("unable to decode baked-lighting image")?
            .into_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// A 1x1 placeholder used when the archive has no texture, so the baked
    /// pipeline still has something bound.
    pub fn fallback() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![128, 128, 128, 255],
        }
    }
}
