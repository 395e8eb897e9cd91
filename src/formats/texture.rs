//! Provides texture decoding for model loaders.

use std::path::Path;
use std::sync::Arc;

use crate::mesh::TextureData;

/// Decodes an encoded image (PNG, JPEG) into RGBA texture data.
///
/// # Examples
/// ```
/// use thumbframe::formats::texture::texture_from_bytes;
///
/// assert!(texture_from_bytes(b"not an image").is_none());
/// ```
pub fn texture_from_bytes(bytes: &[u8]) -> Option<Arc<TextureData>> {
    use image::GenericImageView;

    let img = image::load_from_memory(bytes).ok()?;
    let (width, height) = img.dimensions();
    Some(Arc::new(TextureData {
        width,
        height,
        data: img.to_rgba8().into_raw(),
    }))
}

/// Loads a texture file referenced by a material. Missing or broken files yield `None`.
pub fn load_texture_from_file(path: &Path) -> Option<Arc<TextureData>> {
    let bytes = std::fs::read(path).ok()?;
    let texture = texture_from_bytes(&bytes);
    if texture.is_none() {
        tracing::debug!(path = %path.display(), "could not decode texture");
    }
    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_png() {
        use image::{ImageBuffer, Rgba};
        use std::io::Cursor;

        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(2, 1, Rgba([255, 0, 0, 128]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();

        let tex = texture_from_bytes(&buffer.into_inner()).unwrap();
        assert_eq!((tex.width, tex.height), (2, 1));
        assert_eq!(&tex.data[..4], &[255, 0, 0, 128]);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_texture_from_file(Path::new("no/such/texture.png")).is_none());
    }
}
