use std::path::Path;

use crate::{dbus::IconPixmap, Error, Result};

/// Resolutions tried when a source does not report any of its own.
pub const FALLBACK_SIZES: [u32; 5] = [16, 22, 24, 32, 48];

/// An icon that can be rendered at the resolutions a host may ask for.
///
/// Implementations report the resolutions they have readily available and
/// render a square RGBA bitmap on demand; [`encode`] takes care of the wire
/// format.
pub trait IconSource {
    /// Edge lengths (in pixels) this icon is available at. An empty list
    /// makes the encoder fall back to [`FALLBACK_SIZES`].
    fn available_sizes(&self) -> Vec<u32>;

    /// Render a `size`×`size` bitmap, or `None` if this resolution cannot be
    /// produced.
    fn render(&self, size: u32) -> Option<image::RgbaImage>;
}

/// Encode an icon into the wire list-of-resolutions format.
///
/// Resolutions that fail to render are skipped. The result is never empty:
/// if nothing rendered, a single 32×32 entry is forced (transparent if even
/// that render fails).
pub fn encode(icon: &dyn IconSource) -> Vec<IconPixmap> {
    let mut sizes = icon.available_sizes();
    if sizes.is_empty() {
        sizes = FALLBACK_SIZES.to_vec();
    }

    let mut pixmaps = Vec::with_capacity(sizes.len());
    for size in sizes {
        match icon.render(size) {
            Some(image) => pixmaps.push(to_wire(image)),
            None => log::debug!("icon rendering failed at {}px, skipping", size),
        }
    }

    if pixmaps.is_empty() {
        let image = icon.render(32).unwrap_or_else(|| image::RgbaImage::new(32, 32));
        pixmaps.push(to_wire(image));
    }

    pixmaps
}

/// The wire format mandates big-endian ARGB words regardless of platform.
fn to_wire(image: image::RgbaImage) -> IconPixmap {
    let (width, height) = image.dimensions();
    let rgba = image.into_raw();
    let mut data = Vec::with_capacity(rgba.len());
    for pixel in rgba.chunks_exact(4) {
        let (r, g, b, a) = (pixel[0], pixel[1], pixel[2], pixel[3]);
        let argb = (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
        data.extend_from_slice(&argb.to_be_bytes());
    }
    IconPixmap { width: width as i32, height: height as i32, data }
}

/// An icon loaded from an image file, rendered by resizing.
pub struct FileIcon {
    image: image::DynamicImage,
}

impl FileIcon {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| Error::LoadIconFromFile { path: path.to_owned(), source })?;
        Ok(Self { image })
    }
}

impl IconSource for FileIcon {
    fn available_sizes(&self) -> Vec<u32> {
        vec![self.image.width().max(self.image.height())]
    }

    fn render(&self, size: u32) -> Option<image::RgbaImage> {
        let rgba = self.image.to_rgba8();
        if rgba.dimensions() == (size, size) {
            return Some(rgba);
        }
        Some(image::imageops::resize(&rgba, size, size, image::imageops::FilterType::Lanczos3))
    }
}

impl IconSource for image::RgbaImage {
    fn available_sizes(&self) -> Vec<u32> {
        vec![self.width().max(self.height())]
    }

    fn render(&self, size: u32) -> Option<image::RgbaImage> {
        if self.dimensions() == (size, size) {
            return Some(self.clone());
        }
        Some(image::imageops::resize(self, size, size, image::imageops::FilterType::Lanczos3))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    struct TestIcon {
        sizes: Vec<u32>,
        renderable: Vec<u32>,
    }

    impl IconSource for TestIcon {
        fn available_sizes(&self) -> Vec<u32> {
            self.sizes.clone()
        }

        fn render(&self, size: u32) -> Option<image::RgbaImage> {
            if self.renderable.contains(&size) {
                Some(image::RgbaImage::from_pixel(size, size, image::Rgba([1, 2, 3, 4])))
            } else {
                None
            }
        }
    }

    #[test]
    fn encodes_big_endian_argb() {
        // 2×2 bitmap with distinct, known pixel values.
        let pixels: [[u8; 4]; 4] = [
            [0x11, 0x22, 0x33, 0x44],
            [0xaa, 0xbb, 0xcc, 0xdd],
            [0x00, 0xff, 0x00, 0xff],
            [0x01, 0x02, 0x03, 0x04],
        ];
        let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
        let image = image::RgbaImage::from_raw(2, 2, raw).unwrap();

        let pixmap = to_wire(image);
        assert_eq!(pixmap.width, 2);
        assert_eq!(pixmap.height, 2);

        // On the wire, every pixel is one big-endian ARGB word.
        for (chunk, [r, g, b, a]) in pixmap.data.chunks_exact(4).zip(pixels) {
            let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let expected = (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
            assert_eq!(word, expected);
        }

        // Reversing the byte order reconstructs the original channels.
        let first = pixmap.data.chunks_exact(4).next().unwrap();
        assert_eq!(first, [0x44, 0x11, 0x22, 0x33]);
    }

    #[test]
    fn falls_back_to_candidate_sizes() {
        let icon = TestIcon { sizes: vec![], renderable: FALLBACK_SIZES.to_vec() };
        let pixmaps = encode(&icon);
        assert_eq!(
            pixmaps.iter().map(|p| p.width).collect::<Vec<_>>(),
            FALLBACK_SIZES.iter().map(|s| *s as i32).collect::<Vec<_>>()
        );
    }

    #[test]
    fn skips_resolutions_that_fail_to_render() {
        let icon = TestIcon { sizes: vec![16, 24, 48], renderable: vec![16, 48] };
        let pixmaps = encode(&icon);
        assert_eq!(pixmaps.iter().map(|p| p.width).collect::<Vec<_>>(), vec![16, 48]);
    }

    #[test]
    fn forces_a_32px_entry_when_nothing_renders() {
        let icon = TestIcon { sizes: vec![64], renderable: vec![] };
        let pixmaps = encode(&icon);
        assert_eq!(pixmaps.len(), 1);
        assert_eq!((pixmaps[0].width, pixmaps[0].height), (32, 32));
        assert!(pixmaps[0].data.iter().all(|b| *b == 0));
    }
}
